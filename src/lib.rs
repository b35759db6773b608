//! url-shortener - A URL shortener service with batched asynchronous deletion
//!
//! # Architecture
//! - `worker`: Bounded delete queue and the worker pool that batches and flushes deletions
//! - `storage`: Storage backends and data models
//! - `services`: Link business logic shared by every transport
//! - `config`: Static configuration (TOML + environment)
//! - `system`: Logging and application lifecycle
//! - `utils`: ID generation and URL validation

pub mod config;
pub mod errors;
pub mod services;
pub mod storage;
pub mod system;
pub mod utils;
pub mod worker;
