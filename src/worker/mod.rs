//! 异步批量删除
//!
//! 删除请求先进入一个有界队列，再由 N 个独立 worker 取出并在本地聚合，
//! 满足以下任一条件时刷入 [`DeleteService`]：
//! - 本地累计的 URL 数达到 `batch_size`
//! - 自批次第一条请求到达起经过 `batch_timeout`
//!
//! 每个 worker 独占自己的批次，不存在跨 worker 的锁。

pub mod batch;
pub mod pool;

pub use batch::DeleteBatch;
pub use pool::{DeleteWorkerPool, PoolStats};

use std::time::Duration;

use crate::config::DeleteWorkerSection;
use crate::errors::Result;

/// 一次删除请求：某个用户的一组短链接 ID
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteRequest {
    pub user_id: String,
    pub url_ids: Vec<String>,
}

/// 实际执行删除的后端
///
/// 由 worker 在刷盘时逐个用户调用；调用期间只阻塞当前 worker。
#[async_trait::async_trait]
pub trait DeleteService: Send + Sync {
    async fn delete_user_urls(&self, user_id: &str, url_ids: &[String]) -> anyhow::Result<()>;
}

/// 删除池配置，构造后不可变
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeleteWorkerConfig {
    /// worker 数量
    pub worker_count: usize,
    /// 队列容量
    pub queue_capacity: usize,
    /// 触发刷盘的 URL 数
    pub batch_size: usize,
    /// 批次最长等待时间
    pub batch_timeout: Duration,
}

impl Default for DeleteWorkerConfig {
    fn default() -> Self {
        Self {
            worker_count: 5,
            queue_capacity: 100,
            batch_size: 10,
            batch_timeout: Duration::from_secs(5),
        }
    }
}

impl DeleteWorkerConfig {
    pub fn validate(&self) -> Result<()> {
        DeleteWorkerSection::from(self).validate()
    }

    /// 把为 0 的参数提升到最小可运行值（数量为 1，超时为 1ms）
    pub fn clamped(self) -> Self {
        Self {
            worker_count: self.worker_count.max(1),
            queue_capacity: self.queue_capacity.max(1),
            batch_size: self.batch_size.max(1),
            batch_timeout: self.batch_timeout.max(MIN_BATCH_TIMEOUT),
        }
    }
}

const MIN_BATCH_TIMEOUT: Duration = Duration::from_millis(1);

impl From<&DeleteWorkerSection> for DeleteWorkerConfig {
    fn from(section: &DeleteWorkerSection) -> Self {
        Self {
            worker_count: section.worker_count,
            queue_capacity: section.queue_capacity,
            batch_size: section.batch_size,
            batch_timeout: Duration::from_millis(section.batch_timeout_ms),
        }
    }
}

impl From<&DeleteWorkerConfig> for DeleteWorkerSection {
    fn from(config: &DeleteWorkerConfig) -> Self {
        Self {
            worker_count: config.worker_count,
            queue_capacity: config.queue_capacity,
            batch_size: config.batch_size,
            batch_timeout_ms: config.batch_timeout.as_millis() as u64,
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = DeleteWorkerConfig::default();
        assert_eq!(config.worker_count, 5);
        assert_eq!(config.queue_capacity, 100);
        assert_eq!(config.batch_size, 10);
        assert_eq!(config.batch_timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_from_section() {
        let section = DeleteWorkerSection {
            worker_count: 2,
            queue_capacity: 8,
            batch_size: 3,
            batch_timeout_ms: 250,
            shutdown_timeout_secs: 1,
        };
        let config = DeleteWorkerConfig::from(&section);
        assert_eq!(config.worker_count, 2);
        assert_eq!(config.queue_capacity, 8);
        assert_eq!(config.batch_size, 3);
        assert_eq!(config.batch_timeout, Duration::from_millis(250));
    }

    #[test]
    fn test_validate_rejects_sub_millisecond_timeout() {
        let config = DeleteWorkerConfig {
            batch_timeout: Duration::from_micros(10),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_clamped_raises_zero_values() {
        let config = DeleteWorkerConfig {
            worker_count: 0,
            queue_capacity: 0,
            batch_size: 0,
            batch_timeout: Duration::ZERO,
        }
        .clamped();
        assert_eq!(config.worker_count, 1);
        assert_eq!(config.queue_capacity, 1);
        assert_eq!(config.batch_size, 1);
        assert_eq!(config.batch_timeout, Duration::from_millis(1));
        assert!(config.validate().is_ok());

        // 合法配置保持不变
        assert_eq!(DeleteWorkerConfig::default().clamped(), DeleteWorkerConfig::default());
    }
}
