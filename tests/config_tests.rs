//! 配置加载测试

use std::time::Duration;

use tempfile::TempDir;

use url_shortener::config::{StaticConfig, get_config, init_config_from};
use url_shortener::errors::ShortenerError;
use url_shortener::worker::DeleteWorkerConfig;

#[test]
fn test_load_from_toml_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(
        &path,
        r#"
[server]
base_url = "https://s.example"

[delete_worker]
worker_count = 2
batch_size = 25
batch_timeout_ms = 1500
"#,
    )
    .unwrap();

    let config = StaticConfig::load_from(path.to_str().unwrap()).unwrap();
    assert_eq!(config.server.base_url, "https://s.example");

    let pool_config = DeleteWorkerConfig::from(&config.delete_worker);
    assert_eq!(pool_config.worker_count, 2);
    assert_eq!(pool_config.batch_size, 25);
    assert_eq!(pool_config.queue_capacity, 100);
    assert_eq!(pool_config.batch_timeout, Duration::from_millis(1500));
}

#[test]
fn test_missing_file_falls_back_to_defaults() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("absent.toml");

    let config = StaticConfig::load_from(path.to_str().unwrap()).unwrap();
    assert_eq!(config.delete_worker.worker_count, 5);
    assert_eq!(config.logging.level, "info");
}

#[test]
fn test_invalid_delete_worker_section_is_rejected() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "[delete_worker]\nqueue_capacity = 0\n").unwrap();

    assert!(matches!(
        StaticConfig::load_from(path.to_str().unwrap()),
        Err(ShortenerError::Config(_))
    ));
    // load() 失败时回退到默认值
    assert_eq!(
        StaticConfig::load(path.to_str().unwrap())
            .delete_worker
            .queue_capacity,
        100
    );
}

#[test]
fn test_save_to_file_and_reload() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested").join("config.toml");

    let mut config = StaticConfig::default();
    config.delete_worker.batch_size = 7;
    config.save_to_file(&path).unwrap();

    let reloaded = StaticConfig::load_from(path.to_str().unwrap()).unwrap();
    assert_eq!(reloaded.delete_worker.batch_size, 7);
}

#[test]
fn test_global_config_can_be_replaced() {
    let mut config = StaticConfig::default();
    config.server.base_url = "http://global.test".to_string();
    init_config_from(config);

    assert_eq!(get_config().server.base_url, "http://global.test");
}
