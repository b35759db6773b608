use serde::{Deserialize, Serialize};

use crate::errors::{Result, ShortenerError};

/// 默认配置文件路径
pub const DEFAULT_CONFIG_PATH: &str = "config.toml";

/// 环境变量前缀，例如 `US__DELETE_WORKER__BATCH_SIZE=20`
pub const ENV_PREFIX: &str = "US";

/// 静态配置（从 TOML 加载，启动时使用）
///
/// 包含：
/// - server: 服务地址与短链接前缀
/// - storage: 存储后端配置
/// - logging: 日志配置
/// - delete_worker: 异步批量删除池配置
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StaticConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub delete_worker: DeleteWorkerSection,
}

impl StaticConfig {
    /// 从 TOML 文件和环境变量加载配置
    ///
    /// 优先级：ENV > config.toml > 默认值
    /// ENV 前缀：US，分隔符：__
    pub fn load_from(path: &str) -> Result<Self> {
        use config::{Config, Environment, File};

        let settings = Config::builder()
            .add_source(File::with_name(path).required(false))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: StaticConfig = settings.try_deserialize()?;
        config.delete_worker.validate()?;
        Ok(config)
    }

    /// 加载配置，失败时回退到默认值
    pub fn load(path: &str) -> Self {
        match Self::load_from(path) {
            Ok(config) => {
                if std::path::Path::new(path).exists() {
                    eprintln!("[INFO] Configuration loaded from: {}", path);
                }
                config
            }
            Err(e) => {
                eprintln!("[ERROR] Failed to load config: {}", e);
                Self::default()
            }
        }
    }

    /// 生成示例 TOML 配置文件
    pub fn generate_sample_config() -> String {
        let sample_config = Self::default();
        toml::to_string_pretty(&sample_config)
            .unwrap_or_else(|e| format!("Error generating sample config: {}", e))
    }

    /// 保存配置到 TOML 文件
    pub fn save_to_file<P: AsRef<std::path::Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)?;

        if let Some(parent) = path.as_ref().parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(path, content)?;
        Ok(())
    }
}

/// 服务器配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_server_host")]
    pub host: String,
    #[serde(default = "default_server_port")]
    pub port: u16,
    /// 生成短链接时使用的前缀
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

/// 存储配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(rename = "type")]
    #[serde(default = "default_storage_type")]
    pub storage_type: String,
    #[serde(default = "default_id_length")]
    pub id_length: usize,
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
    #[serde(default)]
    pub file: Option<String>,
    #[serde(default = "default_max_backups")]
    pub max_backups: u32,
    #[serde(default = "default_enable_rotation")]
    pub enable_rotation: bool,
}

/// 批量删除池配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteWorkerSection {
    #[serde(default = "default_worker_count")]
    pub worker_count: usize,
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_batch_timeout_ms")]
    pub batch_timeout_ms: u64,
    /// 进程退出时等待删除池排空的最长时间
    #[serde(default = "default_shutdown_timeout_secs")]
    pub shutdown_timeout_secs: u64,
}

impl DeleteWorkerSection {
    pub fn validate(&self) -> Result<()> {
        if self.worker_count == 0 {
            return Err(ShortenerError::config(
                "delete_worker.worker_count must be greater than 0",
            ));
        }
        if self.queue_capacity == 0 {
            return Err(ShortenerError::config(
                "delete_worker.queue_capacity must be greater than 0",
            ));
        }
        if self.batch_size == 0 {
            return Err(ShortenerError::config(
                "delete_worker.batch_size must be greater than 0",
            ));
        }
        if self.batch_timeout_ms == 0 {
            return Err(ShortenerError::config(
                "delete_worker.batch_timeout_ms must be greater than 0",
            ));
        }
        Ok(())
    }

    pub fn shutdown_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.shutdown_timeout_secs)
    }
}

// ============================================================
// Default value functions for static config
// ============================================================

fn default_server_host() -> String {
    "127.0.0.1".to_string()
}

fn default_server_port() -> u16 {
    8080
}

fn default_base_url() -> String {
    "http://localhost:8080".to_string()
}

fn default_storage_type() -> String {
    "memory".to_string()
}

fn default_id_length() -> usize {
    8
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

fn default_max_backups() -> u32 {
    5
}

fn default_enable_rotation() -> bool {
    true
}

fn default_worker_count() -> usize {
    5
}

fn default_queue_capacity() -> usize {
    100
}

fn default_batch_size() -> usize {
    10
}

fn default_batch_timeout_ms() -> u64 {
    5000
}

fn default_shutdown_timeout_secs() -> u64 {
    10
}

// ============================================================
// Default implementations
// ============================================================

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_server_host(),
            port: default_server_port(),
            base_url: default_base_url(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            storage_type: default_storage_type(),
            id_length: default_id_length(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            file: None,
            max_backups: default_max_backups(),
            enable_rotation: default_enable_rotation(),
        }
    }
}

impl Default for DeleteWorkerSection {
    fn default() -> Self {
        Self {
            worker_count: default_worker_count(),
            queue_capacity: default_queue_capacity(),
            batch_size: default_batch_size(),
            batch_timeout_ms: default_batch_timeout_ms(),
            shutdown_timeout_secs: default_shutdown_timeout_secs(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delete_worker_defaults() {
        let section = DeleteWorkerSection::default();
        assert_eq!(section.worker_count, 5);
        assert_eq!(section.queue_capacity, 100);
        assert_eq!(section.batch_size, 10);
        assert_eq!(section.batch_timeout_ms, 5000);
        assert!(section.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_values() {
        let section = DeleteWorkerSection {
            worker_count: 0,
            ..Default::default()
        };
        assert!(matches!(section.validate(), Err(ShortenerError::Config(_))));

        let section = DeleteWorkerSection {
            batch_size: 0,
            ..Default::default()
        };
        assert!(section.validate().is_err());
    }

    #[test]
    fn test_sample_config_roundtrips_through_toml() {
        let sample = StaticConfig::generate_sample_config();
        assert!(sample.contains("[delete_worker]"));

        let parsed: StaticConfig = toml::from_str(&sample).unwrap();
        assert_eq!(parsed.delete_worker.queue_capacity, 100);
        assert_eq!(parsed.storage.storage_type, "memory");
    }

    #[test]
    fn test_partial_section_uses_defaults() {
        let parsed: StaticConfig = toml::from_str("[delete_worker]\nbatch_size = 42\n").unwrap();
        assert_eq!(parsed.delete_worker.batch_size, 42);
        assert_eq!(parsed.delete_worker.worker_count, 5);
        assert_eq!(parsed.server.base_url, "http://localhost:8080");
    }
}
