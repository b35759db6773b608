use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use crate::config::StorageConfig;
use crate::errors::{Result, ShortenerError};
use crate::worker::DeleteService;

pub mod memory;
pub mod models;

pub use memory::MemoryStorage;
pub use models::{BatchRequestItem, BatchResponseItem, ShortUrl, StorageStats, UserUrl};

/// 短链接存储后端
#[async_trait]
pub trait UrlStorage: Send + Sync {
    /// 保存单个 URL，返回生成的 ID；URL 已存在时返回 `UrlConflict(existing_id)`
    async fn save(&self, original_url: &str) -> Result<String>;

    async fn save_with_user(&self, original_url: &str, user_id: &str) -> Result<String>;

    /// 已删除或不存在都返回 `None`
    async fn get(&self, id: &str) -> Option<String>;

    /// 不存在返回 `Ok(None)`，已删除返回 `UrlDeleted`
    async fn get_with_deleted_status(&self, id: &str) -> Result<Option<String>>;

    /// correlation_id -> id
    async fn save_batch(&self, items: &[BatchRequestItem]) -> Result<HashMap<String, String>>;

    async fn save_batch_with_user(
        &self,
        items: &[BatchRequestItem],
        user_id: &str,
    ) -> Result<HashMap<String, String>>;

    /// 用户未删除的链接
    async fn get_user_urls(&self, user_id: &str) -> Result<Vec<ShortUrl>>;

    /// 软删除属于该用户的链接，返回实际标记的数量
    async fn delete_user_urls(&self, user_id: &str, url_ids: &[String]) -> Result<usize>;

    async fn stats(&self) -> Result<StorageStats>;

    fn backend_name(&self) -> &'static str;
}

/// 让任意存储后端直接作为删除池的刷盘目标
pub struct StorageDeleter(pub Arc<dyn UrlStorage>);

#[async_trait]
impl DeleteService for StorageDeleter {
    async fn delete_user_urls(&self, user_id: &str, url_ids: &[String]) -> anyhow::Result<()> {
        self.0.delete_user_urls(user_id, url_ids).await?;
        Ok(())
    }
}

pub struct StorageFactory;

impl StorageFactory {
    pub fn create(config: &StorageConfig) -> Result<Arc<dyn UrlStorage>> {
        let storage: Arc<dyn UrlStorage> = match config.storage_type.to_lowercase().as_str() {
            "memory" => Arc::new(MemoryStorage::new(config.id_length)),
            other => {
                return Err(ShortenerError::storage_operation(format!(
                    "Unsupported storage backend: {}",
                    other
                )));
            }
        };

        info!("Using storage backend: {}", storage.backend_name());
        Ok(storage)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_factory_rejects_unknown_backend() {
        let config = StorageConfig {
            storage_type: "postgres".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            StorageFactory::create(&config),
            Err(ShortenerError::StorageOperation(_))
        ));
    }

    #[tokio::test]
    async fn test_storage_deleter_forwards_to_backend() {
        let storage: Arc<dyn UrlStorage> = Arc::new(MemoryStorage::default());
        let id = storage
            .save_with_user("https://example.com", "u1")
            .await
            .unwrap();

        let deleter = StorageDeleter(Arc::clone(&storage));
        deleter
            .delete_user_urls("u1", std::slice::from_ref(&id))
            .await
            .unwrap();

        assert!(storage.get(&id).await.is_none());
    }
}
