//! Link management service
//!
//! Business logic shared by every transport: shortening (single and batch),
//! resolution, per-user listing and deletion. Deletion goes through the
//! batched [`DeleteWorkerPool`] when one is attached.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::errors::{Result, ShortenerError};
use crate::storage::{BatchRequestItem, BatchResponseItem, StorageStats, UrlStorage, UserUrl};
use crate::utils::{join_short_url, validate_url};
use crate::worker::{DeleteService, DeleteWorkerPool};

pub struct LinkService {
    storage: Arc<dyn UrlStorage>,
    base_url: String,
    delete_pool: Option<Arc<DeleteWorkerPool>>,
}

impl LinkService {
    pub fn new(storage: Arc<dyn UrlStorage>, base_url: impl Into<String>) -> Self {
        Self {
            storage,
            base_url: base_url.into(),
            delete_pool: None,
        }
    }

    /// 挂载批量删除池，之后 `request_deletion` 走异步路径
    pub fn with_delete_pool(mut self, pool: Arc<DeleteWorkerPool>) -> Self {
        self.delete_pool = Some(pool);
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn storage(&self) -> &Arc<dyn UrlStorage> {
        &self.storage
    }

    fn short_url(&self, id: &str) -> String {
        join_short_url(&self.base_url, id)
    }

    /// 冲突时把已有 ID 转成完整短链接
    fn absolute_conflict(&self, err: ShortenerError) -> ShortenerError {
        match err {
            ShortenerError::UrlConflict(id) => ShortenerError::url_conflict(self.short_url(&id)),
            other => other,
        }
    }

    /// 创建匿名短链接
    ///
    /// 原始 URL 已存在时返回 `UrlConflict`，载荷为已有的完整短链接。
    pub async fn shorten_url(&self, original_url: &str) -> Result<String> {
        validate_url(original_url)?;
        let id = self
            .storage
            .save(original_url.trim())
            .await
            .map_err(|e| self.absolute_conflict(e))?;
        Ok(self.short_url(&id))
    }

    pub async fn shorten_url_with_user(&self, original_url: &str, user_id: &str) -> Result<String> {
        validate_url(original_url)?;
        let id = self
            .storage
            .save_with_user(original_url.trim(), user_id)
            .await
            .map_err(|e| self.absolute_conflict(e))?;
        Ok(self.short_url(&id))
    }

    pub async fn shorten_batch(&self, items: &[BatchRequestItem]) -> Result<Vec<BatchResponseItem>> {
        validate_batch(items)?;
        let ids = self.storage.save_batch(items).await?;
        Ok(self.batch_response(items, &ids))
    }

    pub async fn shorten_batch_with_user(
        &self,
        items: &[BatchRequestItem],
        user_id: &str,
    ) -> Result<Vec<BatchResponseItem>> {
        validate_batch(items)?;
        let ids = self.storage.save_batch_with_user(items, user_id).await?;
        Ok(self.batch_response(items, &ids))
    }

    // 按请求顺序输出，没有拿到 ID 的项直接跳过
    fn batch_response(
        &self,
        items: &[BatchRequestItem],
        ids: &std::collections::HashMap<String, String>,
    ) -> Vec<BatchResponseItem> {
        items
            .iter()
            .filter_map(|item| {
                ids.get(&item.correlation_id).map(|id| BatchResponseItem {
                    correlation_id: item.correlation_id.clone(),
                    short_url: self.short_url(id),
                })
            })
            .collect()
    }

    pub async fn get_original_url(&self, id: &str) -> Option<String> {
        self.storage.get(id).await
    }

    /// 已删除的链接返回 `UrlDeleted`，不存在的返回 `NotFound`
    pub async fn get_original_url_with_deleted_status(&self, id: &str) -> Result<String> {
        self.storage
            .get_with_deleted_status(id)
            .await?
            .ok_or_else(|| ShortenerError::not_found(format!("short URL '{}' not found", id)))
    }

    pub async fn get_user_urls(&self, user_id: &str) -> Result<Vec<UserUrl>> {
        let urls = self.storage.get_user_urls(user_id).await?;
        Ok(urls
            .into_iter()
            .map(|url| UserUrl {
                short_url: self.short_url(&url.id),
                original_url: url.original_url,
            })
            .collect())
    }

    /// 同步删除
    pub async fn delete_user_urls(&self, user_id: &str, url_ids: &[String]) -> Result<usize> {
        self.storage.delete_user_urls(user_id, url_ids).await
    }

    /// 异步删除：优先提交到删除池，删除池不可用（未挂载或正在关闭）时回退为同步删除
    pub async fn request_deletion(&self, user_id: &str, url_ids: Vec<String>) -> Result<()> {
        if let Some(pool) = &self.delete_pool {
            match pool.submit(user_id, url_ids.clone()).await {
                Ok(()) => return Ok(()),
                Err(e) if e.is_cancelled() => {
                    warn!(
                        user_id,
                        url_count = url_ids.len(),
                        "Delete pool unavailable, deleting synchronously"
                    );
                }
                Err(e) => return Err(e),
            }
        }

        let deleted = self.delete_user_urls(user_id, &url_ids).await?;
        debug!(user_id, deleted, "Synchronous deletion finished");
        Ok(())
    }

    pub async fn stats(&self) -> Result<StorageStats> {
        self.storage.stats().await
    }
}

fn validate_batch(items: &[BatchRequestItem]) -> Result<()> {
    if items.is_empty() {
        return Err(ShortenerError::validation("batch cannot be empty"));
    }
    for item in items {
        validate_url(&item.original_url).map_err(|e| {
            ShortenerError::validation(format!(
                "item '{}': {}",
                item.correlation_id,
                e.message()
            ))
        })?;
    }
    Ok(())
}

#[async_trait]
impl DeleteService for LinkService {
    async fn delete_user_urls(&self, user_id: &str, url_ids: &[String]) -> anyhow::Result<()> {
        LinkService::delete_user_urls(self, user_id, url_ids).await?;
        Ok(())
    }
}
