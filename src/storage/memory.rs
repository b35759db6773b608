//! 内存存储后端

use std::collections::HashMap;

use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tracing::{debug, trace};

use super::{BatchRequestItem, ShortUrl, StorageStats, UrlStorage};
use crate::errors::{Result, ShortenerError};
use crate::utils::{DEFAULT_ID_LENGTH, generate_short_id};

/// 基于 DashMap 的内存存储，进程退出即丢失
#[derive(Debug)]
pub struct MemoryStorage {
    /// id -> 记录
    urls: DashMap<String, ShortUrl>,
    /// original_url -> id，用于冲突检测
    by_original: DashMap<String, String>,
    /// user_id -> 该用户创建的 id（按创建顺序）
    user_urls: DashMap<String, Vec<String>>,
    id_length: usize,
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new(DEFAULT_ID_LENGTH)
    }
}

impl MemoryStorage {
    pub fn new(id_length: usize) -> Self {
        Self {
            urls: DashMap::new(),
            by_original: DashMap::new(),
            user_urls: DashMap::new(),
            id_length: id_length.max(1),
        }
    }

    fn unused_id(&self) -> String {
        loop {
            let id = generate_short_id(self.id_length);
            if !self.urls.contains_key(&id) {
                return id;
            }
            trace!("MemoryStorage: id collision on {}, regenerating", id);
        }
    }

    /// 插入新记录；原始 URL 已存在时返回 `Err(existing_id)`
    fn insert(&self, original_url: &str, user_id: Option<&str>) -> std::result::Result<String, String> {
        match self.by_original.entry(original_url.to_string()) {
            Entry::Occupied(existing) => Err(existing.get().clone()),
            Entry::Vacant(slot) => {
                let id = self.unused_id();
                self.urls.insert(
                    id.clone(),
                    ShortUrl::new(
                        id.clone(),
                        original_url.to_string(),
                        user_id.map(str::to_string),
                    ),
                );
                if let Some(user_id) = user_id {
                    self.user_urls
                        .entry(user_id.to_string())
                        .or_default()
                        .push(id.clone());
                }
                slot.insert(id.clone());
                Ok(id)
            }
        }
    }

    fn insert_batch(
        &self,
        items: &[BatchRequestItem],
        user_id: Option<&str>,
    ) -> HashMap<String, String> {
        items
            .iter()
            .map(|item| {
                // 批量模式下已存在的 URL 直接复用原 id
                let id = self
                    .insert(&item.original_url, user_id)
                    .unwrap_or_else(|existing| existing);
                (item.correlation_id.clone(), id)
            })
            .collect()
    }
}

#[async_trait]
impl UrlStorage for MemoryStorage {
    async fn save(&self, original_url: &str) -> Result<String> {
        self.insert(original_url, None)
            .map_err(ShortenerError::url_conflict)
    }

    async fn save_with_user(&self, original_url: &str, user_id: &str) -> Result<String> {
        self.insert(original_url, Some(user_id))
            .map_err(ShortenerError::url_conflict)
    }

    async fn get(&self, id: &str) -> Option<String> {
        self.urls
            .get(id)
            .filter(|record| !record.deleted)
            .map(|record| record.original_url.clone())
    }

    async fn get_with_deleted_status(&self, id: &str) -> Result<Option<String>> {
        match self.urls.get(id) {
            None => Ok(None),
            Some(record) if record.deleted => Err(ShortenerError::url_deleted(id)),
            Some(record) => Ok(Some(record.original_url.clone())),
        }
    }

    async fn save_batch(&self, items: &[BatchRequestItem]) -> Result<HashMap<String, String>> {
        Ok(self.insert_batch(items, None))
    }

    async fn save_batch_with_user(
        &self,
        items: &[BatchRequestItem],
        user_id: &str,
    ) -> Result<HashMap<String, String>> {
        Ok(self.insert_batch(items, Some(user_id)))
    }

    async fn get_user_urls(&self, user_id: &str) -> Result<Vec<ShortUrl>> {
        let Some(ids) = self.user_urls.get(user_id).map(|ids| ids.value().clone()) else {
            return Ok(Vec::new());
        };

        Ok(ids
            .iter()
            .filter_map(|id| self.urls.get(id))
            .filter(|record| !record.deleted)
            .map(|record| record.value().clone())
            .collect())
    }

    async fn delete_user_urls(&self, user_id: &str, url_ids: &[String]) -> Result<usize> {
        let mut deleted = 0;
        for id in url_ids {
            if let Some(mut record) = self.urls.get_mut(id)
                && record.is_owned_by(user_id)
                && !record.deleted
            {
                record.deleted = true;
                deleted += 1;
            }
        }
        debug!(
            user_id,
            requested = url_ids.len(),
            deleted,
            "MemoryStorage: marked URLs as deleted"
        );
        Ok(deleted)
    }

    async fn stats(&self) -> Result<StorageStats> {
        Ok(StorageStats {
            urls: self.urls.len(),
            users: self.user_urls.len(),
        })
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
