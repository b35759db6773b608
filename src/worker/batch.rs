//! 单个 worker 的本地批次

use std::collections::HashMap;

use tracing::{debug, error};

use super::{DeleteRequest, DeleteService};

/// user_id -> 待删除的 url_ids
///
/// 只被所属 worker 修改；刷盘后必为空且 `total() == 0`。
#[derive(Debug, Default)]
pub struct DeleteBatch {
    pending: HashMap<String, Vec<String>>,
    total: usize,
}

impl DeleteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// 合并请求（同一用户追加，保持到达顺序），返回合并后的 URL 总数
    pub fn merge(&mut self, request: DeleteRequest) -> usize {
        self.total += request.url_ids.len();
        self.pending
            .entry(request.user_id)
            .or_default()
            .extend(request.url_ids);
        self.total
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn user_count(&self) -> usize {
        self.pending.len()
    }

    /// 逐个用户调用删除服务，单个失败只记录日志，不影响其他用户，也不重试。
    ///
    /// 无论成功与否批次都会被清空。返回失败的用户数。
    pub async fn flush(&mut self, service: &dyn DeleteService, worker_id: usize) -> usize {
        if self.pending.is_empty() {
            return 0;
        }

        debug!(
            worker_id,
            users = self.pending.len(),
            urls = self.total,
            "Processing delete batch"
        );

        let pending = std::mem::take(&mut self.pending);
        self.total = 0;

        let mut failed = 0;
        for (user_id, url_ids) in pending {
            match service.delete_user_urls(&user_id, &url_ids).await {
                Ok(()) => {
                    debug!(
                        worker_id,
                        user_id = %user_id,
                        url_count = url_ids.len(),
                        "Deleted user URLs"
                    );
                }
                Err(e) => {
                    failed += 1;
                    error!(
                        worker_id,
                        user_id = %user_id,
                        url_count = url_ids.len(),
                        "Failed to delete user URLs: {:#}",
                        e
                    );
                }
            }
        }
        failed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct RecordingService {
        calls: Mutex<Vec<(String, Vec<String>)>>,
        fail_for: Option<&'static str>,
    }

    #[async_trait::async_trait]
    impl DeleteService for RecordingService {
        async fn delete_user_urls(&self, user_id: &str, url_ids: &[String]) -> anyhow::Result<()> {
            self.calls
                .lock()
                .unwrap()
                .push((user_id.to_string(), url_ids.to_vec()));
            if self.fail_for == Some(user_id) {
                anyhow::bail!("storage unavailable");
            }
            Ok(())
        }
    }

    fn request(user: &str, ids: &[&str]) -> DeleteRequest {
        DeleteRequest {
            user_id: user.to_string(),
            url_ids: ids.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn test_merge_appends_per_user() {
        let mut batch = DeleteBatch::new();
        assert!(batch.is_empty());

        assert_eq!(batch.merge(request("u1", &["a", "b"])), 2);
        assert_eq!(batch.merge(request("u2", &["c"])), 3);
        assert_eq!(batch.merge(request("u1", &["d"])), 4);

        assert_eq!(batch.user_count(), 2);
        assert_eq!(batch.pending["u1"], vec!["a", "b", "d"]);
    }

    #[tokio::test]
    async fn test_flush_clears_batch_even_on_failure() {
        let service = RecordingService {
            calls: Mutex::new(Vec::new()),
            fail_for: Some("bad"),
        };
        let mut batch = DeleteBatch::new();
        batch.merge(request("bad", &["x"]));
        batch.merge(request("good", &["y", "z"]));

        let failed = batch.flush(&service, 0).await;

        assert_eq!(failed, 1);
        assert!(batch.is_empty());
        assert_eq!(batch.total(), 0);

        let mut calls = service.calls.lock().unwrap().clone();
        calls.sort();
        assert_eq!(
            calls,
            vec![
                ("bad".to_string(), vec!["x".to_string()]),
                ("good".to_string(), vec!["y".to_string(), "z".to_string()]),
            ]
        );
    }

    #[tokio::test]
    async fn test_flush_empty_batch_is_noop() {
        let service = RecordingService {
            calls: Mutex::new(Vec::new()),
            fail_for: None,
        };
        let mut batch = DeleteBatch::new();
        assert_eq!(batch.flush(&service, 0).await, 0);
        assert!(service.calls.lock().unwrap().is_empty());
    }
}
