use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShortUrl {
    pub id: String,
    pub original_url: String,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub deleted: bool,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl ShortUrl {
    pub fn new(id: String, original_url: String, user_id: Option<String>) -> Self {
        Self {
            id,
            original_url,
            user_id,
            deleted: false,
            created_at: chrono::Utc::now(),
        }
    }

    pub fn is_owned_by(&self, user_id: &str) -> bool {
        self.user_id.as_deref() == Some(user_id)
    }
}

/// 批量缩短请求中的单项
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchRequestItem {
    pub correlation_id: String,
    pub original_url: String,
}

/// 批量缩短的结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchResponseItem {
    pub correlation_id: String,
    pub short_url: String,
}

/// 用户链接列表中的一项（对外展示）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserUrl {
    pub short_url: String,
    pub original_url: String,
}

/// 存储统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageStats {
    pub urls: usize,
    pub users: usize,
}
