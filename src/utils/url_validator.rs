//! URL 验证与拼接
//!
//! 只接受 http / https 的目标地址

use url::Url;

use crate::errors::{Result, ShortenerError};

/// 明确拒绝的协议
const BLOCKED_SCHEMES: &[&str] = &["javascript", "data", "file", "vbscript", "about", "blob"];

/// 校验待缩短的原始 URL，返回规范化后的地址
pub fn validate_url(raw: &str) -> Result<Url> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(ShortenerError::validation("URL cannot be empty"));
    }

    let parsed = Url::parse(raw)
        .map_err(|e| ShortenerError::validation(format!("Invalid URL format: {}", e)))?;

    let scheme = parsed.scheme();
    if BLOCKED_SCHEMES.contains(&scheme) {
        return Err(ShortenerError::validation(format!(
            "URL scheme is not allowed: {}:",
            scheme
        )));
    }
    if scheme != "http" && scheme != "https" {
        return Err(ShortenerError::validation(format!(
            "URL must start with http:// or https://, got {}:",
            scheme
        )));
    }
    if parsed.host_str().is_none_or(str::is_empty) {
        return Err(ShortenerError::validation("URL must contain a host"));
    }

    Ok(parsed)
}

/// 将短链接 ID 拼接到 base_url 后面
pub fn join_short_url(base_url: &str, id: &str) -> String {
    format!("{}/{}", base_url.trim_end_matches('/'), id)
}
