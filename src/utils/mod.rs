pub mod url_validator;

pub use url_validator::{join_short_url, validate_url};

/// 短链接 ID 使用的 URL 安全字符集
const ID_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789-_";

/// 默认短链接 ID 长度
pub const DEFAULT_ID_LENGTH: usize = 8;

/// 生成指定长度的 URL 安全随机 ID
pub fn generate_short_id(length: usize) -> String {
    std::iter::repeat_with(|| ID_ALPHABET[rand::random_range(0..ID_ALPHABET.len())] as char)
        .take(length)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_short_id_length_and_charset() {
        for len in [1, DEFAULT_ID_LENGTH, 32] {
            let id = generate_short_id(len);
            assert_eq!(id.len(), len);
            assert!(id.bytes().all(|b| ID_ALPHABET.contains(&b)));
        }
    }

    #[test]
    fn test_generate_short_id_is_random() {
        let ids: std::collections::HashSet<_> = (0..100).map(|_| generate_short_id(12)).collect();
        assert!(ids.len() > 95);
    }
}
