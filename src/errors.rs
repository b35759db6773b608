use std::fmt;

#[derive(Debug, Clone)]
pub enum ShortenerError {
    Validation(String),
    NotFound(String),
    /// 原始 URL 已存在，载荷为已有的短链接 ID（或服务层拼接后的完整短链接）
    UrlConflict(String),
    UrlDeleted(String),
    StorageOperation(String),
    FileOperation(String),
    Serialization(String),
    Config(String),
    Cancelled(String),
    DeadlineExceeded(String),
}

impl ShortenerError {
    /// 获取错误代码
    pub fn code(&self) -> &'static str {
        match self {
            ShortenerError::Validation(_) => "E001",
            ShortenerError::NotFound(_) => "E002",
            ShortenerError::UrlConflict(_) => "E003",
            ShortenerError::UrlDeleted(_) => "E004",
            ShortenerError::StorageOperation(_) => "E005",
            ShortenerError::FileOperation(_) => "E006",
            ShortenerError::Serialization(_) => "E007",
            ShortenerError::Config(_) => "E008",
            ShortenerError::Cancelled(_) => "E009",
            ShortenerError::DeadlineExceeded(_) => "E010",
        }
    }

    /// 获取错误类型名称
    pub fn error_type(&self) -> &'static str {
        match self {
            ShortenerError::Validation(_) => "Validation Error",
            ShortenerError::NotFound(_) => "Resource Not Found",
            ShortenerError::UrlConflict(_) => "URL Already Exists",
            ShortenerError::UrlDeleted(_) => "URL Deleted",
            ShortenerError::StorageOperation(_) => "Storage Operation Error",
            ShortenerError::FileOperation(_) => "File Operation Error",
            ShortenerError::Serialization(_) => "Serialization Error",
            ShortenerError::Config(_) => "Configuration Error",
            ShortenerError::Cancelled(_) => "Operation Cancelled",
            ShortenerError::DeadlineExceeded(_) => "Deadline Exceeded",
        }
    }

    /// 获取错误详情
    pub fn message(&self) -> &str {
        match self {
            ShortenerError::Validation(msg)
            | ShortenerError::NotFound(msg)
            | ShortenerError::UrlConflict(msg)
            | ShortenerError::UrlDeleted(msg)
            | ShortenerError::StorageOperation(msg)
            | ShortenerError::FileOperation(msg)
            | ShortenerError::Serialization(msg)
            | ShortenerError::Config(msg)
            | ShortenerError::Cancelled(msg)
            | ShortenerError::DeadlineExceeded(msg) => msg,
        }
    }

    /// 格式化为彩色输出（用于终端）
    pub fn format_colored(&self) -> String {
        use colored::Colorize;
        format!(
            "{} {} {}\n  {}",
            "[ERROR]".red().bold(),
            self.code().yellow(),
            self.error_type().red(),
            self.message().white()
        )
    }

    /// 格式化为简洁输出（用于日志）
    pub fn format_simple(&self) -> String {
        format!("{}: {}", self.error_type(), self.message())
    }

    /// 是否为取消类错误（提交方可据此回退到同步删除）
    pub fn is_cancelled(&self) -> bool {
        matches!(self, ShortenerError::Cancelled(_))
    }
}

impl fmt::Display for ShortenerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format_simple())
    }
}

impl std::error::Error for ShortenerError {}

// 便捷的构造函数
impl ShortenerError {
    pub fn validation<T: Into<String>>(msg: T) -> Self {
        ShortenerError::Validation(msg.into())
    }

    pub fn not_found<T: Into<String>>(msg: T) -> Self {
        ShortenerError::NotFound(msg.into())
    }

    pub fn url_conflict<T: Into<String>>(existing: T) -> Self {
        ShortenerError::UrlConflict(existing.into())
    }

    pub fn url_deleted<T: Into<String>>(msg: T) -> Self {
        ShortenerError::UrlDeleted(msg.into())
    }

    pub fn storage_operation<T: Into<String>>(msg: T) -> Self {
        ShortenerError::StorageOperation(msg.into())
    }

    pub fn file_operation<T: Into<String>>(msg: T) -> Self {
        ShortenerError::FileOperation(msg.into())
    }

    pub fn serialization<T: Into<String>>(msg: T) -> Self {
        ShortenerError::Serialization(msg.into())
    }

    pub fn config<T: Into<String>>(msg: T) -> Self {
        ShortenerError::Config(msg.into())
    }

    pub fn cancelled<T: Into<String>>(msg: T) -> Self {
        ShortenerError::Cancelled(msg.into())
    }

    pub fn deadline_exceeded<T: Into<String>>(msg: T) -> Self {
        ShortenerError::DeadlineExceeded(msg.into())
    }
}

impl From<std::io::Error> for ShortenerError {
    fn from(err: std::io::Error) -> Self {
        ShortenerError::FileOperation(err.to_string())
    }
}

impl From<serde_json::Error> for ShortenerError {
    fn from(err: serde_json::Error) -> Self {
        ShortenerError::Serialization(err.to_string())
    }
}

impl From<config::ConfigError> for ShortenerError {
    fn from(err: config::ConfigError) -> Self {
        ShortenerError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for ShortenerError {
    fn from(err: toml::ser::Error) -> Self {
        ShortenerError::Serialization(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ShortenerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes_are_unique() {
        let errors = [
            ShortenerError::validation("x"),
            ShortenerError::not_found("x"),
            ShortenerError::url_conflict("x"),
            ShortenerError::url_deleted("x"),
            ShortenerError::storage_operation("x"),
            ShortenerError::file_operation("x"),
            ShortenerError::serialization("x"),
            ShortenerError::config("x"),
            ShortenerError::cancelled("x"),
            ShortenerError::deadline_exceeded("x"),
        ];
        let codes: std::collections::HashSet<_> = errors.iter().map(|e| e.code()).collect();
        assert_eq!(codes.len(), errors.len());
    }

    #[test]
    fn test_display_uses_simple_format() {
        let err = ShortenerError::cancelled("delete worker pool is shutting down");
        assert_eq!(
            err.to_string(),
            "Operation Cancelled: delete worker pool is shutting down"
        );
        assert!(err.is_cancelled());
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: ShortenerError = io.into();
        assert_eq!(err.code(), "E006");
        assert_eq!(err.message(), "missing");
    }
}
