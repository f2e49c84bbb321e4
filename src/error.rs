//! 统一错误模型
//! 定义会话层的所有错误类型；守卫内部会把它们吸收为状态，不向页面传播

use thiserror::Error;

/// 令牌声明解析错误
///
/// 仅作为数据返回给调用方，守卫将其等同于“令牌已过期”处理。
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClaimsError {
    #[error("token must have three dot-separated segments, found {0}")]
    Segments(usize),

    #[error("payload segment is not valid base64")]
    Base64,

    #[error("payload is not a JSON object: {0}")]
    Json(String),

    #[error("expiry claim is missing")]
    MissingExpiry,

    #[error("expiry claim is not a representable timestamp")]
    InvalidExpiry,
}

/// 令牌存储错误
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("storage data is corrupted: {0}")]
    Corrupted(#[from] serde_json::Error),

    #[error("storage lock poisoned")]
    Poisoned,
}

/// 刷新令牌请求失败
#[derive(Debug, Error)]
pub enum RefreshError {
    /// 身份端点返回非 2xx
    #[error("refresh rejected with status {status}")]
    Rejected { status: u16 },

    /// 响应体缺少 data.token 或不是 JSON
    #[error("malformed refresh response: {0}")]
    Malformed(String),

    #[error("refresh transport error: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("refresh request timed out")]
    Timeout,
}

impl RefreshError {
    /// 是否为可重试的瞬时故障（网络/超时）
    pub fn is_transient(&self) -> bool {
        matches!(self, RefreshError::Transport(_) | RefreshError::Timeout)
    }

    /// 指标标签
    pub fn outcome(&self) -> &'static str {
        match self {
            RefreshError::Rejected { .. } => "rejected",
            RefreshError::Malformed(_) => "malformed",
            RefreshError::Transport(_) => "transport",
            RefreshError::Timeout => "timeout",
        }
    }
}

impl From<reqwest::Error> for RefreshError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            RefreshError::Timeout
        } else if e.is_decode() {
            RefreshError::Malformed(e.to_string())
        } else {
            RefreshError::Transport(e)
        }
    }
}

/// 应用错误类型
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl AppError {
    /// 获取用户友好的错误消息（不包含敏感信息）
    pub fn user_message(&self) -> String {
        match self {
            AppError::Authentication(msg) => msg.clone(),
            AppError::Validation(msg) => msg.clone(),
            AppError::Config(_) => "Configuration error".to_string(),
            AppError::Storage(_) => "Session storage error".to_string(),
            AppError::Http(_) => "Identity service unavailable".to_string(),
        }
    }
}

impl From<config::ConfigError> for AppError {
    fn from(e: config::ConfigError) -> Self {
        AppError::Config(e.to_string())
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(e: validator::ValidationErrors) -> Self {
        AppError::Validation(e.to_string())
    }
}
