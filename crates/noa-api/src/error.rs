use thiserror::Error;

/// REST 客户端错误类型
#[derive(Error, Debug)]
pub enum ApiError {
    /// 请求发出前的参数校验失败
    #[error("{0}")]
    Validation(String),

    /// 后端返回非 2xx
    #[error("{message} (HTTP {status})")]
    Backend { status: u16, message: String },

    /// 网络错误
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// 令牌无法解析
    #[error("Invalid token: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),

    /// 序列化错误
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// REST 客户端结果类型
pub type Result<T> = std::result::Result<T, ApiError>;

impl ApiError {
    /// 创建校验错误
    pub fn validation(msg: impl Into<String>) -> Self {
        ApiError::Validation(msg.into())
    }

    /// 后端错误的提示文本
    pub fn user_message(&self) -> String {
        match self {
            ApiError::Backend { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }
}
