use thiserror::Error;

/// 实时数据管道错误类型
#[derive(Error, Debug)]
pub enum TelemetryError {
    /// 缺少必需的 ID
    #[error("Missing required id: {0}")]
    MissingId(&'static str),

    /// 缓冲容量无效
    #[error("Invalid buffer capacity: {0}")]
    InvalidCapacity(usize),

    /// 地址无效
    #[error("Invalid url: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// 帧解码错误
    #[error(transparent)]
    Decode(#[from] noa_types::DecodeError),

    /// 序列化错误
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// 传输层错误
    #[error("Transport error: {0}")]
    Transport(String),
}

/// 实时数据管道结果类型
pub type Result<T> = std::result::Result<T, TelemetryError>;

impl TelemetryError {
    /// 创建传输层错误
    pub fn transport(msg: impl Into<String>) -> Self {
        TelemetryError::Transport(msg.into())
    }
}
