use thiserror::Error;

/// 本地缓存与凭据存储的错误
#[derive(Error, Debug)]
pub enum DeviceError {
    /// 缓存中没有该设备
    #[error("Device {0} is not in the local cache")]
    NotFound(String),

    /// 同一设备 ID 只能登记一次
    #[error("Device {0} is already registered")]
    AlreadyExists(String),

    /// 表单输入不合法，在写入前拦截
    #[error("{0}")]
    Invalid(String),

    /// 状态文件读写失败
    #[error("State file I/O failed: {0}")]
    Storage(#[from] std::io::Error),

    /// 状态文件内容无法编解码
    #[error("State file is not valid JSON: {0}")]
    Checkpoint(#[from] serde_json::Error),

    /// 后端同步失败
    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, DeviceError>;

impl DeviceError {
    pub fn validation(msg: impl Into<String>) -> Self {
        DeviceError::Invalid(msg.into())
    }
}
