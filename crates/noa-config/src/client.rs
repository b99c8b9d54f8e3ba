use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::websocket::WebSocketConfig;

/// 客户端配置
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ClientConfig {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub websocket: WebSocketConfig,
    #[serde(default)]
    pub buffer: BufferConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// REST 接口配置
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiConfig {
    #[serde(default = "default_api_base_url")]
    pub base_url: String,

    /// 请求超时（秒）
    #[serde(default = "default_api_timeout")]
    pub timeout_secs: u64,
}

impl ApiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_api_base_url(),
            timeout_secs: default_api_timeout(),
        }
    }
}

/// 采样缓冲配置
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BufferConfig {
    /// 每个通道保留的样本数
    #[serde(default = "default_buffer_capacity")]
    pub capacity: usize,

    /// 表格视图最多显示的行数
    #[serde(default = "default_buffer_capacity")]
    pub table_rows: usize,

    /// 温度表格行数
    #[serde(default = "default_temperature_rows")]
    pub temperature_rows: usize,

    /// 历史记录/通知列表上限
    #[serde(default = "default_feed_capacity")]
    pub feed_capacity: usize,
}

impl Default for BufferConfig {
    fn default() -> Self {
        Self {
            capacity: default_buffer_capacity(),
            table_rows: default_buffer_capacity(),
            temperature_rows: default_temperature_rows(),
            feed_capacity: default_feed_capacity(),
        }
    }
}

/// 本地存储配置
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    #[serde(default = "default_state_file")]
    pub state_file: String,
}

impl StorageConfig {
    /// 本地状态文件完整路径
    pub fn state_path(&self) -> PathBuf {
        self.data_dir.join(&self.state_file)
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            state_file: default_state_file(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    /// 输出 JSON 格式日志
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

// 默认值函数
fn default_api_base_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_api_timeout() -> u64 {
    15
}

fn default_buffer_capacity() -> usize {
    200
}

fn default_temperature_rows() -> usize {
    10
}

fn default_feed_capacity() -> usize {
    200
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}

fn default_state_file() -> String {
    "noa-state.json".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}
