use serde::{Deserialize, Serialize};
use std::time::Duration;

/// 实时推送连接配置
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WebSocketConfig {
    #[serde(default = "default_ws_base_url")]
    pub base_url: String,

    /// 心跳间隔（秒）
    #[serde(default = "default_heartbeat_interval")]
    pub heartbeat_interval_secs: u64,

    /// 超过此时间未收到任何数据则认为连接已失效（秒）
    #[serde(default = "default_heartbeat_timeout")]
    pub heartbeat_timeout_secs: u64,

    #[serde(default)]
    pub reconnect: ReconnectConfig,
}

impl WebSocketConfig {
    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(self.heartbeat_interval_secs)
    }

    pub fn heartbeat_timeout(&self) -> Duration {
        Duration::from_secs(self.heartbeat_timeout_secs)
    }
}

impl Default for WebSocketConfig {
    fn default() -> Self {
        Self {
            base_url: default_ws_base_url(),
            heartbeat_interval_secs: default_heartbeat_interval(),
            heartbeat_timeout_secs: default_heartbeat_timeout(),
            reconnect: ReconnectConfig::default(),
        }
    }
}

/// 重连配置（指数退避）
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ReconnectConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default = "default_initial_delay")]
    pub initial_delay_ms: u64,

    #[serde(default = "default_max_delay")]
    pub max_delay_ms: u64,
}

impl ReconnectConfig {
    /// 第 `attempt` 次重连前的等待时间（attempt 从 1 开始）
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(31);
        let delay = self
            .initial_delay_ms
            .saturating_mul(1u64 << exponent)
            .min(self.max_delay_ms);
        Duration::from_millis(delay)
    }
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_attempts: default_max_attempts(),
            initial_delay_ms: default_initial_delay(),
            max_delay_ms: default_max_delay(),
        }
    }
}

fn default_ws_base_url() -> String {
    "ws://localhost:8000".to_string()
}

fn default_heartbeat_interval() -> u64 {
    15
}

fn default_heartbeat_timeout() -> u64 {
    45
}

fn default_true() -> bool {
    true
}

fn default_max_attempts() -> u32 {
    10
}

fn default_initial_delay() -> u64 {
    1_000
}

fn default_max_delay() -> u64 {
    60_000
}
