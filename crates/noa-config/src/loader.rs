use anyhow::{anyhow, Result};
use config::{Config, Environment, File, FileFormat};
use std::path::{Path, PathBuf};

use crate::ClientConfig;

/// 配置加载器
pub struct ConfigLoader {
    config_dir: PathBuf,
}

impl ConfigLoader {
    pub const FILE_NAME: &'static str = "client.toml";

    /// 创建配置加载器
    pub fn new<P: AsRef<Path>>(config_dir: P) -> Self {
        Self {
            config_dir: config_dir.as_ref().to_path_buf(),
        }
    }

    /// 加载客户端配置
    ///
    /// 文件不存在时使用默认值；`NOA_` 前缀的环境变量覆盖文件中的值，
    /// 例如 `NOA_WEBSOCKET__BASE_URL`。
    pub fn load(&self) -> Result<ClientConfig> {
        let config_path = self.config_dir.join(Self::FILE_NAME);

        let config = Config::builder()
            .add_source(
                File::new(
                    config_path.to_str().ok_or_else(|| anyhow!("Invalid config path"))?,
                    FileFormat::Toml,
                )
                .required(false),
            )
            .add_source(
                Environment::with_prefix("NOA")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        Ok(config.try_deserialize()?)
    }

    /// 加载并验证
    pub fn load_validated(&self) -> Result<ClientConfig> {
        let config = self.load()?;
        Self::validate(&config)?;
        Ok(config)
    }

    /// 验证配置
    pub fn validate(config: &ClientConfig) -> Result<()> {
        if config.buffer.capacity == 0 {
            return Err(anyhow!("buffer.capacity must be greater than 0"));
        }

        if config.buffer.table_rows == 0 || config.buffer.temperature_rows == 0 {
            return Err(anyhow!("buffer table rows must be greater than 0"));
        }

        if config.buffer.feed_capacity == 0 {
            return Err(anyhow!("buffer.feed_capacity must be greater than 0"));
        }

        let ws = &config.websocket;
        if ws.heartbeat_interval_secs == 0 {
            return Err(anyhow!("websocket.heartbeat_interval_secs must be greater than 0"));
        }

        if ws.heartbeat_timeout_secs <= ws.heartbeat_interval_secs {
            return Err(anyhow!(
                "heartbeat_timeout_secs ({}) must be greater than heartbeat_interval_secs ({})",
                ws.heartbeat_timeout_secs,
                ws.heartbeat_interval_secs
            ));
        }

        if ws.reconnect.initial_delay_ms > ws.reconnect.max_delay_ms {
            return Err(anyhow!(
                "reconnect.initial_delay_ms ({}) cannot be greater than reconnect.max_delay_ms ({})",
                ws.reconnect.initial_delay_ms,
                ws.reconnect.max_delay_ms
            ));
        }

        url_scheme(&config.api.base_url, &["http", "https"])?;
        url_scheme(&ws.base_url, &["ws", "wss"])?;

        Ok(())
    }
}

fn url_scheme(url: &str, allowed: &[&str]) -> Result<()> {
    let scheme = url
        .split_once("://")
        .map(|(scheme, _)| scheme)
        .ok_or_else(|| anyhow!("Invalid base url: {}", url))?;

    if !allowed.contains(&scheme) {
        return Err(anyhow!("Unsupported scheme '{}' in {}", scheme, url));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_load_default_config() {
        let temp_dir = tempdir().unwrap();
        let loader = ConfigLoader::new(temp_dir.path());

        let config = loader.load().unwrap();
        assert_eq!(config.buffer.capacity, 200);
        assert!(config.websocket.reconnect.enabled);
    }

    #[test]
    fn test_load_config_from_file() {
        let temp_dir = tempdir().unwrap();
        let config_content = r#"
[api]
base_url = "https://api.example.com"
timeout_secs = 5

[websocket]
base_url = "wss://ws.example.com"
heartbeat_interval_secs = 10
heartbeat_timeout_secs = 30

[websocket.reconnect]
max_attempts = 3

[buffer]
capacity = 100

[logging]
level = "debug"
json = true
"#;

        fs::write(temp_dir.path().join(ConfigLoader::FILE_NAME), config_content).unwrap();

        let loader = ConfigLoader::new(temp_dir.path());
        let config = loader.load_validated().unwrap();

        assert_eq!(config.api.base_url, "https://api.example.com");
        assert_eq!(config.api.timeout_secs, 5);
        assert_eq!(config.websocket.base_url, "wss://ws.example.com");
        assert_eq!(config.websocket.reconnect.max_attempts, 3);
        assert_eq!(config.websocket.reconnect.initial_delay_ms, 1_000);
        assert_eq!(config.buffer.capacity, 100);
        assert!(config.logging.json);
    }

    #[test]
    fn test_validate_config() {
        assert!(ConfigLoader::validate(&ClientConfig::default()).is_ok());

        let mut config = ClientConfig::default();
        config.buffer.capacity = 0;
        assert!(ConfigLoader::validate(&config).is_err());

        let mut config = ClientConfig::default();
        config.websocket.heartbeat_timeout_secs = config.websocket.heartbeat_interval_secs;
        assert!(ConfigLoader::validate(&config).is_err());

        let mut config = ClientConfig::default();
        config.websocket.reconnect.initial_delay_ms = 120_000;
        assert!(ConfigLoader::validate(&config).is_err());

        let mut config = ClientConfig::default();
        config.websocket.base_url = "http://localhost:8000".to_string();
        assert!(ConfigLoader::validate(&config).is_err());
    }
}
