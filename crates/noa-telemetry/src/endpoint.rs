use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;

use crate::{Result, TelemetryError};

/// 连接标识：(用户, 设备)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConnectionKey {
    pub user_id: String,
    pub device_id: String,
}

impl ConnectionKey {
    pub fn new(user_id: impl Into<String>, device_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            device_id: device_id.into(),
        }
    }
}

impl fmt::Display for ConnectionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.user_id, self.device_id)
    }
}

/// 推送订阅端点
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Endpoint {
    /// 单个设备的实时数据
    Broadcast { user_id: String, device_id: String },
    /// 用户的预测历史
    History { user_id: String },
    /// 用户的通知
    Notification { user_id: String },
}

impl Endpoint {
    pub fn broadcast(key: &ConnectionKey) -> Self {
        Endpoint::Broadcast {
            user_id: key.user_id.clone(),
            device_id: key.device_id.clone(),
        }
    }

    pub fn history(user_id: impl Into<String>) -> Self {
        Endpoint::History {
            user_id: user_id.into(),
        }
    }

    pub fn notification(user_id: impl Into<String>) -> Self {
        Endpoint::Notification {
            user_id: user_id.into(),
        }
    }

    pub fn path(&self) -> &'static str {
        match self {
            // 服务端路由名就是 boadcast
            Endpoint::Broadcast { .. } => "/ws/boadcast",
            Endpoint::History { .. } => "/ws/history",
            Endpoint::Notification { .. } => "/ws/notification",
        }
    }

    pub fn user_id(&self) -> &str {
        match self {
            Endpoint::Broadcast { user_id, .. }
            | Endpoint::History { user_id }
            | Endpoint::Notification { user_id } => user_id,
        }
    }

    pub fn device_id(&self) -> Option<&str> {
        match self {
            Endpoint::Broadcast { device_id, .. } => Some(device_id),
            _ => None,
        }
    }

    /// 构造连接地址
    ///
    /// 用户或设备 ID 为空（或只有空白）时返回 [`TelemetryError::MissingId`]。
    pub fn url(&self, base: &str) -> Result<Url> {
        if self.user_id().trim().is_empty() {
            return Err(TelemetryError::MissingId("userID"));
        }
        if let Some(device_id) = self.device_id() {
            if device_id.trim().is_empty() {
                return Err(TelemetryError::MissingId("deviceID"));
            }
        }

        let mut url = Url::parse(&format!("{}{}", base.trim_end_matches('/'), self.path()))?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("userID", self.user_id());
            if let Some(device_id) = self.device_id() {
                query.append_pair("deviceID", device_id);
            }
        }

        Ok(url)
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Endpoint::Broadcast { user_id, device_id } => {
                write!(f, "broadcast:{}_{}", user_id, device_id)
            }
            Endpoint::History { user_id } => write!(f, "history:{}", user_id),
            Endpoint::Notification { user_id } => write!(f, "notification:{}", user_id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_broadcast_url() {
        let endpoint = Endpoint::broadcast(&ConnectionKey::new("u1", "d1"));
        let url = endpoint.url("ws://localhost:8000/").unwrap();

        assert_eq!(url.as_str(), "ws://localhost:8000/ws/boadcast?userID=u1&deviceID=d1");
    }

    #[test]
    fn test_user_scoped_urls() {
        let history = Endpoint::history("u1").url("wss://api.example.com").unwrap();
        assert_eq!(history.path(), "/ws/history");
        assert_eq!(history.query(), Some("userID=u1"));

        let notification = Endpoint::notification("u1").url("wss://api.example.com").unwrap();
        assert_eq!(notification.path(), "/ws/notification");
    }

    #[test]
    fn test_query_values_are_encoded() {
        let endpoint = Endpoint::broadcast(&ConnectionKey::new("a b", "x&y"));
        let url = endpoint.url("ws://localhost").unwrap();

        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert_eq!(
            pairs,
            vec![
                ("userID".to_string(), "a b".to_string()),
                ("deviceID".to_string(), "x&y".to_string())
            ]
        );
    }

    #[test]
    fn test_missing_ids() {
        let err = Endpoint::broadcast(&ConnectionKey::new("", "d1"))
            .url("ws://localhost")
            .unwrap_err();
        assert!(matches!(err, TelemetryError::MissingId("userID")));

        let err = Endpoint::broadcast(&ConnectionKey::new("u1", "  "))
            .url("ws://localhost")
            .unwrap_err();
        assert!(matches!(err, TelemetryError::MissingId("deviceID")));

        assert!(matches!(
            Endpoint::history("").url("ws://localhost"),
            Err(TelemetryError::MissingId("userID"))
        ));
    }

    #[test]
    fn test_invalid_base() {
        assert!(matches!(
            Endpoint::history("u1").url("not a url"),
            Err(TelemetryError::InvalidUrl(_))
        ));
    }
}
