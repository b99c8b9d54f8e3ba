use chrono::{DateTime, Utc};
use noa_types::Device;
use serde::{Deserialize, Serialize};

/// 后端登记的设备
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteDevice {
    #[serde(rename = "UserID", default)]
    pub user_id: String,
    #[serde(rename = "DeviceID")]
    pub device_id: String,
    #[serde(rename = "DeviceName", default)]
    pub device_name: String,
    #[serde(rename = "CreateDate", default)]
    pub create_date: DateTime<Utc>,
    #[serde(rename = "CurrentDate", default)]
    pub current_date: DateTime<Utc>,
    #[serde(rename = "Bookmark", default)]
    pub bookmark: bool,
    #[serde(rename = "Usage", default)]
    pub usage: i64,
    #[serde(rename = "Status", default)]
    pub status: bool,
}

impl From<RemoteDevice> for Device {
    fn from(remote: RemoteDevice) -> Self {
        let name = if remote.device_name.trim().is_empty() {
            remote.device_id.clone()
        } else {
            remote.device_name
        };

        Device {
            id: remote.device_id,
            name,
            usage: u32::try_from(remote.usage.max(0)).unwrap_or(u32::MAX),
            start_date: remote.create_date,
            current_date: remote.current_date,
            bookmarked: remote.bookmark,
        }
    }
}

/// 用户资料
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub gender: String,
}

/// 注册结果
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RegisterResponse {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    /// 已散列的密码，验证 OTP 时回传
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub message: String,
}
