use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 本地缓存的设备信息
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Device {
    /// 设备 ID（即设备地址）
    pub id: String,

    /// 设备名称
    pub name: String,

    /// 进入仪表盘的次数
    #[serde(default)]
    pub usage: u32,

    /// 注册时间
    pub start_date: DateTime<Utc>,

    /// 最近一次刷新时间
    pub current_date: DateTime<Utc>,

    /// 是否收藏
    #[serde(default)]
    pub bookmarked: bool,
}

impl Device {
    /// 创建新设备
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            name: name.into(),
            usage: 0,
            start_date: now,
            current_date: now,
            bookmarked: false,
        }
    }

    /// 记录一次使用
    pub fn record_usage(&mut self) {
        self.usage = self.usage.saturating_add(1);
        self.touch();
    }

    /// 切换收藏状态，返回新状态
    pub fn toggle_bookmark(&mut self) -> bool {
        self.bookmarked = !self.bookmarked;
        self.bookmarked
    }

    /// 刷新当前时间
    pub fn touch(&mut self) {
        self.current_date = Utc::now();
    }

    /// 注册时间，如 `Jan 5, 2025, 09:30 AM`
    pub fn display_start_date(&self) -> String {
        self.start_date.format("%b %-d, %Y, %I:%M %p").to_string()
    }

    /// 当前时间，如 `05/1/2025 - 9:30 AM`
    pub fn display_current_date(&self) -> String {
        self.current_date.format("%d/%-m/%Y - %-I:%M %p").to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_device_usage_and_bookmark() {
        let mut device = Device::new("0x50", "Pump A");
        assert_eq!(device.usage, 0);
        assert!(!device.bookmarked);

        device.record_usage();
        device.record_usage();
        assert_eq!(device.usage, 2);

        assert!(device.toggle_bookmark());
        assert!(!device.toggle_bookmark());
    }

    #[test]
    fn test_device_serde_camel_case() {
        let device = Device::new("0x50", "Pump A");
        let json = serde_json::to_value(&device).unwrap();
        assert!(json.get("startDate").is_some());
        assert!(json.get("currentDate").is_some());

        // 旧缓存可能缺少 usage / bookmarked
        let legacy = serde_json::json!({
            "id": "0x51",
            "name": "Fan",
            "startDate": "2025-01-05T09:30:00Z",
            "currentDate": "2025-01-05T09:30:00Z"
        });
        let device: Device = serde_json::from_value(legacy).unwrap();
        assert_eq!(device.usage, 0);
        assert!(!device.bookmarked);
    }

    #[test]
    fn test_display_dates() {
        let mut device = Device::new("0x50", "Pump A");
        device.start_date = Utc.with_ymd_and_hms(2025, 1, 5, 9, 30, 0).unwrap();
        device.current_date = Utc.with_ymd_and_hms(2025, 1, 5, 21, 7, 0).unwrap();

        assert_eq!(device.display_start_date(), "Jan 5, 2025, 09:30 AM");
        assert_eq!(device.display_current_date(), "05/1/2025 - 9:07 PM");
    }
}
