use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// 帧解码错误
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("Malformed telemetry frame: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("Unknown channel: {0}")]
    UnknownChannel(String),
}

/// 传感器轴
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    pub const ALL: [Axis; 3] = [Axis::X, Axis::Y, Axis::Z];

    pub fn as_str(&self) -> &'static str {
        match self {
            Axis::X => "X",
            Axis::Y => "Y",
            Axis::Z => "Z",
        }
    }
}

/// 物理量
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Quantity {
    Acceleration,
    VelocityAngular,
    VibrationSpeed,
    VibrationAngle,
    VibrationDisplacement,
    Frequency,
}

impl Quantity {
    pub const ALL: [Quantity; 6] = [
        Quantity::Acceleration,
        Quantity::VelocityAngular,
        Quantity::VibrationSpeed,
        Quantity::VibrationAngle,
        Quantity::VibrationDisplacement,
        Quantity::Frequency,
    ];

    /// 通道名中使用的小写形式
    pub fn as_str(&self) -> &'static str {
        match self {
            Quantity::Acceleration => "acceleration",
            Quantity::VelocityAngular => "velocityangular",
            Quantity::VibrationSpeed => "vibrationspeed",
            Quantity::VibrationAngle => "vibrationangle",
            Quantity::VibrationDisplacement => "vibrationdisplacement",
            Quantity::Frequency => "frequency",
        }
    }

    /// 显示标题
    pub fn title(&self) -> &'static str {
        match self {
            Quantity::Acceleration => "Acceleration",
            Quantity::VelocityAngular => "Velocity Angular",
            Quantity::VibrationSpeed => "Vibration Speed",
            Quantity::VibrationAngle => "Vibration Angle",
            Quantity::VibrationDisplacement => "Vibration Displacement",
            Quantity::Frequency => "Frequency",
        }
    }

    /// 显示单位
    pub fn unit(&self) -> &'static str {
        match self {
            Quantity::Acceleration => "(g)",
            Quantity::VelocityAngular => "(°/s)",
            Quantity::VibrationSpeed => "(mm/s)",
            Quantity::VibrationAngle => "(°)",
            Quantity::VibrationDisplacement => "(um)",
            Quantity::Frequency => "(Hz)",
        }
    }
}

impl FromStr for Quantity {
    type Err = DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.to_ascii_lowercase().replace(['_', '-', ' '], "");
        Quantity::ALL
            .into_iter()
            .find(|q| q.as_str() == normalized)
            .ok_or_else(|| DecodeError::UnknownChannel(s.to_string()))
    }
}

/// 通道标识：一个轴上的一个物理量，或温度
///
/// 序列化为字符串形式，如 `"X.acceleration"`。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum ChannelKey {
    Axis(Axis, Quantity),
    Temperature,
}

impl ChannelKey {
    /// 18 个轴通道加上温度通道
    pub fn all() -> impl Iterator<Item = ChannelKey> {
        Axis::ALL
            .into_iter()
            .flat_map(|axis| Quantity::ALL.into_iter().map(move |q| ChannelKey::Axis(axis, q)))
            .chain(std::iter::once(ChannelKey::Temperature))
    }

    pub fn axis(&self) -> Option<Axis> {
        match self {
            ChannelKey::Axis(axis, _) => Some(*axis),
            ChannelKey::Temperature => None,
        }
    }
}

impl fmt::Display for ChannelKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChannelKey::Axis(axis, quantity) => write!(f, "{}.{}", axis.as_str(), quantity.as_str()),
            ChannelKey::Temperature => f.write_str("temperature"),
        }
    }
}

impl FromStr for ChannelKey {
    type Err = DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("temperature") {
            return Ok(ChannelKey::Temperature);
        }

        let (axis, quantity) = s
            .split_once('.')
            .ok_or_else(|| DecodeError::UnknownChannel(s.to_string()))?;
        let axis = match axis {
            "X" | "x" => Axis::X,
            "Y" | "y" => Axis::Y,
            "Z" | "z" => Axis::Z,
            _ => return Err(DecodeError::UnknownChannel(s.to_string())),
        };

        Ok(ChannelKey::Axis(axis, quantity.parse()?))
    }
}

impl From<ChannelKey> for String {
    fn from(key: ChannelKey) -> Self {
        key.to_string()
    }
}

impl TryFrom<String> for ChannelKey {
    type Error = DecodeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// 单轴读数
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AxisReading {
    pub acceleration: f64,
    pub velocity_angular: f64,
    pub vibration_speed: f64,
    pub vibration_angle: f64,
    pub vibration_displacement: f64,
    pub frequency: f64,
}

impl AxisReading {
    pub fn get(&self, quantity: Quantity) -> f64 {
        match quantity {
            Quantity::Acceleration => self.acceleration,
            Quantity::VelocityAngular => self.velocity_angular,
            Quantity::VibrationSpeed => self.vibration_speed,
            Quantity::VibrationAngle => self.vibration_angle,
            Quantity::VibrationDisplacement => self.vibration_displacement,
            Quantity::Frequency => self.frequency,
        }
    }

    /// 所有物理量相同的读数（测试和模拟数据用）
    pub fn uniform(value: f64) -> Self {
        Self {
            acceleration: value,
            velocity_angular: value,
            vibration_speed: value,
            vibration_angle: value,
            vibration_displacement: value,
            frequency: value,
        }
    }
}

/// 推送消息中的 `data` 部分
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameData {
    #[serde(rename = "DeviceAddress")]
    pub device_address: String,
    #[serde(rename = "X")]
    pub x: AxisReading,
    #[serde(rename = "Y")]
    pub y: AxisReading,
    #[serde(rename = "Z")]
    pub z: AxisReading,
    #[serde(rename = "Temperature")]
    pub temperature: f64,
}

/// 实时推送消息
///
/// ```json
/// { "userID": "...", "deviceID": "...", "data": { "DeviceAddress": "...", "X": {...}, ... } }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryMessage {
    #[serde(rename = "userID", default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(rename = "deviceID", default, skip_serializing_if = "Option::is_none")]
    pub device_id: Option<String>,
    pub data: FrameData,
}

/// 解码后的传感器帧
#[derive(Debug, Clone, PartialEq)]
pub struct SensorFrame {
    pub device_address: String,
    pub x: AxisReading,
    pub y: AxisReading,
    pub z: AxisReading,
    pub temperature: f64,
    /// 客户端接收时间（不信任负载中的时间）
    pub received_at: DateTime<Utc>,
}

impl SensorFrame {
    /// 解析一条原始推送消息
    pub fn decode(raw: &str, received_at: DateTime<Utc>) -> Result<Self, DecodeError> {
        let message: TelemetryMessage = serde_json::from_str(raw)?;
        Ok(Self::from_data(message.data, received_at))
    }

    pub fn from_data(data: FrameData, received_at: DateTime<Utc>) -> Self {
        Self {
            device_address: data.device_address,
            x: data.x,
            y: data.y,
            z: data.z,
            temperature: data.temperature,
            received_at,
        }
    }

    pub fn axis(&self, axis: Axis) -> &AxisReading {
        match axis {
            Axis::X => &self.x,
            Axis::Y => &self.y,
            Axis::Z => &self.z,
        }
    }

    pub fn value(&self, channel: ChannelKey) -> f64 {
        match channel {
            ChannelKey::Axis(axis, quantity) => self.axis(axis).get(quantity),
            ChannelKey::Temperature => self.temperature,
        }
    }
}

/// 格式化显示值：两位小数，左侧补零到 5 位
///
/// 只用于显示，存储保留完整精度。
pub fn format_reading(value: f64) -> String {
    if !value.is_finite() {
        return "--".to_string();
    }
    format!("{:05.2}", value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_payload() -> serde_json::Value {
        let axis = json!({
            "Acceleration": 1.25,
            "VelocityAngular": -0.5,
            "VibrationSpeed": 3.0,
            "VibrationAngle": 45.0,
            "VibrationDisplacement": 12.0,
            "Frequency": 50.0
        });
        json!({
            "userID": "u1",
            "deviceID": "d1",
            "data": {
                "DeviceAddress": "0x50",
                "X": axis,
                "Y": axis,
                "Z": axis,
                "Temperature": 27.4
            }
        })
    }

    #[test]
    fn test_channel_key_all() {
        let keys: Vec<_> = ChannelKey::all().collect();
        assert_eq!(keys.len(), 19);
        assert_eq!(keys[0], ChannelKey::Axis(Axis::X, Quantity::Acceleration));
        assert_eq!(keys[18], ChannelKey::Temperature);
    }

    #[test]
    fn test_channel_key_display_and_parse() {
        let key = ChannelKey::Axis(Axis::Y, Quantity::VibrationSpeed);
        assert_eq!(key.to_string(), "Y.vibrationspeed");
        assert_eq!("Y.vibrationspeed".parse::<ChannelKey>().unwrap(), key);
        assert_eq!("x.acceleration".parse::<ChannelKey>().unwrap().axis(), Some(Axis::X));
        assert_eq!("temperature".parse::<ChannelKey>().unwrap(), ChannelKey::Temperature);
        assert!("W.acceleration".parse::<ChannelKey>().is_err());
        assert!("X.pressure".parse::<ChannelKey>().is_err());
    }

    #[test]
    fn test_channel_key_serializes_as_string() {
        let key = ChannelKey::Axis(Axis::Z, Quantity::Frequency);
        assert_eq!(serde_json::to_value(key).unwrap(), json!("Z.frequency"));
        let back: ChannelKey = serde_json::from_value(json!("Z.frequency")).unwrap();
        assert_eq!(back, key);
    }

    #[test]
    fn test_quantity_parse_variants() {
        assert_eq!("vibration_speed".parse::<Quantity>().unwrap(), Quantity::VibrationSpeed);
        assert_eq!("Frequency".parse::<Quantity>().unwrap(), Quantity::Frequency);
    }

    #[test]
    fn test_decode_frame() {
        let raw = sample_payload().to_string();
        let now = Utc::now();
        let frame = SensorFrame::decode(&raw, now).unwrap();

        assert_eq!(frame.device_address, "0x50");
        assert_eq!(frame.received_at, now);
        assert_eq!(frame.value(ChannelKey::Axis(Axis::X, Quantity::Acceleration)), 1.25);
        assert_eq!(frame.value(ChannelKey::Axis(Axis::Z, Quantity::VelocityAngular)), -0.5);
        assert_eq!(frame.value(ChannelKey::Temperature), 27.4);
    }

    #[test]
    fn test_decode_missing_field_fails() {
        let mut payload = sample_payload();
        payload["data"]["Y"]
            .as_object_mut()
            .unwrap()
            .remove("Frequency");

        assert!(SensorFrame::decode(&payload.to_string(), Utc::now()).is_err());
    }

    #[test]
    fn test_decode_garbage_fails() {
        assert!(SensorFrame::decode("not json", Utc::now()).is_err());
        assert!(SensorFrame::decode("{\"data\": 1}", Utc::now()).is_err());
    }

    #[test]
    fn test_format_reading() {
        assert_eq!(format_reading(3.1), "03.10");
        assert_eq!(format_reading(0.0), "00.00");
        assert_eq!(format_reading(123.456), "123.46");
        assert_eq!(format_reading(-1.5), "-1.50");
        assert_eq!(format_reading(f64::NAN), "--");
    }
}
