use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 模型预测类别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PredictionClass {
    Close,
    Normal,
    Fault,
}

impl PredictionClass {
    /// 在 `result[0]` 概率向量中的下标
    pub fn index(&self) -> usize {
        match self {
            PredictionClass::Close => 0,
            PredictionClass::Normal => 1,
            PredictionClass::Fault => 2,
        }
    }
}

/// 历史记录级别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PredictionKind {
    Warning,
    Caution,
}

/// 预测推送消息
#[derive(Debug, Clone, Deserialize)]
pub struct PredictionMessage {
    #[serde(rename = "predictedClass")]
    pub predicted_class: Option<PredictionClass>,
    #[serde(rename = "deviceID")]
    pub device_id: Option<String>,
    pub result: Option<Vec<Vec<f64>>>,
}

/// 历史记录条目
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictionItem {
    #[serde(rename = "type")]
    pub kind: PredictionKind,
    #[serde(rename = "deviceID")]
    pub device_id: String,
    pub prediction_class: PredictionClass,
    pub probability: f64,
    pub time: DateTime<Utc>,
}

impl PredictionItem {
    /// 由推送消息构造条目
    ///
    /// 缺少字段或类别为 `Close` 时返回 `None`。
    pub fn from_message(message: PredictionMessage, time: DateTime<Utc>) -> Option<Self> {
        let class = message.predicted_class?;
        let device_id = message.device_id.filter(|id| !id.is_empty())?;
        let result = message.result?;

        if class == PredictionClass::Close {
            return None;
        }

        let probability = result
            .first()
            .and_then(|row| row.get(class.index()))
            .copied()
            .filter(|p| p.is_finite())
            .map(|p| (p * 100.0).round() / 100.0)
            .unwrap_or(0.0);

        let kind = match class {
            PredictionClass::Fault => PredictionKind::Warning,
            _ => PredictionKind::Caution,
        };

        Some(Self {
            kind,
            device_id,
            prediction_class: class,
            probability,
            time,
        })
    }
}

/// 通知类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Warning,
    Caution,
    Success,
    Expire,
}

/// 通知推送消息
#[derive(Debug, Clone, Deserialize)]
pub struct NotificationMessage {
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub title: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub details: String,
}

/// 通知条目
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationItem {
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub details: String,
    pub time: DateTime<Utc>,
    pub read: bool,
}

impl NotificationItem {
    pub fn from_message(message: NotificationMessage, time: DateTime<Utc>) -> Self {
        Self {
            kind: message.kind,
            title: message.title,
            message: message.message,
            details: message.details,
            time,
            read: false,
        }
    }
}
