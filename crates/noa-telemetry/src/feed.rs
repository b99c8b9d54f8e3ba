use async_trait::async_trait;
use chrono::Utc;
use noa_types::{NotificationItem, NotificationMessage, PredictionItem, PredictionMessage};
use std::collections::VecDeque;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::sink::MessageSink;
use crate::{Result, TelemetryError};

/// 预测历史（最新的在前）
#[derive(Debug, Clone)]
pub struct HistoryFeed {
    items: VecDeque<PredictionItem>,
    capacity: usize,
}

impl HistoryFeed {
    pub fn new(capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(TelemetryError::InvalidCapacity(capacity));
        }
        Ok(Self {
            items: VecDeque::with_capacity(capacity),
            capacity,
        })
    }

    /// 处理一条预测消息，返回是否新增了条目
    ///
    /// `Close` 类别和缺少字段的消息被忽略。
    pub fn push_message(&mut self, raw: &str) -> bool {
        let message: PredictionMessage = match serde_json::from_str(raw) {
            Ok(message) => message,
            Err(e) => {
                warn!(error = %e, "Dropping malformed prediction message");
                return false;
            }
        };

        match PredictionItem::from_message(message, Utc::now()) {
            Some(item) => {
                self.push(item);
                true
            }
            None => {
                debug!("Ignoring prediction without a reportable class");
                false
            }
        }
    }

    pub fn push(&mut self, item: PredictionItem) {
        if self.items.len() == self.capacity {
            self.items.pop_back();
        }
        self.items.push_front(item);
    }

    pub fn items(&self) -> impl Iterator<Item = &PredictionItem> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }
}

#[async_trait]
impl MessageSink for RwLock<HistoryFeed> {
    async fn on_message(&self, text: &str) {
        self.write().await.push_message(text);
    }

    fn name(&self) -> &str {
        "history-feed"
    }
}

/// 通知列表（最新的在前）
#[derive(Debug, Clone)]
pub struct NotificationFeed {
    items: VecDeque<NotificationItem>,
    capacity: usize,
}

impl NotificationFeed {
    pub fn new(capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(TelemetryError::InvalidCapacity(capacity));
        }
        Ok(Self {
            items: VecDeque::with_capacity(capacity),
            capacity,
        })
    }

    pub fn push_message(&mut self, raw: &str) -> bool {
        match serde_json::from_str::<NotificationMessage>(raw) {
            Ok(message) => {
                self.push(NotificationItem::from_message(message, Utc::now()));
                true
            }
            Err(e) => {
                warn!(error = %e, "Dropping malformed notification");
                false
            }
        }
    }

    pub fn push(&mut self, item: NotificationItem) {
        if self.items.len() == self.capacity {
            self.items.pop_back();
        }
        self.items.push_front(item);
    }

    pub fn items(&self) -> impl Iterator<Item = &NotificationItem> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn unread_count(&self) -> usize {
        self.items.iter().filter(|item| !item.read).count()
    }

    pub fn mark_all_read(&mut self) {
        for item in self.items.iter_mut() {
            item.read = true;
        }
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }
}

#[async_trait]
impl MessageSink for RwLock<NotificationFeed> {
    async fn on_message(&self, text: &str) {
        self.write().await.push_message(text);
    }

    fn name(&self) -> &str {
        "notification-feed"
    }
}
