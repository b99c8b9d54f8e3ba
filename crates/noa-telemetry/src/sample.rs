use async_trait::async_trait;
use chrono::{DateTime, Utc};
use noa_types::{ChannelKey, SensorFrame};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};
use tracing::{debug, warn};

use crate::buffer::{ChannelBuffer, Sample};
use crate::sink::MessageSink;
use crate::Result;

/// 缓冲更新通知
#[derive(Debug, Clone, PartialEq)]
pub struct BufferUpdate {
    /// 帧序号（从 1 开始）
    pub seq: u64,
    pub device_address: String,
    pub received_at: DateTime<Utc>,
}

/// 单帧处理结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    Applied { seq: u64 },
    Dropped,
}

/// 采样缓冲
///
/// 每个通道一个 [`ChannelBuffer`]，同一帧的所有通道一起追加。
pub struct SampleBuffer {
    channels: HashMap<ChannelKey, ChannelBuffer>,
    capacity: usize,
    frames: u64,
    dropped: u64,
    last_device: Option<String>,
    updates: broadcast::Sender<BufferUpdate>,
}

pub type SharedSampleBuffer = Arc<RwLock<SampleBuffer>>;

impl SampleBuffer {
    pub const DEFAULT_CAPACITY: usize = 200;

    pub fn new(capacity: usize) -> Result<Self> {
        let mut channels = HashMap::new();
        for key in ChannelKey::all() {
            channels.insert(key, ChannelBuffer::with_capacity(capacity)?);
        }

        let (updates, _) = broadcast::channel(64);

        Ok(Self {
            channels,
            capacity,
            frames: 0,
            dropped: 0,
            last_device: None,
            updates,
        })
    }

    pub fn shared(capacity: usize) -> Result<SharedSampleBuffer> {
        Ok(Arc::new(RwLock::new(Self::new(capacity)?)))
    }

    /// 订阅缓冲更新
    pub fn subscribe(&self) -> broadcast::Receiver<BufferUpdate> {
        self.updates.subscribe()
    }

    /// 处理一条原始推送消息
    ///
    /// 解析失败时记录日志并丢弃整帧，不修改任何通道。
    pub fn on_frame(&mut self, raw: &str) -> FrameOutcome {
        match SensorFrame::decode(raw, Utc::now()) {
            Ok(frame) => FrameOutcome::Applied {
                seq: self.ingest(&frame),
            },
            Err(e) => {
                self.dropped += 1;
                warn!(error = %e, dropped = self.dropped, "Dropping malformed telemetry frame");
                FrameOutcome::Dropped
            }
        }
    }

    /// 写入已解码的帧，返回帧序号
    pub fn ingest(&mut self, frame: &SensorFrame) -> u64 {
        for (key, buffer) in self.channels.iter_mut() {
            buffer.push(Sample::new(frame.received_at, frame.value(*key)));
        }

        self.frames += 1;
        self.last_device = Some(frame.device_address.clone());

        let update = BufferUpdate {
            seq: self.frames,
            device_address: frame.device_address.clone(),
            received_at: frame.received_at,
        };
        if self.updates.send(update).is_err() {
            debug!(seq = self.frames, "No buffer subscribers");
        }

        self.frames
    }

    pub fn channel(&self, key: ChannelKey) -> Option<&ChannelBuffer> {
        self.channels.get(&key)
    }

    /// 所有通道都为空
    pub fn is_empty(&self) -> bool {
        self.channels.values().all(ChannelBuffer::is_empty)
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// 已写入的帧数
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// 已丢弃的帧数
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    pub fn last_device(&self) -> Option<&str> {
        self.last_device.as_deref()
    }

    /// 清空所有通道并重置计数（切换设备时使用），之后的帧序号从 1 开始
    pub fn clear(&mut self) {
        for buffer in self.channels.values_mut() {
            buffer.clear();
        }
        self.frames = 0;
        self.dropped = 0;
        self.last_device = None;
    }
}

#[async_trait]
impl MessageSink for RwLock<SampleBuffer> {
    async fn on_message(&self, text: &str) {
        self.write().await.on_frame(text);
    }

    fn name(&self) -> &str {
        "sample-buffer"
    }
}
