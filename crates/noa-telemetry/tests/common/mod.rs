#![allow(dead_code)]

use async_trait::async_trait;
use noa_telemetry::{Inbound, MessageSink, Result, Session, TelemetryError, Transport};
use serde_json::json;
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use url::Url;

/// 测试用的对端：可以推送消息、断开，并记录心跳和关闭
#[derive(Clone)]
pub struct Peer {
    pub url: Url,
    tx: Arc<Mutex<Option<mpsc::UnboundedSender<Inbound>>>>,
    closed: Arc<AtomicBool>,
    pings: Arc<AtomicUsize>,
}

impl Peer {
    pub fn send(&self, text: impl Into<String>) {
        if let Some(tx) = self.tx.lock().unwrap().as_ref() {
            let _ = tx.send(Inbound::Text(text.into()));
        }
    }

    /// 对端主动断开
    pub fn hang_up(&self) {
        self.tx.lock().unwrap().take();
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn pings(&self) -> usize {
        self.pings.load(Ordering::SeqCst)
    }
}

struct MockSession {
    rx: mpsc::UnboundedReceiver<Inbound>,
    closed: Arc<AtomicBool>,
    pings: Arc<AtomicUsize>,
}

#[async_trait]
impl Session for MockSession {
    async fn recv(&mut self) -> Option<Result<Inbound>> {
        self.rx.recv().await.map(Ok)
    }

    async fn ping(&mut self) -> Result<()> {
        self.pings.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

// 任务被终止时会话随之释放，视同关闭
impl Drop for MockSession {
    fn drop(&mut self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

/// 处理每条消息前先等待一段时间的处理器
pub struct SlowSink {
    delay: Duration,
    started: AtomicUsize,
    handled: AtomicUsize,
}

impl SlowSink {
    pub fn new(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            delay,
            started: AtomicUsize::new(0),
            handled: AtomicUsize::new(0),
        })
    }

    pub fn started(&self) -> usize {
        self.started.load(Ordering::SeqCst)
    }

    pub fn handled(&self) -> usize {
        self.handled.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MessageSink for SlowSink {
    async fn on_message(&self, _text: &str) {
        self.started.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        self.handled.fetch_add(1, Ordering::SeqCst);
    }

    fn name(&self) -> &str {
        "slow-sink"
    }
}

/// 内存传输，每次连接生成一个 [`Peer`]
#[derive(Default)]
pub struct MockTransport {
    fail: AtomicBool,
    attempts: AtomicUsize,
    peers: Mutex<Vec<Peer>>,
}

impl MockTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing() -> Arc<Self> {
        let transport = Self::new();
        transport.set_failing(true);
        transport
    }

    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    /// 连接调用次数（包括失败的）
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    pub fn peers(&self) -> Vec<Peer> {
        self.peers.lock().unwrap().clone()
    }

    pub fn peer(&self, index: usize) -> Peer {
        self.peers.lock().unwrap()[index].clone()
    }

    /// 当前未关闭的会话数
    pub fn open_sessions(&self) -> usize {
        self.peers.lock().unwrap().iter().filter(|p| !p.is_closed()).count()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn connect(&self, url: &Url) -> Result<Box<dyn Session>> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(TelemetryError::transport("connection refused"));
        }

        let (tx, rx) = mpsc::unbounded_channel();
        let closed = Arc::new(AtomicBool::new(false));
        let pings = Arc::new(AtomicUsize::new(0));

        self.peers.lock().unwrap().push(Peer {
            url: url.clone(),
            tx: Arc::new(Mutex::new(Some(tx))),
            closed: closed.clone(),
            pings: pings.clone(),
        });

        Ok(Box::new(MockSession { rx, closed, pings }))
    }
}

/// 轮询直到条件成立，超时则失败
pub async fn eventually<F>(mut condition: F)
where
    F: FnMut() -> bool,
{
    for _ in 0..500 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not reached in time");
}

/// 带超时等待一个 future
pub async fn within<T>(future: impl Future<Output = T>) -> T {
    tokio::time::timeout(Duration::from_secs(600), future)
        .await
        .expect("timed out")
}

/// 一帧遥测消息，所有轴的 Acceleration 都为 `acceleration`
pub fn frame(acceleration: f64) -> String {
    let axis = json!({
        "Acceleration": acceleration,
        "VelocityAngular": 0.0,
        "VibrationSpeed": 1.25,
        "VibrationAngle": -2.0,
        "VibrationDisplacement": 3.0,
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
            "Temperature": 31.5
        }
    })
    .to_string()
}
