use noa_config::{ReconnectConfig, WebSocketConfig};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, sleep, timeout, Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};
use url::Url;

use crate::endpoint::Endpoint;
use crate::sink::MessageSink;
use crate::transport::{Inbound, Session, Transport};
use crate::{Result, TelemetryError};

/// 连接状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    /// 已收到数据
    Receiving,
    /// 等待第 `attempt` 次重连
    Reconnecting { attempt: u32 },
    /// 已关闭（终态）
    Closed,
}

/// 对外发布的连接状态
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConnectionStatus {
    pub state: ConnectionState,
    /// 最近一次连接失败后为 true，重新连上后清除
    pub offline: bool,
    pub last_error: Option<String>,
    /// 已投递给处理器的消息数
    pub frames: u64,
}

impl Default for ConnectionStatus {
    fn default() -> Self {
        Self {
            state: ConnectionState::Disconnected,
            offline: false,
            last_error: None,
            frames: 0,
        }
    }
}

/// 连接参数
#[derive(Debug, Clone)]
pub struct ConnectionOptions {
    pub heartbeat_interval: Duration,
    pub heartbeat_timeout: Duration,
    pub reconnect: ReconnectConfig,
}

impl From<&WebSocketConfig> for ConnectionOptions {
    fn from(config: &WebSocketConfig) -> Self {
        Self {
            heartbeat_interval: config.heartbeat_interval(),
            heartbeat_timeout: config.heartbeat_timeout(),
            reconnect: config.reconnect.clone(),
        }
    }
}

impl Default for ConnectionOptions {
    fn default() -> Self {
        Self::from(&WebSocketConfig::default())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Control {
    Refresh,
    Close,
}

/// 一条推送连接
///
/// 后台任务负责建立会话、心跳检测和指数退避重连，收到的文本消息
/// 按顺序交给 [`MessageSink`]。`Drop` 时自动关闭。
pub struct Connection {
    endpoint: Endpoint,
    url: Url,
    status: Arc<watch::Sender<ConnectionStatus>>,
    control: mpsc::UnboundedSender<Control>,
    task: Option<JoinHandle<()>>,
}

impl Connection {
    /// 关闭时等待后台任务退出的上限
    pub const CLOSE_TIMEOUT: Duration = Duration::from_secs(5);

    /// 打开连接
    ///
    /// 地址无法构造时（例如 ID 为空）直接返回错误，不会启动任何任务。
    pub fn open(
        endpoint: Endpoint,
        base_url: &str,
        transport: Arc<dyn Transport>,
        sink: Arc<dyn MessageSink>,
        options: ConnectionOptions,
    ) -> Result<Self> {
        let url = endpoint.url(base_url)?;

        let (status, _) = watch::channel(ConnectionStatus {
            state: ConnectionState::Connecting,
            ..ConnectionStatus::default()
        });
        let status = Arc::new(status);
        let (control, control_rx) = mpsc::unbounded_channel();

        info!(endpoint = %endpoint, sink = sink.name(), "Opening connection");

        let supervisor = Supervisor {
            endpoint: endpoint.clone(),
            url: url.clone(),
            transport,
            sink,
            options,
            status: status.clone(),
            control: control_rx,
        };
        let task = tokio::spawn(supervisor.run());

        Ok(Self {
            endpoint,
            url,
            status,
            control,
            task: Some(task),
        })
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn status(&self) -> ConnectionStatus {
        self.status.borrow().clone()
    }

    pub fn state(&self) -> ConnectionState {
        self.status.borrow().state
    }

    /// 订阅状态变化
    pub fn subscribe_status(&self) -> watch::Receiver<ConnectionStatus> {
        self.status.subscribe()
    }

    /// 立即重连并重置重连计数
    pub fn refresh(&self) {
        if self.control.send(Control::Refresh).is_err() {
            debug!(endpoint = %self.endpoint, "Refresh ignored, connection already closed");
        }
    }

    /// 关闭连接，重复调用无副作用
    pub fn close(&self) {
        if self.is_closed() {
            return;
        }

        // 只发一次，后台任务收到后关闭会话并退出
        let _ = self.control.send(Control::Close);
        self.status.send_modify(|status| status.state = ConnectionState::Closed);
        info!(endpoint = %self.endpoint, "Connection closed");
    }

    pub fn is_closed(&self) -> bool {
        self.status.borrow().state == ConnectionState::Closed
    }

    /// 关闭并等待后台任务退出
    ///
    /// 返回时旧会话一定已关闭：任务在 [`Connection::CLOSE_TIMEOUT`] 内
    /// 没有退出则强制终止，会话随任务一起释放。
    pub async fn wait_closed(&mut self) {
        self.close();
        let Some(mut task) = self.task.take() else {
            return;
        };

        match timeout(Self::CLOSE_TIMEOUT, &mut task).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(endpoint = %self.endpoint, "Connection task failed: {}", e),
            Err(_) => {
                warn!(
                    endpoint = %self.endpoint,
                    "Connection task still busy after {:?}, aborting",
                    Self::CLOSE_TIMEOUT
                );
                task.abort();
                if let Err(e) = task.await {
                    debug!(endpoint = %self.endpoint, "Connection task aborted: {}", e);
                }
            }
        }
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("endpoint", &self.endpoint)
            .field("url", &self.url.as_str())
            .field("status", &*self.status.borrow())
            .finish()
    }
}

/// 会话结束原因
enum SessionEnd {
    Shutdown,
    Refresh,
    Failed(String),
}

/// 等待期间收到的指令
enum Wake {
    Retry,
    Refresh,
    Shutdown,
}

struct Supervisor {
    endpoint: Endpoint,
    url: Url,
    transport: Arc<dyn Transport>,
    sink: Arc<dyn MessageSink>,
    options: ConnectionOptions,
    status: Arc<watch::Sender<ConnectionStatus>>,
    control: mpsc::UnboundedReceiver<Control>,
}

impl Supervisor {
    async fn run(mut self) {
        let mut attempt: u32 = 0;

        loop {
            self.publish(|status| status.state = ConnectionState::Connecting);

            let pending = connect(self.transport.as_ref(), &self.url, self.options.heartbeat_timeout);
            let connected = tokio::select! {
                biased;

                control = self.control.recv() => match control {
                    Some(Control::Refresh) => {
                        attempt = 0;
                        continue;
                    }
                    Some(Control::Close) | None => break,
                },
                result = pending => result,
            };

            let end = match connected {
                Ok(session) => {
                    info!(endpoint = %self.endpoint, "Connected");
                    self.publish(|status| {
                        status.state = ConnectionState::Connected;
                        status.offline = false;
                        status.last_error = None;
                    });
                    self.drive(session, &mut attempt).await
                }
                Err(e) => SessionEnd::Failed(e.to_string()),
            };

            let reason = match end {
                SessionEnd::Shutdown => break,
                SessionEnd::Refresh => {
                    info!(endpoint = %self.endpoint, "Refreshing connection");
                    attempt = 0;
                    continue;
                }
                SessionEnd::Failed(reason) => reason,
            };

            warn!(endpoint = %self.endpoint, "Connection lost: {}", reason);
            self.publish(|status| {
                status.offline = true;
                status.last_error = Some(reason);
            });

            attempt += 1;
            let reconnect = self.options.reconnect.clone();
            if !reconnect.enabled || attempt > reconnect.max_attempts {
                if reconnect.enabled {
                    error!(
                        endpoint = %self.endpoint,
                        "Exceeded max reconnect attempts ({})",
                        reconnect.max_attempts
                    );
                }
                self.publish(|status| status.state = ConnectionState::Disconnected);

                match self.wait(None).await {
                    Wake::Shutdown => break,
                    Wake::Refresh | Wake::Retry => {
                        attempt = 0;
                        continue;
                    }
                }
            }

            let delay = reconnect.delay_for(attempt);
            info!(
                endpoint = %self.endpoint,
                "Reconnecting in {:?} (attempt {}/{})",
                delay,
                attempt,
                reconnect.max_attempts
            );
            self.publish(|status| status.state = ConnectionState::Reconnecting { attempt });

            match self.wait(Some(delay)).await {
                Wake::Shutdown => break,
                Wake::Refresh => attempt = 0,
                Wake::Retry => {}
            }
        }

        debug!(endpoint = %self.endpoint, "Connection supervisor stopped");
    }

    /// 驱动一个会话直到它结束
    async fn drive(&mut self, mut session: Box<dyn Session>, attempt: &mut u32) -> SessionEnd {
        let interval = self.options.heartbeat_interval;
        let mut heartbeat = interval_at(Instant::now() + interval, interval);
        heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut last_activity = Instant::now();

        let end = loop {
            tokio::select! {
                biased;

                control = self.control.recv() => match control {
                    Some(Control::Refresh) => break SessionEnd::Refresh,
                    Some(Control::Close) | None => break SessionEnd::Shutdown,
                },

                inbound = session.recv() => match inbound {
                    Some(Ok(Inbound::Text(text))) => {
                        last_activity = Instant::now();
                        *attempt = 0;
                        self.sink.on_message(&text).await;
                        self.publish(|status| {
                            status.state = ConnectionState::Receiving;
                            status.frames += 1;
                        });
                    }
                    Some(Ok(Inbound::Ping | Inbound::Pong)) => {
                        last_activity = Instant::now();
                    }
                    Some(Err(e)) => break SessionEnd::Failed(e.to_string()),
                    None => break SessionEnd::Failed("closed by peer".to_string()),
                },

                _ = heartbeat.tick() => {
                    let idle = last_activity.elapsed();
                    if idle >= self.options.heartbeat_timeout {
                        break SessionEnd::Failed(format!("no data for {:?}", idle));
                    }
                    if let Err(e) = session.ping().await {
                        break SessionEnd::Failed(e.to_string());
                    }
                }
            }
        };

        if let Err(e) = session.close().await {
            debug!(endpoint = %self.endpoint, "Error closing session: {}", e);
        }

        end
    }

    /// 等待指令，`delay` 为 `None` 时一直等到刷新或关闭
    async fn wait(&mut self, delay: Option<Duration>) -> Wake {
        let sleeper = async {
            match delay {
                Some(delay) => sleep(delay).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            control = self.control.recv() => match control {
                Some(Control::Refresh) => Wake::Refresh,
                Some(Control::Close) | None => Wake::Shutdown,
            },
            _ = sleeper => Wake::Retry,
        }
    }

    /// 更新状态；连接已关闭时不再覆盖
    fn publish(&self, update: impl FnOnce(&mut ConnectionStatus)) {
        self.status.send_if_modified(|status| {
            if status.state == ConnectionState::Closed {
                return false;
            }
            update(status);
            true
        });
    }
}

/// 建立会话，超过 `limit` 视为失败
async fn connect(transport: &dyn Transport, url: &Url, limit: Duration) -> Result<Box<dyn Session>> {
    match timeout(limit, transport.connect(url)).await {
        Ok(result) => result,
        Err(_) => Err(TelemetryError::transport(format!(
            "connect timed out after {:?}",
            limit
        ))),
    }
}
