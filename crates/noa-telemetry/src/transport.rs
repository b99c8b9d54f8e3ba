use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info};
use url::Url;

use crate::{Result, TelemetryError};

/// 收到的消息
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    Text(String),
    Ping,
    Pong,
}

/// 一条已建立的推送会话
///
/// `recv` 返回 `None` 表示对端已关闭。
#[async_trait]
pub trait Session: Send {
    async fn recv(&mut self) -> Option<Result<Inbound>>;

    async fn ping(&mut self) -> Result<()>;

    async fn close(&mut self) -> Result<()>;
}

/// 会话工厂
#[async_trait]
pub trait Transport: Send + Sync {
    async fn connect(&self, url: &Url) -> Result<Box<dyn Session>>;
}

/// 基于 tokio-tungstenite 的 WebSocket 传输
#[derive(Debug, Clone, Default)]
pub struct WsTransport;

impl WsTransport {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Transport for WsTransport {
    async fn connect(&self, url: &Url) -> Result<Box<dyn Session>> {
        info!("Connecting to {}", url);

        let (stream, response) = connect_async(url.as_str())
            .await
            .map_err(|e| TelemetryError::transport(format!("connect {}: {}", url, e)))?;

        debug!(status = %response.status(), "WebSocket handshake completed");
        Ok(Box::new(WsSession { stream }))
    }
}

struct WsSession {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

#[async_trait]
impl Session for WsSession {
    async fn recv(&mut self) -> Option<Result<Inbound>> {
        loop {
            let message = match self.stream.next().await? {
                Ok(message) => message,
                Err(e) => return Some(Err(TelemetryError::transport(e.to_string()))),
            };

            let inbound = match message {
                Message::Text(text) => Inbound::Text(text),
                // 部分网关用二进制帧发送 JSON
                Message::Binary(bytes) => match String::from_utf8(bytes) {
                    Ok(text) => Inbound::Text(text),
                    Err(_) => {
                        debug!("Ignoring non-UTF-8 binary frame");
                        continue;
                    }
                },
                Message::Ping(_) => Inbound::Ping,
                Message::Pong(_) => Inbound::Pong,
                Message::Close(frame) => {
                    debug!(?frame, "Peer closed the socket");
                    return None;
                }
                Message::Frame(_) => continue,
            };

            return Some(Ok(inbound));
        }
    }

    async fn ping(&mut self) -> Result<()> {
        self.stream
            .send(Message::Ping(Vec::new()))
            .await
            .map_err(|e| TelemetryError::transport(e.to_string()))
    }

    async fn close(&mut self) -> Result<()> {
        self.stream
            .close(None)
            .await
            .map_err(|e| TelemetryError::transport(e.to_string()))
    }
}
