use std::sync::Arc;
use tracing::{debug, warn};

use crate::connection::{Connection, ConnectionOptions, ConnectionState};
use crate::endpoint::Endpoint;
use crate::sink::MessageSink;
use crate::transport::Transport;
use crate::{Result, TelemetryError};

/// 屏幕级连接作用域
///
/// 每个监控屏幕持有一个作用域，同一时刻最多一条连接。获得焦点时打开，
/// 失去焦点或作用域释放时关闭。切换端点时先等旧会话关闭再打开新连接；
/// 直接释放作用域只发出关闭指令，不等待。
pub struct ConnectionScope {
    transport: Arc<dyn Transport>,
    base_url: String,
    options: ConnectionOptions,
    current: Option<Connection>,
}

impl ConnectionScope {
    pub fn new(
        transport: Arc<dyn Transport>,
        base_url: impl Into<String>,
        options: ConnectionOptions,
    ) -> Self {
        Self {
            transport,
            base_url: base_url.into(),
            options,
            current: None,
        }
    }

    /// 屏幕获得焦点
    ///
    /// 端点相同则复用现有连接（已掉线时触发刷新）；端点不同则等旧会话关闭后
    /// 再打开新连接。ID 缺失时什么都不做，返回 `Ok(None)`。
    ///
    /// 复用时保留原来的消息处理器，`sink` 只在新建连接时使用。
    pub async fn focus_gained(
        &mut self,
        endpoint: Endpoint,
        sink: Arc<dyn MessageSink>,
    ) -> Result<Option<&Connection>> {
        let reusable = self
            .current
            .as_ref()
            .is_some_and(|c| !c.is_closed() && *c.endpoint() == endpoint);

        if reusable {
            if let Some(connection) = self.current.as_ref() {
                if connection.state() == ConnectionState::Disconnected {
                    debug!(endpoint = %endpoint, "Reused connection is offline, refreshing");
                    connection.refresh();
                }
            }
            return Ok(self.current.as_ref());
        }

        if let Err(e) = endpoint.url(&self.base_url) {
            return match e {
                TelemetryError::MissingId(field) => {
                    warn!(endpoint = %endpoint, "Not opening connection, missing {}", field);
                    Ok(None)
                }
                other => Err(other),
            };
        }

        self.focus_lost().await;

        let connection = Connection::open(
            endpoint,
            &self.base_url,
            self.transport.clone(),
            sink,
            self.options.clone(),
        )?;
        Ok(Some(self.current.insert(connection)))
    }

    /// 屏幕失去焦点，返回时旧会话已关闭
    pub async fn focus_lost(&mut self) {
        if let Some(mut connection) = self.current.take() {
            connection.wait_closed().await;
        }
    }

    /// 手动刷新当前连接
    pub fn refresh(&self) {
        if let Some(connection) = &self.current {
            connection.refresh();
        }
    }

    pub fn current(&self) -> Option<&Connection> {
        self.current.as_ref()
    }
}

impl Drop for ConnectionScope {
    fn drop(&mut self) {
        if let Some(connection) = self.current.take() {
            connection.close();
        }
    }
}
