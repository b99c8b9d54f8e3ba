use anyhow::{bail, Result};
use noa_device::DeviceError;
use noa_telemetry::{
    ConnectionKey, ConnectionOptions, ConnectionScope, ConnectionState, ConnectionStatus,
    Endpoint, HistoryFeed, NotificationFeed, SampleBuffer, TableView, TemperatureView, WsTransport,
};
use noa_types::{format_reading, Quantity};
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{watch, RwLock};
use tracing::{info, warn};

use crate::App;

fn scope(app: &App) -> ConnectionScope {
    ConnectionScope::new(
        Arc::new(WsTransport::new()),
        app.config.websocket.base_url.clone(),
        ConnectionOptions::from(&app.config.websocket),
    )
}

/// 实时监控一个设备，Ctrl-C 退出
pub async fn live(app: &App, device_id: &str, quantity: Quantity, rows: Option<usize>) -> Result<()> {
    let session = app.session().await?;

    let cache = app.cache().await;
    match cache.record_usage(device_id).await {
        Ok(_) => {}
        Err(e @ DeviceError::NotFound(_)) => warn!("{}", e),
        Err(e) => return Err(e.into()),
    }

    let buffer = SampleBuffer::shared(app.config.buffer.capacity)?;
    let mut updates = buffer.read().await.subscribe();

    let table = TableView::new(quantity, rows.unwrap_or(app.config.buffer.table_rows));
    let temperature = TemperatureView::new(app.config.buffer.temperature_rows);

    let mut scope = scope(app);
    let endpoint = Endpoint::broadcast(&ConnectionKey::new(session.user_id, device_id));
    let Some(connection) = scope.focus_gained(endpoint, buffer.clone()).await? else {
        bail!("Cannot open a connection without user and device IDs");
    };
    let mut status = connection.subscribe_status();
    info!("Watching {} on {}", quantity.title(), connection.url());

    println!("{} {}", quantity.title(), quantity.unit());
    println!("{:<12} {:>10} {:>10} {:>10} {:>10}", "time", "x", "y", "z", "temp");

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            result = &mut ctrl_c => {
                result?;
                info!("Interrupted, closing connection");
                break;
            }
            update = updates.recv() => match update {
                Ok(_) => {
                    let buffer = buffer.read().await;
                    let Some(row) = table.rows(&buffer).into_ready().and_then(|r| r.into_iter().next()) else {
                        continue;
                    };
                    let temp = temperature
                        .table(&buffer)
                        .ready()
                        .map(|t| format_reading(t.current))
                        .unwrap_or_else(|| "-".to_string());
                    let [x, y, z] = row.display();
                    println!(
                        "{:<12} {:>10} {:>10} {:>10} {:>10}",
                        row.timestamp.format("%H:%M:%S%.3f"),
                        x, y, z, temp
                    );
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!("Display lagging, skipped {} frames", skipped);
                }
                Err(RecvError::Closed) => break,
            },
            changed = status.changed() => {
                if changed.is_err() {
                    break;
                }
                report(&status.borrow_and_update());
            }
        }
    }

    scope.focus_lost().await;
    Ok(())
}

/// 订阅预测历史，Ctrl-C 退出
pub async fn history(app: &App) -> Result<()> {
    let session = app.session().await?;
    let feed = Arc::new(RwLock::new(HistoryFeed::new(app.config.buffer.feed_capacity)?));

    let mut scope = scope(app);
    let Some(connection) = scope.focus_gained(Endpoint::history(session.user_id), feed.clone()).await? else {
        bail!("Cannot open a connection without a user ID");
    };
    let status = connection.subscribe_status();

    follow(status, || {
        let feed = feed.clone();
        async move {
            let mut feed = feed.write().await;
            // 最新的在前，按时间顺序打印
            for item in feed.items().collect::<Vec<_>>().into_iter().rev() {
                println!(
                    "{}  {:<6?} {:<10} {:<8?} {:.2}",
                    item.time.format("%Y-%m-%d %H:%M:%S"),
                    item.kind,
                    item.device_id,
                    item.prediction_class,
                    item.probability
                );
            }
            feed.clear();
        }
    })
    .await?;

    scope.focus_lost().await;
    Ok(())
}

/// 订阅通知，Ctrl-C 退出
pub async fn notifications(app: &App) -> Result<()> {
    let session = app.session().await?;
    let feed = Arc::new(RwLock::new(NotificationFeed::new(app.config.buffer.feed_capacity)?));

    let mut scope = scope(app);
    let Some(connection) = scope.focus_gained(Endpoint::notification(session.user_id), feed.clone()).await? else {
        bail!("Cannot open a connection without a user ID");
    };
    let status = connection.subscribe_status();

    follow(status, || {
        let feed = feed.clone();
        async move {
            let mut feed = feed.write().await;
            if feed.unread_count() == 0 {
                return;
            }
            let unread: Vec<_> = feed.items().filter(|item| !item.read).cloned().collect();
            for item in unread.into_iter().rev() {
                println!(
                    "{}  [{:?}] {}: {} {}",
                    item.time.format("%Y-%m-%d %H:%M:%S"),
                    item.kind,
                    item.title,
                    item.message,
                    item.details
                );
            }
            feed.mark_all_read();
        }
    })
    .await?;

    scope.focus_lost().await;
    Ok(())
}

/// 每收到新消息执行一次 `on_frames`，直到 Ctrl-C
async fn follow<F, Fut>(mut status: watch::Receiver<ConnectionStatus>, mut on_frames: F) -> Result<()>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = ()>,
{
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut frames = 0;

    loop {
        tokio::select! {
            result = &mut ctrl_c => {
                result?;
                info!("Interrupted, closing connection");
                return Ok(());
            }
            changed = status.changed() => {
                if changed.is_err() {
                    return Ok(());
                }
                let current = status.borrow_and_update().clone();
                report(&current);
                if current.frames > frames {
                    frames = current.frames;
                    on_frames().await;
                }
            }
        }
    }
}

fn report(status: &ConnectionStatus) {
    match status.state {
        ConnectionState::Receiving => {}
        ConnectionState::Reconnecting { attempt } => {
            warn!(attempt, "Connection lost, reconnecting");
        }
        ConnectionState::Disconnected if status.offline => {
            warn!(
                "Offline: {}. Restart the command to retry",
                status.last_error.as_deref().unwrap_or("connection failed")
            );
        }
        state => info!("Connection {:?}", state),
    }
}
