use anyhow::{anyhow, bail, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use noa_api::{ApiClient, Session};
use noa_config::{ClientConfig, ConfigLoader};
use noa_device::{DeviceCache, LocalStore};
use noa_types::Quantity;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

mod logging;
mod watch;

#[derive(Parser, Debug)]
#[command(name = "noa-monitor", author, version, about)]
struct Args {
    /// 配置目录（读取其中的 client.toml）
    #[arg(short, long, default_value = "./config")]
    config_dir: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// 登录并保存令牌
    Login {
        email: String,

        #[arg(long, env = "NOA_PASSWORD", hide_env_values = true)]
        password: String,

        /// 记住邮箱
        #[arg(long)]
        remember: bool,
    },

    /// 清除令牌
    Logout {
        /// 同时清除设备缓存和记住的邮箱
        #[arg(long)]
        all: bool,
    },

    /// 设备管理
    Devices {
        #[command(subcommand)]
        command: DeviceCommand,
    },

    /// 实时监控一个设备
    Watch {
        #[arg(long)]
        device: String,

        #[arg(long, default_value = "acceleration")]
        quantity: Quantity,

        /// 表格行数，默认取配置中的 buffer.table_rows
        #[arg(long)]
        rows: Option<usize>,
    },

    /// 订阅预测历史
    History,

    /// 订阅通知
    Notifications,
}

#[derive(Subcommand, Debug)]
enum DeviceCommand {
    List {
        /// 只显示收藏的设备
        #[arg(long)]
        bookmarked: bool,

        /// 先从后端同步
        #[arg(long)]
        sync: bool,
    },
    Add {
        id: String,
        name: String,

        /// 同时在后端登记
        #[arg(long)]
        remote: bool,
    },
    Bookmark {
        id: String,
    },
    Delete {
        id: String,
    },
}

/// 命令执行上下文
pub(crate) struct App {
    pub config: ClientConfig,
    pub store: LocalStore,
    pub api: ApiClient,
}

impl App {
    async fn new(config: ClientConfig) -> Result<Self> {
        let store = LocalStore::open(config.storage.state_path()).await?;
        let api = ApiClient::new(&config.api)?;
        Ok(Self { config, store, api })
    }

    /// 当前登录会话
    pub async fn session(&self) -> Result<Session> {
        let token = self
            .store
            .token()
            .await
            .ok_or_else(|| anyhow!("Not logged in, run `noa-monitor login` first"))?;
        let session = Session::from_token(token)?;
        if session.is_expired(Utc::now()) {
            bail!("Session expired, please log in again");
        }
        Ok(session)
    }

    /// 设备缓存，已登录时启用后端同步
    pub async fn cache(&self) -> DeviceCache {
        let cache = DeviceCache::new(self.store.clone());
        match self.session().await {
            Ok(session) => cache.with_backend(Arc::new(self.api.clone()), session.user_id),
            Err(_) => cache,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = ConfigLoader::new(&args.config_dir).load_validated()?;
    logging::init(&config.logging);
    info!("Using config directory {:?}", args.config_dir);

    let app = App::new(config).await?;

    match args.command {
        Command::Login {
            email,
            password,
            remember,
        } => login(&app, &email, &password, remember).await,
        Command::Logout { all } => logout(&app, all).await,
        Command::Devices { command } => devices(&app, command).await,
        Command::Watch {
            device,
            quantity,
            rows,
        } => watch::live(&app, &device, quantity, rows).await,
        Command::History => watch::history(&app).await,
        Command::Notifications => watch::notifications(&app).await,
    }
}

async fn login(app: &App, email: &str, password: &str, remember: bool) -> Result<()> {
    let session = app
        .api
        .login(email, password)
        .await
        .map_err(|e| anyhow!(e.user_message()))?;

    app.store.save_token(&session.token).await?;
    if remember {
        app.store.remember_email(email.trim()).await?;
    }

    println!("Logged in as {}", session.user_id);
    Ok(())
}

async fn logout(app: &App, all: bool) -> Result<()> {
    if all {
        app.store.clear_all().await?;
    } else {
        app.store.clear_token().await?;
    }
    println!("Logged out");
    Ok(())
}

async fn devices(app: &App, command: DeviceCommand) -> Result<()> {
    let cache = app.cache().await;

    match command {
        DeviceCommand::List { bookmarked, sync } => {
            if sync {
                match cache.sync().await {
                    Ok(added) => info!("{} devices added from backend", added),
                    Err(e) => warn!("Device sync failed: {}", e),
                }
            }

            let devices = if bookmarked {
                cache.bookmarked().await
            } else {
                cache.list().await
            };
            if devices.is_empty() {
                println!("No devices");
            }
            for device in devices {
                println!(
                    "{} {:<24} {:<12} used {:>3}x  registered {}  last seen {}",
                    if device.bookmarked { "*" } else { " " },
                    device.name,
                    device.id,
                    device.usage,
                    device.display_start_date(),
                    device.display_current_date(),
                );
            }
        }
        DeviceCommand::Add { id, name, remote } => {
            if remote {
                app.api
                    .register_device(&id)
                    .await
                    .map_err(|e| anyhow!(e.user_message()))?;
            }
            let device = cache.create(&id, &name).await?;
            println!("Added {} ({})", device.name, device.id);
        }
        DeviceCommand::Bookmark { id } => {
            let bookmarked = cache.toggle_bookmark(&id).await?;
            println!(
                "{} {}",
                id,
                if bookmarked { "bookmarked" } else { "removed from bookmarks" }
            );
        }
        DeviceCommand::Delete { id } => {
            let device = cache.delete(&id).await?;
            println!("Deleted {} ({})", device.name, device.id);
        }
    }

    Ok(())
}
