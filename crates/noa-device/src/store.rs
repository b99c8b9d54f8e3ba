use noa_types::Device;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::sync::{RwLock, RwLockReadGuard};
use tracing::{debug, info};

use crate::Result;

/// 持久化的本地状态
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalState {
    #[serde(default)]
    pub devices: Vec<Device>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remembered_email: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

/// 本地状态存储
///
/// 整个状态保存为一个 JSON 检查点文件，每次修改后整体写回。
#[derive(Clone)]
pub struct LocalStore {
    state: Arc<RwLock<LocalState>>,
    checkpoint_path: PathBuf,
}

impl LocalStore {
    /// 打开存储，文件不存在时从空状态开始
    pub async fn open(checkpoint_path: impl AsRef<Path>) -> Result<Self> {
        let checkpoint_path = checkpoint_path.as_ref().to_path_buf();

        let state = if fs::try_exists(&checkpoint_path).await? {
            let json = fs::read_to_string(&checkpoint_path).await?;
            let state: LocalState = serde_json::from_str(&json)?;
            info!(
                "Local state loaded from {:?} ({} devices)",
                checkpoint_path,
                state.devices.len()
            );
            state
        } else {
            debug!("No local state at {:?}, starting empty", checkpoint_path);
            LocalState::default()
        };

        Ok(Self {
            state: Arc::new(RwLock::new(state)),
            checkpoint_path,
        })
    }

    pub fn path(&self) -> &Path {
        &self.checkpoint_path
    }

    /// 获取状态的只读引用
    pub async fn get(&self) -> RwLockReadGuard<'_, LocalState> {
        self.state.read().await
    }

    /// 修改状态并写回文件
    pub async fn update<F, R>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&mut LocalState) -> Result<R>,
    {
        let mut state = self.state.write().await;
        let mut draft = state.clone();
        let output = f(&mut draft)?;

        self.write_checkpoint(&draft).await?;
        *state = draft;
        Ok(output)
    }

    async fn write_checkpoint(&self, state: &LocalState) -> Result<()> {
        let json = serde_json::to_string_pretty(state)?;

        if let Some(parent) = self.checkpoint_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }

        // 先写临时文件再重命名
        let temp_path = self.checkpoint_path.with_extension("tmp");
        fs::write(&temp_path, json).await?;
        fs::rename(&temp_path, &self.checkpoint_path).await?;

        debug!("Local state saved to {:?}", self.checkpoint_path);
        Ok(())
    }

    pub async fn save_token(&self, token: impl Into<String>) -> Result<()> {
        let token = token.into();
        self.update(|state| {
            state.token = Some(token);
            Ok(())
        })
        .await
    }

    pub async fn token(&self) -> Option<String> {
        self.state.read().await.token.clone()
    }

    pub async fn clear_token(&self) -> Result<()> {
        self.update(|state| {
            state.token = None;
            Ok(())
        })
        .await
    }

    pub async fn remember_email(&self, email: impl Into<String>) -> Result<()> {
        let email = email.into();
        self.update(|state| {
            state.remembered_email = Some(email);
            Ok(())
        })
        .await
    }

    pub async fn remembered_email(&self) -> Option<String> {
        self.state.read().await.remembered_email.clone()
    }

    pub async fn forget_email(&self) -> Result<()> {
        self.update(|state| {
            state.remembered_email = None;
            Ok(())
        })
        .await
    }

    /// 清空所有本地数据并删除文件
    pub async fn clear_all(&self) -> Result<()> {
        let mut state = self.state.write().await;
        *state = LocalState::default();

        if fs::try_exists(&self.checkpoint_path).await? {
            fs::remove_file(&self.checkpoint_path).await?;
            info!("Local state deleted: {:?}", self.checkpoint_path);
        }
        Ok(())
    }
}
