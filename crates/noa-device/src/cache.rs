use async_trait::async_trait;
use noa_types::Device;
use std::sync::Arc;
use tracing::{info, warn};

use crate::store::LocalStore;
use crate::{DeviceError, Result};

/// 设备后端（用于同步收藏和删除）
#[async_trait]
pub trait DeviceBackend: Send + Sync {
    /// 用户在后端登记的设备
    async fn devices(&self, user_id: &str) -> anyhow::Result<Vec<Device>>;

    async fn set_bookmark(&self, user_id: &str, device_id: &str, bookmark: bool) -> anyhow::Result<()>;

    async fn remove_device(&self, user_id: &str, device_id: &str) -> anyhow::Result<()>;
}

/// 本地设备缓存
///
/// 所有修改先落到本地；配置了后端时再镜像过去，镜像失败只记录日志，
/// 不回滚本地修改。
#[derive(Clone)]
pub struct DeviceCache {
    store: LocalStore,
    backend: Option<(Arc<dyn DeviceBackend>, String)>,
}

impl DeviceCache {
    pub fn new(store: LocalStore) -> Self {
        Self {
            store,
            backend: None,
        }
    }

    /// 为指定用户启用后端同步
    pub fn with_backend(mut self, backend: Arc<dyn DeviceBackend>, user_id: impl Into<String>) -> Self {
        self.backend = Some((backend, user_id.into()));
        self
    }

    pub fn store(&self) -> &LocalStore {
        &self.store
    }

    /// 添加设备
    pub async fn create(&self, id: &str, name: &str) -> Result<Device> {
        let id = id.trim();
        let name = name.trim();
        if id.is_empty() {
            return Err(DeviceError::validation("Device id is required"));
        }
        if name.is_empty() {
            return Err(DeviceError::validation("Device name is required"));
        }

        let device = self
            .store
            .update(|state| {
                if state.devices.iter().any(|d| d.id == id) {
                    return Err(DeviceError::AlreadyExists(id.to_string()));
                }
                let device = Device::new(id, name);
                state.devices.push(device.clone());
                Ok(device)
            })
            .await?;

        info!("Device cached: {} ({})", device.name, device.id);
        Ok(device)
    }

    pub async fn list(&self) -> Vec<Device> {
        self.store.get().await.devices.clone()
    }

    pub async fn get(&self, id: &str) -> Result<Device> {
        self.store
            .get()
            .await
            .devices
            .iter()
            .find(|d| d.id == id)
            .cloned()
            .ok_or_else(|| DeviceError::NotFound(id.to_string()))
    }

    /// 进入仪表盘时调用
    pub async fn record_usage(&self, id: &str) -> Result<Device> {
        self.modify(id, |device| {
            device.record_usage();
            device.clone()
        })
        .await
    }

    /// 切换收藏，返回新状态
    pub async fn toggle_bookmark(&self, id: &str) -> Result<bool> {
        let bookmarked = self.modify(id, Device::toggle_bookmark).await?;

        if let Some((backend, user_id)) = &self.backend {
            if let Err(e) = backend.set_bookmark(user_id, id, bookmarked).await {
                warn!("Failed to mirror bookmark for {}: {}", id, e);
            }
        }

        Ok(bookmarked)
    }

    /// 删除设备
    pub async fn delete(&self, id: &str) -> Result<Device> {
        let removed = self
            .store
            .update(|state| {
                let index = state
                    .devices
                    .iter()
                    .position(|d| d.id == id)
                    .ok_or_else(|| DeviceError::NotFound(id.to_string()))?;
                Ok(state.devices.remove(index))
            })
            .await?;

        if let Some((backend, user_id)) = &self.backend {
            if let Err(e) = backend.remove_device(user_id, id).await {
                warn!("Failed to delete {} on backend: {}", id, e);
            }
        }

        info!("Device removed: {}", id);
        Ok(removed)
    }

    pub async fn bookmarked(&self) -> Vec<Device> {
        self.store
            .get()
            .await
            .devices
            .iter()
            .filter(|d| d.bookmarked)
            .cloned()
            .collect()
    }

    /// 使用次数最多的 `n` 个设备，次数相同时保持原有顺序
    pub async fn most_used(&self, n: usize) -> Vec<Device> {
        let mut devices = self.list().await;
        devices.sort_by(|a, b| b.usage.cmp(&a.usage));
        devices.truncate(n);
        devices
    }

    /// 刷新所有设备的当前时间
    pub async fn touch_all(&self) -> Result<()> {
        self.store
            .update(|state| {
                state.devices.iter_mut().for_each(Device::touch);
                Ok(())
            })
            .await
    }

    /// 从后端拉取设备列表，补充本地缺少的设备，返回新增数量
    ///
    /// 本地已有的设备保持不变。
    pub async fn sync(&self) -> Result<usize> {
        let Some((backend, user_id)) = &self.backend else {
            return Ok(0);
        };

        let remote = backend.devices(user_id).await?;
        let added = self
            .store
            .update(|state| {
                let mut added = 0;
                for device in remote.into_iter().filter(|d| !d.id.trim().is_empty()) {
                    if !state.devices.iter().any(|d| d.id == device.id) {
                        state.devices.push(device);
                        added += 1;
                    }
                }
                Ok(added)
            })
            .await?;

        info!("Synced devices for {}: {} added", user_id, added);
        Ok(added)
    }

    async fn modify<F, R>(&self, id: &str, f: F) -> Result<R>
    where
        F: FnOnce(&mut Device) -> R,
    {
        self.store
            .update(|state| {
                let device = state
                    .devices
                    .iter_mut()
                    .find(|d| d.id == id)
                    .ok_or_else(|| DeviceError::NotFound(id.to_string()))?;
                Ok(f(device))
            })
            .await
    }
}
