/// Device key-value storage
///
/// Each anonymous device gets its own string key-value namespace, the server
/// side counterpart of browser local storage.
use crate::{
    error::{DistimError, DistimResult},
    session::DeviceId,
};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::{fs, sync::Mutex, sync::RwLock};

/// Key-value backend trait
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Read a value
    async fn get(&self, device: &DeviceId, key: &str) -> DistimResult<Option<String>>;

    /// Write a value, replacing any previous one
    async fn set(&self, device: &DeviceId, key: &str, value: String) -> DistimResult<()>;

    /// Remove a value; removing a missing key is not an error
    async fn remove(&self, device: &DeviceId, key: &str) -> DistimResult<()>;
}

/// Disk backend: one JSON object per device
///
/// Layout: {base}/{device_id}.json
#[derive(Clone)]
pub struct DiskKeyValueStore {
    base_path: PathBuf,
    write_lock: Arc<Mutex<()>>,
}

impl DiskKeyValueStore {
    pub fn new(base_path: PathBuf) -> Self {
        Self {
            base_path,
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    fn device_path(&self, device: &DeviceId) -> PathBuf {
        self.base_path.join(format!("{}.json", device))
    }

    async fn read_namespace(&self, device: &DeviceId) -> DistimResult<HashMap<String, String>> {
        let path = self.device_path(device);

        match fs::read(&path).await {
            Ok(data) => serde_json::from_slice(&data).map_err(|e| {
                DistimError::Storage(format!("Corrupted device store {}: {}", device, e))
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(HashMap::new()),
            Err(e) => Err(DistimError::Storage(format!(
                "Failed to read device store {}: {}",
                device, e
            ))),
        }
    }

    async fn write_namespace(
        &self,
        device: &DeviceId,
        namespace: &HashMap<String, String>,
    ) -> DistimResult<()> {
        fs::create_dir_all(&self.base_path).await.map_err(|e| {
            DistimError::Storage(format!("Failed to create device directory: {}", e))
        })?;

        let path = self.device_path(device);
        let tmp_path = path.with_extension("json.tmp");
        let data = serde_json::to_vec(namespace)
            .map_err(|e| DistimError::Storage(format!("Failed to encode device store: {}", e)))?;

        fs::write(&tmp_path, data).await.map_err(|e| {
            DistimError::Storage(format!("Failed to write device store {}: {}", device, e))
        })?;
        fs::rename(&tmp_path, &path).await.map_err(|e| {
            DistimError::Storage(format!("Failed to replace device store {}: {}", device, e))
        })?;

        Ok(())
    }
}

#[async_trait]
impl KeyValueStore for DiskKeyValueStore {
    async fn get(&self, device: &DeviceId, key: &str) -> DistimResult<Option<String>> {
        let namespace = self.read_namespace(device).await?;
        Ok(namespace.get(key).cloned())
    }

    async fn set(&self, device: &DeviceId, key: &str, value: String) -> DistimResult<()> {
        let _guard = self.write_lock.lock().await;

        // A corrupted namespace is replaced rather than blocking new writes
        let mut namespace = self.read_namespace(device).await.unwrap_or_else(|e| {
            tracing::warn!("{}; starting a fresh namespace", e);
            HashMap::new()
        });
        namespace.insert(key.to_string(), value);
        self.write_namespace(device, &namespace).await
    }

    async fn remove(&self, device: &DeviceId, key: &str) -> DistimResult<()> {
        let _guard = self.write_lock.lock().await;

        let mut namespace = match self.read_namespace(device).await {
            Ok(namespace) => namespace,
            Err(e) => {
                tracing::warn!("{}; clearing namespace", e);
                HashMap::new()
            }
        };
        namespace.remove(key);
        self.write_namespace(device, &namespace).await
    }
}

/// In-memory backend
#[derive(Clone, Default)]
pub struct MemoryKeyValueStore {
    entries: Arc<RwLock<HashMap<(DeviceId, String), String>>>,
}

impl MemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueStore for MemoryKeyValueStore {
    async fn get(&self, device: &DeviceId, key: &str) -> DistimResult<Option<String>> {
        let entries = self.entries.read().await;
        Ok(entries.get(&(*device, key.to_string())).cloned())
    }

    async fn set(&self, device: &DeviceId, key: &str, value: String) -> DistimResult<()> {
        let mut entries = self.entries.write().await;
        entries.insert((*device, key.to_string()), value);
        Ok(())
    }

    async fn remove(&self, device: &DeviceId, key: &str) -> DistimResult<()> {
        let mut entries = self.entries.write().await;
        entries.remove(&(*device, key.to_string()));
        Ok(())
    }
}
