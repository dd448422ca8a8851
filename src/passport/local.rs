/// Device stamp store: the passport of an anonymous visitor
use super::{storage::KeyValueStore, Stamp};
use crate::{
    error::{DistimError, DistimResult},
    session::DeviceId,
};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard};

/// Fixed key under which a device keeps its stamps
pub const PASSPORT_KEY: &str = "distim_passport_badges";

/// Number of lock stripes shared by all devices
const LOCK_STRIPES: usize = 64;

/// Stamp list stored as a JSON array in a device's key-value namespace
///
/// Every read-modify-write of a device's list runs under that device's lock
/// stripe, so concurrent visits from one device never overwrite each other.
#[derive(Clone)]
pub struct LocalStampStore {
    storage: Arc<dyn KeyValueStore>,
    locks: Arc<Vec<Mutex<()>>>,
}

/// Exclusive access to one device's stamp list
pub struct DeviceStamps<'a> {
    store: &'a LocalStampStore,
    device: DeviceId,
    _guard: MutexGuard<'a, ()>,
}

impl LocalStampStore {
    pub fn new(storage: Arc<dyn KeyValueStore>) -> Self {
        Self {
            storage,
            locks: Arc::new((0..LOCK_STRIPES).map(|_| Mutex::new(())).collect()),
        }
    }

    /// Lock a device's stamp list until the returned handle is dropped
    pub async fn lock(&self, device: &DeviceId) -> DeviceStamps<'_> {
        let mut hasher = DefaultHasher::new();
        device.hash(&mut hasher);
        let stripe = (hasher.finish() % LOCK_STRIPES as u64) as usize;

        DeviceStamps {
            store: self,
            device: *device,
            _guard: self.locks[stripe].lock().await,
        }
    }

    /// Load the device's stamps; missing or unreadable data yields an empty list
    pub async fn load(&self, device: &DeviceId) -> Vec<Stamp> {
        let raw = match self.storage.get(device, PASSPORT_KEY).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return Vec::new(),
            Err(e) => {
                tracing::warn!("Error reading stamps for device {}: {}", device, e);
                return Vec::new();
            }
        };

        serde_json::from_str(&raw).unwrap_or_else(|e| {
            tracing::warn!("Discarding corrupted stamps for device {}: {}", device, e);
            Vec::new()
        })
    }

    /// Add a stamp unless one for the same totem exists
    ///
    /// Returns whether the stamp was added.
    pub async fn add(&self, device: &DeviceId, stamp: Stamp) -> DistimResult<bool> {
        let stamps = self.lock(device).await;
        let mut list = stamps.load().await;
        if list.iter().any(|s| s.totem_id == stamp.totem_id) {
            return Ok(false);
        }

        list.push(stamp);
        stamps.save(&list).await?;

        Ok(true)
    }

    /// Whether the device already holds the stamp of a totem
    pub async fn has(&self, device: &DeviceId, totem_id: &str) -> bool {
        self.load(device)
            .await
            .iter()
            .any(|s| s.totem_id == totem_id)
    }

    /// Remove every stamp of the device
    pub async fn clear(&self, device: &DeviceId) -> DistimResult<()> {
        self.lock(device).await.clear().await
    }
}

impl DeviceStamps<'_> {
    pub async fn load(&self) -> Vec<Stamp> {
        self.store.load(&self.device).await
    }

    /// Replace the whole list
    pub async fn save(&self, stamps: &[Stamp]) -> DistimResult<()> {
        let raw = serde_json::to_string(stamps)
            .map_err(|e| DistimError::Storage(format!("Failed to encode stamps: {}", e)))?;
        self.store.storage.set(&self.device, PASSPORT_KEY, raw).await
    }

    /// Drop the stamps of the given totems, keeping the rest
    pub async fn remove_totems(&self, totem_ids: &[String]) -> DistimResult<()> {
        if totem_ids.is_empty() {
            return Ok(());
        }

        let remaining: Vec<Stamp> = self
            .load()
            .await
            .into_iter()
            .filter(|s| !totem_ids.contains(&s.totem_id))
            .collect();

        if remaining.is_empty() {
            self.clear().await
        } else {
            self.save(&remaining).await
        }
    }

    pub async fn clear(&self) -> DistimResult<()> {
        self.store.storage.remove(&self.device, PASSPORT_KEY).await
    }
}
