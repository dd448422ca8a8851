/// Virtual passport
///
/// Anonymous visitors collect stamps in a per-device store; authenticated
/// visitors collect unlock records on their account. `PassportService` picks
/// the store from the session so the two are never written for the same visit.

pub mod local;
pub mod remote;
pub mod storage;

pub use local::{LocalStampStore, PASSPORT_KEY};
pub use remote::UnlockStore;
pub use storage::{DiskKeyValueStore, KeyValueStore, MemoryKeyValueStore};

use crate::{
    db::models::Totem,
    error::{DistimError, DistimResult},
    metrics,
    session::{AuthSession, DeviceId},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A collected stamp; identity is the totem id
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct Stamp {
    pub totem_id: String,
    pub stamp_label: String,
    pub stamp_emoji: Option<String>,
    #[serde(default)]
    pub collected_at: Option<DateTime<Utc>>,
}

impl Stamp {
    /// Stamp issued for a totem right now
    pub fn for_totem(totem: &Totem) -> Self {
        Self {
            totem_id: totem.id.clone(),
            stamp_label: totem.stamp_label_or_name().to_string(),
            stamp_emoji: totem.stamp_emoji.clone(),
            collected_at: Some(Utc::now()),
        }
    }
}

/// Which store holds a session's stamps
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StampTarget {
    Device,
    Account,
    /// Anonymous session without a device id: nothing can be stored
    None,
}

impl StampTarget {
    pub fn for_session(session: &AuthSession) -> Self {
        match session {
            AuthSession::Authenticated { .. } => StampTarget::Account,
            AuthSession::Anonymous { device: Some(_) } => StampTarget::Device,
            AuthSession::Anonymous { device: None } => StampTarget::None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StampTarget::Device => "device",
            StampTarget::Account => "account",
            StampTarget::None => "none",
        }
    }
}

/// Passport view returned to the visitor
#[derive(Debug, Clone, Serialize)]
pub struct Passport {
    pub source: StampTarget,
    pub count: usize,
    pub stamps: Vec<Stamp>,
}

/// Result of recording a visit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct VisitRecord {
    pub target: StampTarget,
    /// A new stamp was stored by this visit
    pub recorded: bool,
    /// The stamp was already present before this visit
    pub already_collected: bool,
}

/// Result of moving device stamps onto an account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ClaimOutcome {
    pub claimed: usize,
    pub already_present: usize,
    /// Stamps of totems that were deleted since the visit
    pub dropped: usize,
    pub failed: usize,
}

/// Passport operations over both stores
#[derive(Clone)]
pub struct PassportService {
    local: LocalStampStore,
    remote: UnlockStore,
}

impl PassportService {
    pub fn new(local: LocalStampStore, remote: UnlockStore) -> Self {
        Self { local, remote }
    }

    pub fn local(&self) -> &LocalStampStore {
        &self.local
    }

    pub fn remote(&self) -> &UnlockStore {
        &self.remote
    }

    /// Stamps visible to the session
    pub async fn passport(&self, session: &AuthSession) -> DistimResult<Passport> {
        let stamps = match session {
            AuthSession::Authenticated { user_id, .. } => {
                self.remote.stamps_for_user(user_id).await?
            }
            AuthSession::Anonymous { device: Some(device) } => self.local.load(device).await,
            AuthSession::Anonymous { device: None } => Vec::new(),
        };

        Ok(Passport {
            source: StampTarget::for_session(session),
            count: stamps.len(),
            stamps,
        })
    }

    /// Whether the session already holds the stamp of a totem
    pub async fn has_stamp(&self, session: &AuthSession, totem_id: &str) -> bool {
        match session {
            AuthSession::Authenticated { user_id, .. } => {
                self.remote.has(user_id, totem_id).await.unwrap_or_else(|e| {
                    tracing::warn!("Error checking unlock of {} for {}: {}", totem_id, user_id, e);
                    false
                })
            }
            AuthSession::Anonymous { device: Some(device) } => {
                self.local.has(device, totem_id).await
            }
            AuthSession::Anonymous { device: None } => false,
        }
    }

    /// Record a visit to `totem` in the store the session owns
    ///
    /// Idempotent. Write failures are logged and reported as not recorded.
    pub async fn record_visit(&self, session: &AuthSession, totem: &Totem) -> VisitRecord {
        let target = StampTarget::for_session(session);

        let result = match session {
            AuthSession::Authenticated { user_id, .. } => {
                self.remote.upsert(user_id, &totem.id).await
            }
            AuthSession::Anonymous { device: Some(device) } => {
                self.local.add(device, Stamp::for_totem(totem)).await
            }
            AuthSession::Anonymous { device: None } => {
                tracing::debug!("Visit to {} not stored: no device id", totem.id);
                return VisitRecord {
                    target,
                    recorded: false,
                    already_collected: false,
                };
            }
        };

        match result {
            Ok(recorded) => {
                if recorded {
                    metrics::record_stamp(target.as_str());
                    tracing::info!("Stamp {} recorded on {}", totem.id, target.as_str());
                }
                VisitRecord {
                    target,
                    recorded,
                    already_collected: !recorded,
                }
            }
            Err(e) => {
                tracing::warn!("Failed to record stamp {} on {}: {}", totem.id, target.as_str(), e);
                VisitRecord {
                    target,
                    recorded: false,
                    already_collected: false,
                }
            }
        }
    }

    /// Remove every stamp of an anonymous device
    pub async fn clear(&self, session: &AuthSession) -> DistimResult<()> {
        match session {
            AuthSession::Anonymous { device: Some(device) } => self.local.clear(device).await,
            AuthSession::Anonymous { device: None } => Err(DistimError::Validation(
                "A device id is required to clear a passport".to_string(),
            )),
            AuthSession::Authenticated { .. } => Err(DistimError::Validation(
                "Account passports cannot be cleared".to_string(),
            )),
        }
    }

    /// Move the stamps of a device onto a user account
    ///
    /// Runs under the device lock. Stamps that reached the account, or whose
    /// totem no longer exists, leave the device; failed ones stay for a retry.
    pub async fn claim_device_stamps(
        &self,
        user_id: &str,
        device: &DeviceId,
    ) -> DistimResult<ClaimOutcome> {
        let mut outcome = ClaimOutcome {
            claimed: 0,
            already_present: 0,
            dropped: 0,
            failed: 0,
        };

        let stamps = self.local.lock(device).await;
        let mut settled = Vec::new();

        for stamp in stamps.load().await {
            match self.remote.upsert(user_id, &stamp.totem_id).await {
                Ok(true) => outcome.claimed += 1,
                Ok(false) => outcome.already_present += 1,
                Err(e) if is_missing_totem(&e) => {
                    tracing::info!("Dropping stamp of deleted totem {}", stamp.totem_id);
                    outcome.dropped += 1;
                }
                Err(e) => {
                    tracing::warn!("Failed to claim stamp {} for {}: {}", stamp.totem_id, user_id, e);
                    outcome.failed += 1;
                    continue;
                }
            }
            settled.push(stamp.totem_id);
        }

        stamps.remove_totems(&settled).await?;

        tracing::info!(
            "Device {} claimed by {}: {} new, {} existing, {} dropped, {} failed",
            device,
            user_id,
            outcome.claimed,
            outcome.already_present,
            outcome.dropped,
            outcome.failed
        );

        Ok(outcome)
    }
}

/// Unlock insert rejected because the totem row is gone
fn is_missing_totem(error: &DistimError) -> bool {
    match error {
        DistimError::Database(sqlx::Error::Database(db_error)) => {
            db_error.is_foreign_key_violation()
        }
        _ => false,
    }
}
