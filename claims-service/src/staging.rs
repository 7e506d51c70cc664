//! Claim staging: short-lived, single-use metadata keyed by user id.
//!
//! A client stages metadata before it starts an interactive sign-in; the
//! identity provider's claims callback later consumes it exactly once. Records
//! that are never consumed expire with the store ttl.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::store::{SharedStore, StoreKind};

/// Lifetime of a staged record.
pub const STAGING_TTL: Duration = Duration::from_secs(300);

/// Cache payload for one user. Field names are the stored JSON format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StagedRecord {
    pub business_unit: String,
    pub device_info: String,
    #[serde(default)]
    pub custom_data: Option<String>,
    /// Unix epoch seconds at which the record was staged.
    #[serde(rename = "timestamp")]
    pub staged_at: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConsumeOutcome {
    Staged {
        record: StagedRecord,
        data_age_seconds: f64,
    },
    Missing,
}

#[derive(Clone)]
pub struct StagingService {
    store: SharedStore,
    ttl: Duration,
}

impl StagingService {
    pub fn new(store: SharedStore) -> Self {
        Self {
            store,
            ttl: STAGING_TTL,
        }
    }

    pub fn kind(&self) -> StoreKind {
        self.store.kind()
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn store(&self) -> &SharedStore {
        &self.store
    }

    /// Stages metadata for `user_id`, replacing anything staged before.
    /// Returns `false` when the record could not be written.
    pub async fn stage(
        &self,
        user_id: &str,
        business_unit: &str,
        device_info: &str,
        custom_data: Option<&str>,
    ) -> bool {
        let record = StagedRecord {
            business_unit: business_unit.to_string(),
            device_info: device_info.to_string(),
            custom_data: custom_data.map(str::to_string),
            staged_at: epoch_seconds(),
        };
        let payload = match serde_json::to_string(&record) {
            Ok(payload) => payload,
            Err(err) => {
                warn!(error = %err, user_id, "Failed to serialize staged record");
                return false;
            }
        };
        match self.store.put(user_id, &payload, self.ttl).await {
            Ok(()) => {
                debug!(user_id, ttl_secs = self.ttl.as_secs(), backend = %self.kind(), "Staged record");
                true
            }
            Err(err) => {
                warn!(error = %err, user_id, backend = %self.kind(), "Failed to store staged record");
                false
            }
        }
    }

    /// Removes and returns the staged record for `user_id`.
    ///
    /// Store failures and undecodable payloads are reported as
    /// [`ConsumeOutcome::Missing`] so callers fall back to default claims.
    pub async fn consume(&self, user_id: &str) -> ConsumeOutcome {
        let payload = match self.store.take(user_id).await {
            Ok(Some(payload)) => payload,
            Ok(None) => return ConsumeOutcome::Missing,
            Err(err) => {
                warn!(error = %err, user_id, backend = %self.kind(), "Failed to read staged record");
                return ConsumeOutcome::Missing;
            }
        };
        match serde_json::from_str::<StagedRecord>(&payload) {
            Ok(record) => {
                let data_age_seconds = (epoch_seconds() - record.staged_at).max(0.0);
                ConsumeOutcome::Staged {
                    record,
                    data_age_seconds,
                }
            }
            Err(err) => {
                warn!(error = %err, user_id, "Discarding undecodable staged record");
                ConsumeOutcome::Missing
            }
        }
    }
}

fn epoch_seconds() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs_f64())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{KvStore, MemoryStore};
    use std::sync::Arc;

    fn service() -> (StagingService, MemoryStore) {
        let store = MemoryStore::new();
        (StagingService::new(Arc::new(store.clone())), store)
    }

    #[tokio::test]
    async fn stage_then_consume_once() {
        let (staging, _) = service();
        assert!(staging.stage("u1", "Finance", "iPhone15", Some("vip")).await);

        match staging.consume("u1").await {
            ConsumeOutcome::Staged { record, data_age_seconds } => {
                assert_eq!(record.business_unit, "Finance");
                assert_eq!(record.device_info, "iPhone15");
                assert_eq!(record.custom_data.as_deref(), Some("vip"));
                assert!(data_age_seconds >= 0.0);
                assert!(data_age_seconds < 5.0);
            }
            ConsumeOutcome::Missing => panic!("expected staged record"),
        }
        assert_eq!(staging.consume("u1").await, ConsumeOutcome::Missing);
    }

    #[tokio::test]
    async fn never_staged_is_missing() {
        let (staging, _) = service();
        assert_eq!(staging.consume("ghost").await, ConsumeOutcome::Missing);
    }

    #[tokio::test]
    async fn later_stage_replaces_earlier() {
        let (staging, _) = service();
        assert!(staging.stage("u1", "Finance", "iPhone15", None).await);
        assert!(staging.stage("u1", "Sales", "Pixel8", Some("x")).await);

        let ConsumeOutcome::Staged { record, .. } = staging.consume("u1").await else {
            panic!("expected staged record");
        };
        assert_eq!(record.business_unit, "Sales");
        assert_eq!(record.device_info, "Pixel8");
        assert_eq!(record.custom_data.as_deref(), Some("x"));
    }

    #[tokio::test]
    async fn concurrent_stages_never_merge() {
        let (staging, _) = service();
        let a = staging.clone();
        let b = staging.clone();
        let (ok_a, ok_b) = tokio::join!(
            async move { a.stage("u1", "Finance", "iPhone15", Some("a")).await },
            async move { b.stage("u1", "Sales", "Pixel8", Some("b")).await },
        );
        assert!(ok_a && ok_b);

        let ConsumeOutcome::Staged { record, .. } = staging.consume("u1").await else {
            panic!("expected staged record");
        };
        let finance = record.business_unit == "Finance"
            && record.device_info == "iPhone15"
            && record.custom_data.as_deref() == Some("a");
        let sales = record.business_unit == "Sales"
            && record.device_info == "Pixel8"
            && record.custom_data.as_deref() == Some("b");
        assert!(finance || sales, "fields from different writes were mixed: {record:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn expired_record_is_missing() {
        let (staging, _) = service();
        assert!(staging.stage("u1", "Finance", "iPhone15", None).await);
        tokio::time::advance(STAGING_TTL).await;
        assert_eq!(staging.consume("u1").await, ConsumeOutcome::Missing);
    }

    #[tokio::test]
    async fn undecodable_payload_degrades_to_missing() {
        let (staging, store) = service();
        store.put("u1", "not json", STAGING_TTL).await.unwrap();
        assert_eq!(staging.consume("u1").await, ConsumeOutcome::Missing);
        // consumed regardless
        assert_eq!(store.get("u1").await.unwrap(), None);
    }

    #[test]
    fn record_uses_stored_field_names() {
        let record = StagedRecord {
            business_unit: "Finance".into(),
            device_info: "iPhone15".into(),
            custom_data: None,
            staged_at: 1_700_000_000.5,
        };
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["business_unit"], "Finance");
        assert_eq!(value["timestamp"], 1_700_000_000.5);
        assert!(value["custom_data"].is_null());
    }
}
