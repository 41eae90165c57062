//! Policy persistence store.
//!
//! Holds policy records, their append-only timelines, price snapshots,
//! and the pool accounting derived from them. [`InMemoryDatabase`] folds
//! settlement events into the running [`PoolStats`] as they are appended,
//! so stats reads never scan the full record set.

use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::RwLock;
use uuid::Uuid;

use parapet_common::{
    PersistenceError, PolicyRecord, PolicyStatus, PoolStats, PriceSnapshot, TimelineEvent,
    TimelineEventKind,
};

/// Access to the persistence store.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DatabaseService: Send + Sync {
    /// Persists a new policy record. The id must be fresh.
    async fn create_policy(&self, record: &PolicyRecord) -> Result<(), PersistenceError>;

    /// Fetches a policy record by store id.
    async fn get_policy(&self, policy_id: Uuid) -> Result<PolicyRecord, PersistenceError>;

    /// Appends one audit-trail event.
    ///
    /// The event may reference a policy the store never saw; orphan
    /// markers are written exactly when the record write failed.
    async fn append_timeline_event(&self, event: TimelineEvent) -> Result<(), PersistenceError>;

    /// Timeline for a policy, oldest first. Empty when nothing was recorded.
    async fn get_policy_timeline(
        &self,
        policy_id: Uuid,
    ) -> Result<Vec<TimelineEvent>, PersistenceError>;

    /// Persists a point-in-time feed capture.
    async fn save_price_snapshot(&self, snapshot: PriceSnapshot) -> Result<(), PersistenceError>;

    /// Most recent snapshots, newest first, at most `limit`.
    async fn get_price_history(&self, limit: usize)
        -> Result<Vec<PriceSnapshot>, PersistenceError>;

    /// Current pool accounting.
    async fn get_pool_stats(&self) -> Result<PoolStats, PersistenceError>;
}

/// In-memory store used by the default bundle and the test suites.
#[derive(Default)]
pub struct InMemoryDatabase {
    policies: DashMap<Uuid, PolicyRecord>,
    timelines: DashMap<Uuid, Vec<TimelineEvent>>,
    snapshots: RwLock<Vec<PriceSnapshot>>,
    stats: RwLock<PoolStats>,
    failing_writes: AtomicU32,
}

impl InMemoryDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next `count` writes fail with a transient error.
    pub fn with_failing_writes(self, count: u32) -> Self {
        self.failing_writes.store(count, Ordering::SeqCst);
        self
    }

    fn check_write(&self) -> Result<(), PersistenceError> {
        let injected = self
            .failing_writes
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if injected {
            return Err(PersistenceError::Unavailable(
                "store connection lost".to_string(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl DatabaseService for InMemoryDatabase {
    async fn create_policy(&self, record: &PolicyRecord) -> Result<(), PersistenceError> {
        self.check_write()?;
        if self.policies.contains_key(&record.id) {
            return Err(PersistenceError::Duplicate {
                id: record.id.to_string(),
            });
        }
        self.policies.insert(record.id, record.clone());

        let mut stats = self.stats.write();
        stats.total_policies += 1;
        if record.status == PolicyStatus::Active {
            stats.active_policies += 1;
        }
        stats.total_premiums += record.premium_amount;
        Ok(())
    }

    async fn get_policy(&self, policy_id: Uuid) -> Result<PolicyRecord, PersistenceError> {
        self.policies
            .get(&policy_id)
            .map(|entry| entry.value().clone())
            .ok_or(PersistenceError::NotFound {
                entity: "policy",
                id: policy_id.to_string(),
            })
    }

    async fn append_timeline_event(&self, event: TimelineEvent) -> Result<(), PersistenceError> {
        self.check_write()?;

        // Fold settlement into the record and the running stats. Guards are
        // taken one at a time.
        if let TimelineEventKind::PayoutTriggered { amount, .. } = &event.kind {
            let settled_active = match self.policies.get_mut(&event.policy_id) {
                Some(mut entry) => {
                    let was_active = entry.status == PolicyStatus::Active;
                    entry.status = PolicyStatus::PaidOut;
                    was_active
                }
                None => false,
            };

            let mut stats = self.stats.write();
            stats.total_payouts += *amount;
            if settled_active {
                stats.active_policies = stats.active_policies.saturating_sub(1);
            }
        }

        self.timelines
            .entry(event.policy_id)
            .or_default()
            .push(event);
        Ok(())
    }

    async fn get_policy_timeline(
        &self,
        policy_id: Uuid,
    ) -> Result<Vec<TimelineEvent>, PersistenceError> {
        Ok(self
            .timelines
            .get(&policy_id)
            .map(|entry| entry.value().clone())
            .unwrap_or_default())
    }

    async fn save_price_snapshot(&self, snapshot: PriceSnapshot) -> Result<(), PersistenceError> {
        self.check_write()?;
        self.snapshots.write().push(snapshot);
        Ok(())
    }

    async fn get_price_history(
        &self,
        limit: usize,
    ) -> Result<Vec<PriceSnapshot>, PersistenceError> {
        let snapshots = self.snapshots.read();
        Ok(snapshots.iter().rev().take(limit).cloned().collect())
    }

    async fn get_pool_stats(&self) -> Result<PoolStats, PersistenceError> {
        Ok(self.stats.read().clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use parapet_common::{NewPolicy, PayoutTier, PoolType};
    use rust_decimal_macros::dec;

    fn record() -> PolicyRecord {
        let new = NewPolicy {
            pool_type: PoolType::Flood,
            lat: 51.5,
            lng: -0.12,
            trigger_value: 3.0,
            trigger_unit: "m".into(),
            coverage_amount: dec!(50000),
            premium_amount: dec!(1200),
        };
        PolicyRecord::from_new(
            Uuid::now_v7(),
            "user-1",
            &new,
            Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap(),
        )
    }

    #[tokio::test]
    async fn test_create_get_round_trip() {
        let db = InMemoryDatabase::new();
        let record = record();
        db.create_policy(&record).await.unwrap();

        let loaded = db.get_policy(record.id).await.unwrap();
        assert_eq!(loaded.id, record.id);
        assert_eq!(loaded.user_id, "user-1");

        let err = db.get_policy(Uuid::now_v7()).await.unwrap_err();
        assert!(matches!(err, PersistenceError::NotFound { entity: "policy", .. }));
    }

    #[tokio::test]
    async fn test_duplicate_id_rejected() {
        let db = InMemoryDatabase::new();
        let record = record();
        db.create_policy(&record).await.unwrap();
        let err = db.create_policy(&record).await.unwrap_err();
        assert!(matches!(err, PersistenceError::Duplicate { .. }));
    }

    #[tokio::test]
    async fn test_create_accumulates_stats() {
        let db = InMemoryDatabase::new();
        db.create_policy(&record()).await.unwrap();
        db.create_policy(&record()).await.unwrap();

        let stats = db.get_pool_stats().await.unwrap();
        assert_eq!(stats.total_policies, 2);
        assert_eq!(stats.active_policies, 2);
        assert_eq!(stats.total_premiums, dec!(2400));
        assert_eq!(stats.total_payouts, dec!(0));
    }

    #[tokio::test]
    async fn test_payout_event_folds_into_record_and_stats() {
        let db = InMemoryDatabase::new();
        let record = record();
        db.create_policy(&record).await.unwrap();

        let event = TimelineEvent::new(
            record.id,
            TimelineEventKind::PayoutTriggered {
                tx_handle: "0xabc".into(),
                tier: PayoutTier::Moderate,
                amount: dec!(25000),
            },
            Utc::now(),
        );
        db.append_timeline_event(event).await.unwrap();

        let loaded = db.get_policy(record.id).await.unwrap();
        assert_eq!(loaded.status, PolicyStatus::PaidOut);

        let stats = db.get_pool_stats().await.unwrap();
        assert_eq!(stats.active_policies, 0);
        assert_eq!(stats.total_payouts, dec!(25000));

        let timeline = db.get_policy_timeline(record.id).await.unwrap();
        assert_eq!(timeline.len(), 1);
    }

    #[tokio::test]
    async fn test_orphan_marker_without_record() {
        let db = InMemoryDatabase::new();
        let policy_id = Uuid::now_v7();
        let event = TimelineEvent::new(
            policy_id,
            TimelineEventKind::LedgerOrphaned {
                tx_handle: "0xfeed".into(),
            },
            Utc::now(),
        );

        db.append_timeline_event(event).await.unwrap();
        let timeline = db.get_policy_timeline(policy_id).await.unwrap();
        assert_eq!(timeline.len(), 1);
    }

    #[tokio::test]
    async fn test_price_history_newest_first_with_limit() {
        let db = InMemoryDatabase::new();
        for day in 1..=5 {
            db.save_price_snapshot(PriceSnapshot {
                at: Utc.with_ymd_and_hms(2025, 6, day, 0, 0, 0).unwrap(),
                values: vec![],
            })
            .await
            .unwrap();
        }

        let history = db.get_price_history(3).await.unwrap();
        assert_eq!(history.len(), 3);
        assert_eq!(history[0].at.to_rfc3339(), "2025-06-05T00:00:00+00:00");
        assert_eq!(history[2].at.to_rfc3339(), "2025-06-03T00:00:00+00:00");
    }

    #[tokio::test]
    async fn test_failing_writes_then_recover() {
        let db = InMemoryDatabase::new().with_failing_writes(1);
        let record = record();

        let err = db.create_policy(&record).await.unwrap_err();
        assert!(matches!(err, PersistenceError::Unavailable(_)));
        db.create_policy(&record).await.unwrap();
    }
}
