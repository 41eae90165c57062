//! Policy records and their timelines
//!
//! The policy record is the only value with cross-invocation identity in
//! the system; it lives behind the `DatabaseService` seam. Timeline events
//! are the append-only audit trail of everything that happened to a policy.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::hazard::PoolType;
use super::payout::PayoutTier;

/// Where a policy is in its life.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyStatus {
    Active,
    PaidOut,
}

/// Input for creating a policy. Validated before any collaborator call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPolicy {
    pub pool_type: PoolType,
    pub lat: f64,
    pub lng: f64,
    pub trigger_value: f64,
    pub trigger_unit: String,
    pub coverage_amount: Decimal,
    pub premium_amount: Decimal,
}

/// A persisted policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyRecord {
    /// Record identity (UUIDv7, time-ordered)
    pub id: Uuid,

    /// Owner account
    pub user_id: String,

    /// Covered peril
    pub pool_type: PoolType,

    /// Covered location
    pub lat: f64,
    pub lng: f64,

    /// Index value at which payouts start, in `trigger_unit`
    pub trigger_value: f64,
    pub trigger_unit: String,

    /// Maximum payout
    pub coverage_amount: Decimal,

    /// Premium paid at mint
    pub premium_amount: Decimal,

    /// On-ledger policy id, present when the mint step ran
    pub ledger_policy_id: Option<u64>,

    /// Mint transaction handle, present when the mint step ran
    pub mint_tx: Option<String>,

    pub status: PolicyStatus,
    pub created_at: DateTime<Utc>,
}

impl PolicyRecord {
    /// Build a record from validated input. The ledger fields start empty
    /// and are filled in when a mint receipt exists.
    pub fn from_new(id: Uuid, user_id: impl Into<String>, new: &NewPolicy, at: DateTime<Utc>) -> Self {
        Self {
            id,
            user_id: user_id.into(),
            pool_type: new.pool_type,
            lat: new.lat,
            lng: new.lng,
            trigger_value: new.trigger_value,
            trigger_unit: new.trigger_unit.clone(),
            coverage_amount: new.coverage_amount,
            premium_amount: new.premium_amount,
            ledger_policy_id: None,
            mint_tx: None,
            status: PolicyStatus::Active,
            created_at: at,
        }
    }

    /// Attach the mint receipt.
    pub fn with_mint(mut self, ledger_policy_id: u64, tx_handle: impl Into<String>) -> Self {
        self.ledger_policy_id = Some(ledger_policy_id);
        self.mint_tx = Some(tx_handle.into());
        self
    }
}

/// What happened to a policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum TimelineEventKind {
    /// Record created and persisted
    Created,

    /// Policy minted on the ledger
    MintedOnLedger { tx_handle: String, ledger_policy_id: u64 },

    /// An attestation round ran for a claim
    AttestationRound {
        round_id: String,
        confirmed: usize,
        required: usize,
    },

    /// A payout settled on the ledger
    PayoutTriggered {
        tx_handle: String,
        tier: PayoutTier,
        amount: Decimal,
    },

    /// A claim was evaluated but the reading stayed below trigger
    PayoutSkipped { ratio: f64 },

    /// Minted on the ledger but the follow-up persistence write failed
    LedgerOrphaned { tx_handle: String },
}

/// One entry in a policy's audit trail.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimelineEvent {
    pub id: Uuid,
    pub policy_id: Uuid,
    pub kind: TimelineEventKind,
    pub at: DateTime<Utc>,
}

impl TimelineEvent {
    pub fn new(policy_id: Uuid, kind: TimelineEventKind, at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::now_v7(),
            policy_id,
            kind,
            at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn sample_new() -> NewPolicy {
        NewPolicy {
            pool_type: PoolType::Earthquake,
            lat: 35.68,
            lng: 139.76,
            trigger_value: 5.0,
            trigger_unit: "Mw".into(),
            coverage_amount: dec!(100000),
            premium_amount: dec!(2500),
        }
    }

    #[test]
    fn test_record_starts_without_ledger_fields() {
        let record = PolicyRecord::from_new(Uuid::now_v7(), "user-1", &sample_new(), Utc::now());
        assert!(record.ledger_policy_id.is_none());
        assert!(record.mint_tx.is_none());
        assert_eq!(record.status, PolicyStatus::Active);
    }

    #[test]
    fn test_with_mint_fills_ledger_fields() {
        let record = PolicyRecord::from_new(Uuid::now_v7(), "user-1", &sample_new(), Utc::now())
            .with_mint(7, "0xabc");
        assert_eq!(record.ledger_policy_id, Some(7));
        assert_eq!(record.mint_tx.as_deref(), Some("0xabc"));
    }

    #[test]
    fn test_timeline_kind_serde_tagging() {
        let kind = TimelineEventKind::PayoutTriggered {
            tx_handle: "0xdef".into(),
            tier: PayoutTier::Severe,
            amount: dec!(100000),
        };
        let json = serde_json::to_string(&kind).unwrap();
        assert!(json.contains("\"type\":\"PayoutTriggered\""));
        let back: TimelineEventKind = serde_json::from_str(&json).unwrap();
        assert_eq!(back, kind);
    }
}
