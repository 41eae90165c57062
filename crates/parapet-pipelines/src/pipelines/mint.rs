//! Policy mint pipeline.
//!
//! Validation runs before any collaborator is touched. The ledger write,
//! when a signer is present, is issued exactly once and never retried; a
//! persistence failure after it is surfaced as `AfterLedgerWrite` with the
//! transaction handle, and a best-effort orphan marker is appended so the
//! mint can be reconciled later.

use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use parapet_common::{
    NewPolicy, PersistenceError, PolicyRecord, Result, TimelineEvent, TimelineEventKind,
};

use crate::services::ServiceBundle;

use super::validate_new_policy;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MintRequest {
    pub user_id: String,
    pub policy: NewPolicy,
}

#[derive(Debug, Clone, Serialize)]
pub struct MintOutcome {
    pub record: PolicyRecord,
    /// True when the policy also exists on the ledger.
    pub minted_on_ledger: bool,
}

/// Validates, optionally mints on the ledger, then persists the record
/// and its audit trail.
#[instrument(skip(bundle, request), fields(pool = %request.policy.pool_type, user = %request.user_id))]
pub async fn validate_and_mint(bundle: &ServiceBundle, request: &MintRequest) -> Result<MintOutcome> {
    validate_new_policy(&request.policy)?;

    let id = Uuid::now_v7();
    let now = bundle.clock.now();
    let mut record = PolicyRecord::from_new(id, &request.user_id, &request.policy, now);

    let mut minted_on_ledger = false;
    if let Some(signer) = &bundle.signer {
        let receipt = bundle.ledger.mint_policy(signer, &request.policy).await?;
        info!(
            policy_id = %id,
            ledger_policy_id = receipt.ledger_policy_id,
            tx_handle = %receipt.tx_handle,
            "minted on ledger"
        );
        record = record.with_mint(receipt.ledger_policy_id, receipt.tx_handle);
        minted_on_ledger = true;
    }

    if let Err(err) = bundle.database.create_policy(&record).await {
        if let Some(tx_handle) = record.mint_tx.clone() {
            warn!(
                policy_id = %id,
                tx_handle = %tx_handle,
                error = %err,
                "minted on ledger but record write failed"
            );
            // Best effort: the store that just failed may still accept the
            // marker, and reconciliation looks for it.
            let marker = TimelineEvent::new(
                id,
                TimelineEventKind::LedgerOrphaned {
                    tx_handle: tx_handle.clone(),
                },
                now,
            );
            let _ = bundle.database.append_timeline_event(marker).await;
            return Err(PersistenceError::AfterLedgerWrite {
                tx_handle,
                reason: err.to_string(),
            }
            .into());
        }
        return Err(err.into());
    }

    bundle
        .database
        .append_timeline_event(TimelineEvent::new(id, TimelineEventKind::Created, now))
        .await?;
    if let (Some(tx_handle), Some(ledger_policy_id)) =
        (record.mint_tx.clone(), record.ledger_policy_id)
    {
        bundle
            .database
            .append_timeline_event(TimelineEvent::new(
                id,
                TimelineEventKind::MintedOnLedger {
                    tx_handle,
                    ledger_policy_id,
                },
                now,
            ))
            .await?;
    }

    info!(policy_id = %id, minted_on_ledger, "policy created");
    Ok(MintOutcome {
        record,
        minted_on_ledger,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::database::MockDatabaseService;
    use crate::services::ledger::MockLedgerService;
    use crate::services::{
        DatabaseService, InMemoryDatabase, InMemoryLedger, LedgerService, ServiceBundle,
    };
    use parapet_common::{PipelineError, PolicyStatus, PoolType, ValidationError};
    use rust_decimal_macros::dec;
    use std::sync::Arc;

    fn request(coverage: rust_decimal::Decimal) -> MintRequest {
        MintRequest {
            user_id: "user-1".into(),
            policy: NewPolicy {
                pool_type: PoolType::Earthquake,
                lat: 35.68,
                lng: 139.76,
                trigger_value: 6.0,
                trigger_unit: "Mw".into(),
                coverage_amount: coverage,
                premium_amount: dec!(2500),
            },
        }
    }

    #[tokio::test]
    async fn test_invalid_input_touches_no_collaborators() {
        let mut ledger = MockLedgerService::new();
        ledger.expect_mint_policy().times(0);
        let mut database = MockDatabaseService::new();
        database.expect_create_policy().times(0);
        database.expect_append_timeline_event().times(0);

        let bundle = ServiceBundle::in_memory()
            .with_ledger(Arc::new(ledger))
            .with_database(Arc::new(database));

        let err = validate_and_mint(&bundle, &request(dec!(0)))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Validation(ValidationError::NonPositiveCoverage)
        ));
    }

    #[tokio::test]
    async fn test_mint_with_signer_records_ledger_fields() {
        let ledger = Arc::new(InMemoryLedger::new());
        let database = Arc::new(InMemoryDatabase::new());
        let bundle = ServiceBundle::in_memory()
            .with_ledger(ledger.clone())
            .with_database(database.clone());

        let outcome = validate_and_mint(&bundle, &request(dec!(100000)))
            .await
            .unwrap();

        assert!(outcome.minted_on_ledger);
        assert_eq!(outcome.record.ledger_policy_id, Some(1));
        assert!(outcome.record.mint_tx.as_deref().unwrap().starts_with("0x"));
        assert_eq!(outcome.record.status, PolicyStatus::Active);

        let timeline = database
            .get_policy_timeline(outcome.record.id)
            .await
            .unwrap();
        assert_eq!(timeline.len(), 2);
        assert!(matches!(timeline[0].kind, TimelineEventKind::Created));
        assert!(matches!(
            timeline[1].kind,
            TimelineEventKind::MintedOnLedger { ledger_policy_id: 1, .. }
        ));

        // Premium reached both the ledger pool and the stats.
        assert_eq!(ledger.read_pool_balance().await.unwrap(), dec!(2500));
        let stats = database.get_pool_stats().await.unwrap();
        assert_eq!(stats.total_premiums, dec!(2500));
        assert_eq!(stats.active_policies, 1);
    }

    #[tokio::test]
    async fn test_mint_without_signer_skips_ledger() {
        let ledger = Arc::new(InMemoryLedger::new());
        let bundle = ServiceBundle::in_memory()
            .with_ledger(ledger.clone())
            .without_signer();

        let outcome = validate_and_mint(&bundle, &request(dec!(100000)))
            .await
            .unwrap();

        assert!(!outcome.minted_on_ledger);
        assert!(outcome.record.ledger_policy_id.is_none());
        assert!(outcome.record.mint_tx.is_none());
        assert_eq!(ledger.metrics().writes, 0);
    }

    #[tokio::test]
    async fn test_store_failure_after_mint_surfaces_tx_handle() {
        let database = Arc::new(InMemoryDatabase::new().with_failing_writes(1));
        let bundle = ServiceBundle::in_memory().with_database(database.clone());

        let err = validate_and_mint(&bundle, &request(dec!(100000)))
            .await
            .unwrap_err();

        match err {
            PipelineError::Persistence(PersistenceError::AfterLedgerWrite { tx_handle, reason }) => {
                assert!(tx_handle.starts_with("0x"));
                assert!(reason.contains("store"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_store_failure_without_mint_stays_plain() {
        let database = Arc::new(InMemoryDatabase::new().with_failing_writes(1));
        let bundle = ServiceBundle::in_memory()
            .with_database(database)
            .without_signer();

        let err = validate_and_mint(&bundle, &request(dec!(100000)))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Persistence(PersistenceError::Unavailable(_))
        ));
    }
}
