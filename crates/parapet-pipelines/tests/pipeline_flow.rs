//! End-to-end pipeline journeys over the in-memory bundle.

use std::sync::Arc;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal_macros::dec;

use parapet_common::{
    CancelToken, NewPolicy, PayoutTier, PolicyStatus, PoolType, TimelineEventKind,
};
use parapet_oracle::attest::SimulatedAttestationService;
use parapet_oracle::hazard::SimulatedHazardData;
use parapet_pipelines::pipelines::{
    aggregate_pool_stats, backtest, quote, read_and_classify, snapshot_prices, trigger_payout,
    validate_and_mint, MintRequest, QuoteRequest,
};
use parapet_pipelines::services::{DatabaseService, InMemoryDatabase, InMemoryLedger, ServiceBundle};

fn quote_request(pool_type: PoolType, trigger_value: f64) -> QuoteRequest {
    QuoteRequest {
        pool_type,
        lat: 35.68,
        lng: 139.76,
        trigger_value,
        coverage_amount: dec!(100000),
    }
}

fn funded_bundle() -> (ServiceBundle, Arc<SimulatedHazardData>, Arc<InMemoryDatabase>) {
    let database = Arc::new(InMemoryDatabase::new());
    let ledger = Arc::new(InMemoryLedger::new().with_balance(dec!(1000000)));
    let bundle = ServiceBundle::in_memory()
        .with_database(database.clone())
        .with_ledger(ledger);
    let hazard = Arc::new(SimulatedHazardData::new(bundle.clock.clone()));
    (bundle.with_hazard(hazard.clone()), hazard, database)
}

#[tokio::test]
async fn test_quote_to_settled_claim_journey() {
    let (bundle, hazard, database) = funded_bundle();
    let cancel = CancelToken::disarmed();

    // Quote earthquake coverage off the observed catalog.
    let request = quote_request(PoolType::Earthquake, 6.0);
    let offer = quote(&bundle, &cancel, &request).await.unwrap();
    assert!(offer.breakdown.premium_amount > dec!(0));
    assert!(!offer.breakdown.is_simulated);

    // Buy at the quoted premium.
    let minted = validate_and_mint(
        &bundle,
        &MintRequest {
            user_id: "user-1".into(),
            policy: NewPolicy {
                pool_type: request.pool_type,
                lat: request.lat,
                lng: request.lng,
                trigger_value: request.trigger_value,
                trigger_unit: offer.trigger_unit.clone(),
                coverage_amount: request.coverage_amount,
                premium_amount: offer.breakdown.premium_amount,
            },
        },
    )
    .await
    .unwrap();
    assert!(minted.minted_on_ledger);

    // 8.1 against 6.0 is a 1.35 ratio: moderate tier, half of coverage.
    hazard.set_reading(PoolType::Earthquake, 8.1);
    let claim = trigger_payout(&bundle, &cancel, minted.record.id)
        .await
        .unwrap();
    assert!(claim.settled);
    assert_eq!(claim.tier.tier, PayoutTier::Moderate);
    assert_eq!(claim.tier.payout_amount, dec!(50000));

    // Pool accounting reflects the journey.
    let report = aggregate_pool_stats(&bundle, &cancel).await.unwrap();
    assert_eq!(report.stats.total_policies, 1);
    assert_eq!(report.stats.active_policies, 0);
    assert_eq!(report.stats.total_payouts, dec!(50000));
    let expected_loss = (dec!(50000) / offer.breakdown.premium_amount)
        .to_f64()
        .unwrap();
    assert!((report.loss_ratio - expected_loss).abs() < 1e-9);

    let record = database.get_policy(minted.record.id).await.unwrap();
    assert_eq!(record.status, PolicyStatus::PaidOut);
}

#[tokio::test]
async fn test_timeline_captures_the_whole_story() {
    let (bundle, hazard, database) = funded_bundle();
    let cancel = CancelToken::disarmed();

    hazard.set_reading(PoolType::Earthquake, 3.0);
    let minted = validate_and_mint(
        &bundle,
        &MintRequest {
            user_id: "user-1".into(),
            policy: NewPolicy {
                pool_type: PoolType::Earthquake,
                lat: 35.68,
                lng: 139.76,
                trigger_value: 6.0,
                trigger_unit: "Mw".into(),
                coverage_amount: dec!(100000),
                premium_amount: dec!(2500),
            },
        },
    )
    .await
    .unwrap();

    // First claim finds the index below trigger.
    let first = trigger_payout(&bundle, &cancel, minted.record.id)
        .await
        .unwrap();
    assert!(!first.settled);

    // The hazard worsens; the second claim settles.
    hazard.set_reading(PoolType::Earthquake, 9.9);
    let second = trigger_payout(&bundle, &cancel, minted.record.id)
        .await
        .unwrap();
    assert!(second.settled);
    assert_eq!(second.tier.tier, PayoutTier::Severe);

    let timeline = database
        .get_policy_timeline(minted.record.id)
        .await
        .unwrap();
    let kinds: Vec<&'static str> = timeline
        .iter()
        .map(|e| match e.kind {
            TimelineEventKind::Created => "created",
            TimelineEventKind::MintedOnLedger { .. } => "minted",
            TimelineEventKind::PayoutSkipped { .. } => "skipped",
            TimelineEventKind::AttestationRound { .. } => "round",
            TimelineEventKind::PayoutTriggered { .. } => "payout",
            TimelineEventKind::LedgerOrphaned { .. } => "orphaned",
        })
        .collect();
    assert_eq!(
        kinds,
        vec!["created", "minted", "skipped", "round", "payout"]
    );
}

#[tokio::test]
async fn test_partial_source_outage_still_settles() {
    // Hurricane consensus is 2-of-3; one provider down is tolerated.
    let (bundle, hazard, _database) = funded_bundle();
    let bundle = bundle.with_attestation(Arc::new(
        SimulatedAttestationService::new().with_failing_source("openweather"),
    ));
    let cancel = CancelToken::disarmed();

    hazard.set_reading(PoolType::Hurricane, 200.0);
    let minted = validate_and_mint(
        &bundle,
        &MintRequest {
            user_id: "user-2".into(),
            policy: NewPolicy {
                pool_type: PoolType::Hurricane,
                lat: 25.76,
                lng: -80.19,
                trigger_value: 119.0,
                trigger_unit: "km/h".into(),
                coverage_amount: dec!(200000),
                premium_amount: dec!(9000),
            },
        },
    )
    .await
    .unwrap();

    let claim = trigger_payout(&bundle, &cancel, minted.record.id)
        .await
        .unwrap();
    assert!(claim.settled);

    let round = claim.round.unwrap();
    assert_eq!(round.outcome.confirmed_count, 2);
    assert_eq!(round.outcome.required_count, 2);
    let failed: Vec<&str> = round
        .results
        .iter()
        .filter(|r| !r.is_confirmed())
        .map(|r| r.source_name.as_str())
        .collect();
    assert_eq!(failed, vec!["openweather"]);
}

#[tokio::test]
async fn test_wildfire_single_source_journey() {
    let (bundle, hazard, _database) = funded_bundle();
    let cancel = CancelToken::disarmed();

    // Single-source pool: reading classification reports the weak basis.
    let classified = read_and_classify(&bundle, &cancel, PoolType::Wildfire, -33.86, 151.2)
        .await
        .unwrap();
    assert_eq!(classified.attestable_sources, 1);
    assert_eq!(classified.consensus_required, 1);

    hazard.set_reading(PoolType::Wildfire, 40.0);
    let minted = validate_and_mint(
        &bundle,
        &MintRequest {
            user_id: "user-3".into(),
            policy: NewPolicy {
                pool_type: PoolType::Wildfire,
                lat: -33.86,
                lng: 151.2,
                trigger_value: 30.0,
                trigger_unit: "FWI".into(),
                coverage_amount: dec!(75000),
                premium_amount: dec!(4000),
            },
        },
    )
    .await
    .unwrap();

    // 40/30 is a 1.33 ratio: moderate, and 1-of-1 consensus suffices.
    let claim = trigger_payout(&bundle, &cancel, minted.record.id)
        .await
        .unwrap();
    assert!(claim.settled);
    assert_eq!(claim.tier.tier, PayoutTier::Moderate);
    assert_eq!(claim.round.unwrap().outcome.confirmed_count, 1);
}

#[tokio::test]
async fn test_synthetic_pool_quote_and_backtest_agree_on_window() {
    let bundle = ServiceBundle::in_memory();
    let cancel = CancelToken::disarmed();
    let request = QuoteRequest {
        pool_type: PoolType::Drought,
        lat: -23.55,
        lng: -46.63,
        trigger_value: 30.0,
        coverage_amount: dec!(60000),
    };

    let offer = quote(&bundle, &cancel, &request).await.unwrap();
    let replay = backtest(&bundle, &cancel, &request).await.unwrap();

    assert!(offer.breakdown.is_simulated);
    assert_eq!(replay.report.trigger_value, 30.0);
    assert_eq!(
        replay.report.summary.years_of_data,
        offer.breakdown.years_of_data
    );
    assert_eq!(replay.breakdown, offer.breakdown);
}

#[tokio::test]
async fn test_price_snapshots_accumulate() {
    let bundle = ServiceBundle::in_memory();
    let cancel = CancelToken::disarmed();

    snapshot_prices(&bundle, &cancel).await.unwrap();
    snapshot_prices(&bundle, &cancel).await.unwrap();

    let history = parapet_pipelines::pipelines::price_history(&bundle, &cancel, 10)
        .await
        .unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].values[0].symbol, "FLR/USD");
}
