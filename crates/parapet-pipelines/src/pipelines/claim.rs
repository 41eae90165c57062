//! Claim settlement pipeline.
//!
//! A claim re-measures the hazard, grades the reading against the policy
//! trigger, and only then involves the attestation network: no round is
//! opened for a reading below trigger. Consensus gates the ledger write,
//! and every step lands in the policy timeline.

use serde::Serialize;
use tracing::{info, instrument};
use uuid::Uuid;

use parapet_common::{
    with_retry, AttestationError, AttestationResult, CancelToken, ConsensusOutcome, FeedValue,
    HazardReading, PayoutTierResult, PipelineError, PolicyStatus, Result, TimelineEvent,
    TimelineEventKind, ValidationError,
};

use crate::services::ServiceBundle;

/// The attestation round a settled (or refused) claim ran.
#[derive(Debug, Clone, Serialize)]
pub struct RoundSummary {
    pub round_id: String,
    pub outcome: ConsensusOutcome,
    pub results: Vec<AttestationResult>,
}

/// Everything a claim produced.
#[derive(Debug, Clone, Serialize)]
pub struct ClaimOutcome {
    pub policy_id: Uuid,
    /// The fresh reading the claim was graded on.
    pub reading: HazardReading,
    pub tier: PayoutTierResult,
    /// Reference prices captured alongside the reading.
    pub prices: Vec<FeedValue>,
    /// Present when an attestation round ran.
    pub round: Option<RoundSummary>,
    pub payout_tx: Option<String>,
    /// True when a payout settled on the ledger.
    pub settled: bool,
}

/// Evaluates a claim and settles it on the ledger when the reading, the
/// attestation network, and the pool balance all allow it.
#[instrument(skip(bundle, cancel), fields(policy_id = %policy_id))]
pub async fn trigger_payout(
    bundle: &ServiceBundle,
    cancel: &CancelToken,
    policy_id: Uuid,
) -> Result<ClaimOutcome> {
    let database = bundle.database.clone();
    let record = with_retry(&bundle.retry, cancel, move || {
        let database = database.clone();
        async move {
            database
                .get_policy(policy_id)
                .await
                .map_err(PipelineError::from)
        }
    })
    .await?;

    if record.status == PolicyStatus::PaidOut {
        return Err(ValidationError::Invalid(format!(
            "policy {policy_id} was already paid out"
        ))
        .into());
    }

    // Reading and price context are independent; fetch them concurrently.
    let hazard = bundle.hazard.clone();
    let (pool_type, lat, lng) = (record.pool_type, record.lat, record.lng);
    let reading_fut = with_retry(&bundle.retry, cancel, move || {
        let hazard = hazard.clone();
        async move {
            hazard
                .fetch_reading(pool_type, lat, lng)
                .await
                .map_err(PipelineError::from)
        }
    });
    let feed = bundle.feed.clone();
    let symbols = bundle.feed_symbols.clone();
    let prices_fut = with_retry(&bundle.retry, cancel, move || {
        let feed = feed.clone();
        let symbols = symbols.clone();
        async move { feed.read_feeds(&symbols).await.map_err(PipelineError::from) }
    });
    let (reading, prices) = tokio::try_join!(reading_fut, prices_fut)?;

    let tier =
        parapet_pricing::evaluate(reading.value, record.trigger_value, record.coverage_amount);
    let now = bundle.clock.now();

    if !tier.pays_out() {
        info!(ratio = tier.ratio, "reading below trigger; nothing to settle");
        bundle
            .database
            .append_timeline_event(TimelineEvent::new(
                policy_id,
                TimelineEventKind::PayoutSkipped { ratio: tier.ratio },
                now,
            ))
            .await?;
        return Ok(ClaimOutcome {
            policy_id,
            reading,
            tier,
            prices,
            round: None,
            payout_tx: None,
            settled: false,
        });
    }

    let Some(signer) = bundle.signer.as_ref() else {
        info!("no signer configured; claim evaluated without settlement");
        return Ok(ClaimOutcome {
            policy_id,
            reading,
            tier,
            prices,
            round: None,
            payout_tx: None,
            settled: false,
        });
    };
    let ledger_policy_id = record.ledger_policy_id.ok_or_else(|| {
        ValidationError::Invalid(format!("policy {policy_id} was never minted on the ledger"))
    })?;

    let sources = bundle.hazard.attestation_sources(record.pool_type);
    let required = bundle.hazard.consensus_required(record.pool_type);
    let round_id = bundle
        .consensus
        .open_round(sources, required, record.lat, record.lng);
    let outcome = bundle.consensus.submit_round(&round_id).await?;
    let results = bundle.consensus.results(&round_id)?;

    // The round lands in the audit trail whether or not it reached
    // consensus.
    bundle
        .database
        .append_timeline_event(TimelineEvent::new(
            policy_id,
            TimelineEventKind::AttestationRound {
                round_id: round_id.clone(),
                confirmed: outcome.confirmed_count,
                required: outcome.required_count,
            },
            now,
        ))
        .await?;

    if !outcome.has_consensus {
        return Err(AttestationError::ConsensusNotReached {
            confirmed: outcome.confirmed_count,
            required: outcome.required_count,
        }
        .into());
    }

    let proof_handle = bundle.consensus.confirmed_proof(&round_id)?;
    let attestation = bundle.attestation.clone();
    let proof = with_retry(&bundle.retry, cancel, move || {
        let attestation = attestation.clone();
        let handle = proof_handle.clone();
        async move {
            attestation
                .relay_proof(&handle)
                .await
                .map_err(PipelineError::from)
        }
    })
    .await?;

    let receipt = bundle
        .ledger
        .trigger_payout(signer, ledger_policy_id, &proof, tier.payout_amount)
        .await?;
    bundle
        .database
        .append_timeline_event(TimelineEvent::new(
            policy_id,
            TimelineEventKind::PayoutTriggered {
                tx_handle: receipt.tx_handle.clone(),
                tier: tier.tier,
                amount: tier.payout_amount,
            },
            now,
        ))
        .await?;

    info!(
        tx_handle = %receipt.tx_handle,
        tier = %tier.tier,
        amount = %tier.payout_amount,
        round = %outcome,
        "payout settled"
    );
    Ok(ClaimOutcome {
        policy_id,
        reading,
        tier,
        prices,
        round: Some(RoundSummary {
            round_id,
            outcome,
            results,
        }),
        payout_tx: Some(receipt.tx_handle),
        settled: true,
    })
}
