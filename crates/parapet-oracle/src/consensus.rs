//! Multi-source consensus engine
//!
//! A round asks every configured source to attest independently and in
//! parallel; one source failing never aborts the rest. Consensus holds
//! once the confirmed count reaches the round's requirement. Re-submitting
//! a round only touches sources that have not confirmed yet.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use futures::future::join_all;
use tracing::{info, instrument};
use uuid::Uuid;

use parapet_common::{
    AttestationError, AttestationResult, AttestationSourceConfig, AttestationStatus,
    ConsensusOutcome,
};

use crate::attest::AttestationService;

/// Consensus engine settings.
#[derive(Debug, Clone)]
pub struct ConsensusConfig {
    /// Per-source submission deadline
    pub submission_timeout: Duration,
}

impl Default for ConsensusConfig {
    fn default() -> Self {
        Self {
            submission_timeout: Duration::from_secs(10),
        }
    }
}

struct Round {
    lat: f64,
    lng: f64,
    required: usize,
    sources: Vec<AttestationSourceConfig>,
    results: Vec<AttestationResult>,
}

/// Runs attestation rounds over an `AttestationService`.
pub struct ConsensusEngine {
    service: Arc<dyn AttestationService>,
    config: ConsensusConfig,
    rounds: DashMap<String, Round>,
}

impl ConsensusEngine {
    pub fn new(service: Arc<dyn AttestationService>) -> Self {
        Self::with_config(service, ConsensusConfig::default())
    }

    pub fn with_config(service: Arc<dyn AttestationService>, config: ConsensusConfig) -> Self {
        Self {
            service,
            config,
            rounds: DashMap::new(),
        }
    }

    /// Open a round over `sources` with a consensus requirement. Every
    /// source starts pending; nothing is submitted yet.
    #[instrument(skip(self, sources))]
    pub fn open_round(
        &self,
        sources: Vec<AttestationSourceConfig>,
        required: usize,
        lat: f64,
        lng: f64,
    ) -> String {
        let round_id = Uuid::now_v7().to_string();
        let results = sources
            .iter()
            .map(|s| AttestationResult::pending(s.source_name.clone()))
            .collect();
        self.rounds.insert(
            round_id.clone(),
            Round {
                lat,
                lng,
                required,
                sources,
                results,
            },
        );
        info!(round_id = %round_id, required, "opened attestation round");
        round_id
    }

    /// Submit every non-confirmed source in parallel and fold the results
    /// into the round. Already-confirmed sources are left untouched, so a
    /// second call is a no-op for them.
    #[instrument(skip(self))]
    pub async fn submit_round(&self, round_id: &str) -> Result<ConsensusOutcome, AttestationError> {
        // Snapshot outside the map: guards must not be held across awaits.
        let (pending, lat, lng) = {
            let mut round = self
                .rounds
                .get_mut(round_id)
                .ok_or_else(|| AttestationError::RoundNotFound {
                    round_id: round_id.to_string(),
                })?;
            let lat = round.lat;
            let lng = round.lng;
            let mut pending = Vec::new();
            for idx in 0..round.results.len() {
                if !round.results[idx].is_confirmed() {
                    round.results[idx].status = AttestationStatus::Submitting;
                    pending.push((idx, round.sources[idx].clone()));
                }
            }
            (pending, lat, lng)
        };

        let timeout = self.config.submission_timeout;
        let submissions = pending.into_iter().map(|(idx, source)| {
            let service = self.service.clone();
            async move {
                let outcome = tokio::time::timeout(timeout, service.submit(&source, lat, lng)).await;
                let result = match outcome {
                    Ok(Ok(handle)) => AttestationResult::confirmed(source.source_name.clone(), handle),
                    Ok(Err(err)) => AttestationResult::failed(source.source_name.clone(), err.to_string()),
                    Err(_) => AttestationResult::failed(
                        source.source_name.clone(),
                        format!("submission timed out after {}ms", timeout.as_millis()),
                    ),
                };
                (idx, result)
            }
        });
        let settled = join_all(submissions).await;

        let mut round = self
            .rounds
            .get_mut(round_id)
            .ok_or_else(|| AttestationError::RoundNotFound {
                round_id: round_id.to_string(),
            })?;
        for (idx, result) in settled {
            round.results[idx] = result;
        }
        let outcome = ConsensusOutcome::from_results(&round.results, round.required);
        info!(
            round_id = %round_id,
            confirmed = outcome.confirmed_count,
            required = outcome.required_count,
            has_consensus = outcome.has_consensus,
            "attestation round settled"
        );
        Ok(outcome)
    }

    /// Fresh copy of the round's per-source results.
    pub fn results(&self, round_id: &str) -> Result<Vec<AttestationResult>, AttestationError> {
        self.rounds
            .get(round_id)
            .map(|round| round.results.clone())
            .ok_or_else(|| AttestationError::RoundNotFound {
                round_id: round_id.to_string(),
            })
    }

    /// Current consensus state of the round.
    pub fn outcome(&self, round_id: &str) -> Result<ConsensusOutcome, AttestationError> {
        self.rounds
            .get(round_id)
            .map(|round| ConsensusOutcome::from_results(&round.results, round.required))
            .ok_or_else(|| AttestationError::RoundNotFound {
                round_id: round_id.to_string(),
            })
    }

    /// Proof handle of the first confirmed source, for relaying to the
    /// ledger. Fails while the round lacks any confirmation.
    pub fn confirmed_proof(&self, round_id: &str) -> Result<String, AttestationError> {
        let round = self
            .rounds
            .get(round_id)
            .ok_or_else(|| AttestationError::RoundNotFound {
                round_id: round_id.to_string(),
            })?;
        round
            .results
            .iter()
            .find_map(|r| r.proof_handle.clone())
            .ok_or_else(|| AttestationError::ConsensusNotReached {
                confirmed: 0,
                required: round.required,
            })
    }
}
