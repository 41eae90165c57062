//! Attestation service
//!
//! One `submit` call asks one source to attest the peril index at a
//! location and yields an opaque proof handle. `relay_proof` carries a
//! confirmed proof across the bridge into the ledger's encoding. Failures
//! stay per source; the consensus engine decides what they add up to.

use std::collections::HashSet;

use async_trait::async_trait;
use dashmap::DashMap;
use futures::future::join_all;
use tracing::debug;

use parapet_common::{
    AttestationError, AttestationResult, AttestationSourceConfig, BridgeError, LedgerProof,
};

/// Submission and proof relay against the attestation network.
#[async_trait]
pub trait AttestationService: Send + Sync {
    /// Ask `source` to attest the index at a location; returns the proof
    /// handle on confirmation.
    async fn submit(
        &self,
        source: &AttestationSourceConfig,
        lat: f64,
        lng: f64,
    ) -> Result<String, AttestationError>;

    /// Submit every source in parallel. Failures stay per source: each
    /// comes back as its own failed result and never aborts the rest.
    async fn submit_many(
        &self,
        sources: &[AttestationSourceConfig],
        lat: f64,
        lng: f64,
    ) -> Vec<AttestationResult> {
        let submissions = sources.iter().map(|source| async move {
            match self.submit(source, lat, lng).await {
                Ok(handle) => AttestationResult::confirmed(source.source_name.clone(), handle),
                Err(err) => AttestationResult::failed(source.source_name.clone(), err.to_string()),
            }
        });
        join_all(submissions).await
    }

    /// Re-encode a confirmed proof for the ledger.
    async fn relay_proof(&self, handle: &str) -> Result<LedgerProof, BridgeError>;
}

/// Deterministic offline attestation.
///
/// Proof handles are content hashes of the source config and query, so the
/// same round always reproduces the same handles. Sources listed as
/// failing simulate an outage on every submission.
#[derive(Default)]
pub struct SimulatedAttestationService {
    failing: HashSet<String>,
    proofs: DashMap<String, String>,
}

impl SimulatedAttestationService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate a permanent outage for one source.
    pub fn with_failing_source(mut self, source_name: impl Into<String>) -> Self {
        self.failing.insert(source_name.into());
        self
    }

    fn proof_handle(source: &AttestationSourceConfig, lat: f64, lng: f64) -> String {
        let mut hasher = blake3::Hasher::new();
        hasher.update(source.source_name.as_bytes());
        hasher.update(source.endpoint_for(lat, lng).as_bytes());
        hasher.update(source.extraction_rule.as_bytes());
        hex::encode(hasher.finalize().as_bytes())
    }
}

#[async_trait]
impl AttestationService for SimulatedAttestationService {
    async fn submit(
        &self,
        source: &AttestationSourceConfig,
        lat: f64,
        lng: f64,
    ) -> Result<String, AttestationError> {
        if self.failing.contains(&source.source_name) {
            return Err(AttestationError::SubmissionFailed {
                source: source.source_name.clone(),
                reason: "simulated outage".to_string(),
            });
        }

        let handle = Self::proof_handle(source, lat, lng);
        self.proofs.insert(
            handle.clone(),
            format!("{}|{}", source.encoding_schema, source.source_name),
        );
        debug!(source = %source.source_name, handle = %handle, "attestation confirmed");
        Ok(handle)
    }

    async fn relay_proof(&self, handle: &str) -> Result<LedgerProof, BridgeError> {
        let encoded = self
            .proofs
            .get(handle)
            .map(|entry| entry.clone())
            .ok_or_else(|| BridgeError::UnknownProof {
                handle: handle.to_string(),
            })?;
        Ok(LedgerProof {
            attestation_handle: handle.to_string(),
            encoded,
        })
    }
}
