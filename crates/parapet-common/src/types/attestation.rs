//! Attestation domain types
//!
//! Each pool is backed by a fixed set of independent attestation sources.
//! A claim opens a round: every source is asked to attest the hazard
//! reading, and the round reaches consensus once enough sources confirm.

use serde::{Deserialize, Serialize};
use std::fmt;

/// How a source's data is attested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttestationKind {
    /// Pull-based: fetch a public JSON API and extract one field
    JsonApi,
    /// Push-based: provider delivers a signed value on a keyed feed
    SignedFeed,
}

/// Static description of one attestation source for a pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttestationSourceConfig {
    /// Stable source identifier, e.g. "usgs-fdsn"
    pub source_name: String,

    /// Endpoint template; `{lat}`/`{lng}` are substituted per query
    pub endpoint: String,

    /// JSON pointer selecting the index value in the source's response
    pub extraction_rule: String,

    /// How the attested value is encoded for the ledger
    pub encoding_schema: String,

    /// Attestation mechanism for this source
    pub kind: AttestationKind,
}

impl AttestationSourceConfig {
    pub fn new(
        source_name: impl Into<String>,
        endpoint: impl Into<String>,
        extraction_rule: impl Into<String>,
        kind: AttestationKind,
    ) -> Self {
        Self {
            source_name: source_name.into(),
            endpoint: endpoint.into(),
            extraction_rule: extraction_rule.into(),
            encoding_schema: "uint256:value_x100".to_string(),
            kind,
        }
    }

    /// Override the ledger encoding schema.
    pub fn with_encoding_schema(mut self, schema: impl Into<String>) -> Self {
        self.encoding_schema = schema.into();
        self
    }

    /// Endpoint with `{lat}`/`{lng}` substituted.
    pub fn endpoint_for(&self, lat: f64, lng: f64) -> String {
        self.endpoint
            .replace("{lat}", &format!("{lat:.4}"))
            .replace("{lng}", &format!("{lng:.4}"))
    }
}

/// Lifecycle of one source within one round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttestationStatus {
    Pending,
    Submitting,
    Confirmed,
    Failed,
}

/// Outcome of one source's attestation within one round.
///
/// Owned and updated by the consensus engine; queries receive fresh copies
/// and a result is never carried across rounds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttestationResult {
    /// Source this result belongs to
    pub source_name: String,

    /// Where the source is in its submission lifecycle
    pub status: AttestationStatus,

    /// Opaque handle to the attestation proof, present once confirmed
    pub proof_handle: Option<String>,

    /// Failure detail, present once failed
    pub error: Option<String>,
}

impl AttestationResult {
    /// Fresh result for a source that has not been submitted yet.
    pub fn pending(source_name: impl Into<String>) -> Self {
        Self {
            source_name: source_name.into(),
            status: AttestationStatus::Pending,
            proof_handle: None,
            error: None,
        }
    }

    /// Confirmed result carrying its proof handle.
    pub fn confirmed(source_name: impl Into<String>, proof_handle: impl Into<String>) -> Self {
        Self {
            source_name: source_name.into(),
            status: AttestationStatus::Confirmed,
            proof_handle: Some(proof_handle.into()),
            error: None,
        }
    }

    /// Failed result carrying the source-local error.
    pub fn failed(source_name: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            source_name: source_name.into(),
            status: AttestationStatus::Failed,
            proof_handle: None,
            error: Some(error.into()),
        }
    }

    pub fn is_confirmed(&self) -> bool {
        self.status == AttestationStatus::Confirmed
    }
}

/// Consensus state of a round, derived from its result list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsensusOutcome {
    /// Sources confirmed so far
    pub confirmed_count: usize,

    /// Confirmations required for consensus
    pub required_count: usize,

    /// `confirmed_count >= required_count`
    pub has_consensus: bool,
}

impl ConsensusOutcome {
    /// Derive the outcome from a round's results.
    pub fn from_results(results: &[AttestationResult], required: usize) -> Self {
        let confirmed = results.iter().filter(|r| r.is_confirmed()).count();
        Self {
            confirmed_count: confirmed,
            required_count: required,
            has_consensus: confirmed >= required,
        }
    }
}

impl fmt::Display for ConsensusOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{} confirmed ({})",
            self.confirmed_count,
            self.required_count,
            if self.has_consensus { "consensus" } else { "no consensus" }
        )
    }
}

/// Proof bundle in the ledger's format, produced by relaying an attestation
/// proof across the bridge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerProof {
    /// Handle of the attestation proof this was relayed from
    pub attestation_handle: String,

    /// Ledger-side encoding of the attested value
    pub encoded: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_substitution() {
        let config = AttestationSourceConfig::new(
            "usgs-fdsn",
            "https://example.com/query?latitude={lat}&longitude={lng}",
            "/features/0/properties/mag",
            AttestationKind::JsonApi,
        );
        let url = config.endpoint_for(35.6812, 139.7671);
        assert_eq!(
            url,
            "https://example.com/query?latitude=35.6812&longitude=139.7671"
        );
    }

    #[test]
    fn test_consensus_outcome_threshold() {
        let results = vec![
            AttestationResult::confirmed("a", "proof-a"),
            AttestationResult::failed("b", "timeout"),
            AttestationResult::confirmed("c", "proof-c"),
        ];
        let outcome = ConsensusOutcome::from_results(&results, 2);
        assert_eq!(outcome.confirmed_count, 2);
        assert!(outcome.has_consensus);

        let outcome = ConsensusOutcome::from_results(&results, 3);
        assert!(!outcome.has_consensus);
    }

    #[test]
    fn test_pending_result_has_no_proof() {
        let result = AttestationResult::pending("a");
        assert_eq!(result.status, AttestationStatus::Pending);
        assert!(result.proof_handle.is_none());
        assert!(!result.is_confirmed());
    }
}
