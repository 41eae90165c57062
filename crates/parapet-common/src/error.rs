//! Error taxonomy for the Parapet engine
//!
//! A closed set of seven failure domains. Every pipeline step returns one
//! of these; the HTTP boundary matches the outer tag exhaustively, so no
//! collaborator failure ever escapes untyped.

use thiserror::Error;

/// Result type alias using PipelineError
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Unified error type for Parapet pipelines
#[derive(Debug, Error)]
pub enum PipelineError {
    // Price feed errors
    #[error("Feed error: {0}")]
    Feed(#[from] FeedError),

    // Attestation errors
    #[error("Attestation error: {0}")]
    Attestation(#[from] AttestationError),

    // Ledger errors
    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),

    // Hazard data errors
    #[error("Hazard data error: {0}")]
    HazardData(#[from] HazardDataError),

    // Persistence errors
    #[error("Persistence error: {0}")]
    Persistence(#[from] PersistenceError),

    // Input validation errors
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    // Proof relay errors
    #[error("Bridge error: {0}")]
    Bridge(#[from] BridgeError),
}

impl PipelineError {
    /// Stable tag for logging and HTTP error bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            PipelineError::Feed(_) => "feed",
            PipelineError::Attestation(_) => "attestation",
            PipelineError::Ledger(_) => "ledger",
            PipelineError::HazardData(_) => "hazard_data",
            PipelineError::Persistence(_) => "persistence",
            PipelineError::Validation(_) => "validation",
            PipelineError::Bridge(_) => "bridge",
        }
    }

    /// Default retryability: transient collaborator failures only.
    ///
    /// Validation never retries. Ledger writes are not idempotent, so only
    /// the read path counts as transient. A failed consensus is a decision,
    /// not an outage. For the store, only unavailability is transient: not
    /// found and duplicate are authoritative answers, and a failure after
    /// a ledger write must be surfaced, not re-driven.
    pub fn is_transient(&self) -> bool {
        match self {
            PipelineError::Validation(_) => false,
            PipelineError::Attestation(AttestationError::ConsensusNotReached { .. }) => false,
            PipelineError::Ledger(e) => e.is_read_failure(),
            PipelineError::Persistence(e) => matches!(e, PersistenceError::Unavailable(_)),
            _ => true,
        }
    }
}

/// Price feed failures
#[derive(Debug, Error)]
pub enum FeedError {
    #[error("Symbol not configured: {symbol}")]
    UnknownSymbol { symbol: String },

    #[error("Feed unavailable: {0}")]
    Unavailable(String),

    #[error("Malformed feed response: {0}")]
    Malformed(String),
}

/// Hazard data source failures
#[derive(Debug, Error)]
pub enum HazardDataError {
    #[error("No hazard coverage for pool: {pool}")]
    UnsupportedPool { pool: String },

    // `r#` keeps thiserror from treating the field as the std `source()` cause.
    #[error("Source {source} unavailable: {reason}")]
    SourceUnavailable { r#source: String, reason: String },

    #[error("Source {source} returned a malformed response: {reason}")]
    MalformedResponse { r#source: String, reason: String },

    #[error("Extraction rule {pointer} matched nothing in {source} response")]
    ExtractionFailed { r#source: String, pointer: String },

    #[error("All {attempted} sources failed for pool {pool}")]
    AllSourcesFailed { pool: String, attempted: usize },
}

/// Attestation network failures
#[derive(Debug, Error)]
pub enum AttestationError {
    // `r#` keeps thiserror from treating the field as the std `source()` cause.
    #[error("Submission to {source} failed: {reason}")]
    SubmissionFailed { r#source: String, reason: String },

    #[error("Source {source} rejected the request: {reason}")]
    SourceRejected { r#source: String, reason: String },

    #[error("Consensus not reached: {confirmed} of {required} sources confirmed")]
    ConsensusNotReached { confirmed: usize, required: usize },

    #[error("Attestation round not found: {round_id}")]
    RoundNotFound { round_id: String },
}

/// Proof relay failures between the attestation network and the ledger
#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("No proof found for handle {handle}")]
    UnknownProof { handle: String },

    #[error("Proof relay failed: {0}")]
    RelayFailed(String),

    #[error("Could not encode proof for schema {schema}: {reason}")]
    EncodingFailed { schema: String, reason: String },
}

/// Ledger failures, split by read and write path
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("Ledger read failed: {0}")]
    ReadFailed(String),

    #[error("Policy {policy_id} not found on ledger")]
    PolicyNotFound { policy_id: u64 },

    #[error("Write requires a signer")]
    SignerRequired,

    #[error("Ledger submission failed: {0}")]
    SubmissionFailed(String),

    #[error("Pool balance {available} cannot cover payout {requested}")]
    InsufficientPoolBalance { requested: String, available: String },

    #[error("Policy {policy_id} was already paid out")]
    AlreadyPaidOut { policy_id: u64 },
}

impl LedgerError {
    /// True for the read path, which is safe to retry.
    pub fn is_read_failure(&self) -> bool {
        matches!(
            self,
            LedgerError::ReadFailed(_) | LedgerError::PolicyNotFound { .. }
        )
    }
}

/// Persistence store failures
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("Duplicate record: {id}")]
    Duplicate { id: String },

    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Policy minted on ledger (tx {tx_handle}) but not recorded: {reason}")]
    AfterLedgerWrite { tx_handle: String, reason: String },
}

/// Input validation failures, raised before any collaborator call
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Coverage amount must be positive")]
    NonPositiveCoverage,

    #[error("Coverage amount {amount} exceeds the {limit} maximum")]
    CoverageTooLarge { amount: String, limit: String },

    #[error("Premium amount must be positive")]
    NonPositivePremium,

    #[error("Trigger value must be finite")]
    NonFiniteTrigger,

    #[error("Latitude {lat} outside [-90, 90]")]
    LatOutOfRange { lat: f64 },

    #[error("Longitude {lng} outside [-180, 180]")]
    LngOutOfRange { lng: f64 },

    #[error("Unknown pool type: {value}")]
    UnknownPoolType { value: String },

    #[error("{0}")]
    Invalid(String),
}
