//! # Parapet Common
//!
//! Shared types, error taxonomy, and cross-cutting services for the Parapet
//! parametric-coverage engine.
//!
//! ## Core Types
//!
//! - [`PoolType`]/[`HazardReading`]/[`HazardHistory`]: perils and their data
//! - [`AttestationSourceConfig`]/[`AttestationResult`]: multi-source rounds
//! - [`PremiumBreakdown`]: actuarial pricing output
//! - [`PayoutTier`]/[`PayoutTierResult`]: graded settlement
//! - [`PolicyRecord`]/[`TimelineEvent`]: persisted policy state
//!
//! ## Services
//!
//! - [`error`]: the closed seven-domain failure taxonomy
//! - [`retry`]: bounded linear backoff with cancellable waits
//! - [`clock`]: injectable time source

pub mod clock;
pub mod error;
pub mod retry;
pub mod types;

// Re-export commonly used types at crate root
pub use clock::{Clock, FixedClock, SystemClock};
pub use error::{
    AttestationError, BridgeError, FeedError, HazardDataError, LedgerError, PersistenceError,
    PipelineError, Result, ValidationError,
};
pub use retry::{with_retry, CancelSource, CancelToken, RetryPolicy};
pub use types::{
    attestation::{
        AttestationKind, AttestationResult, AttestationSourceConfig, AttestationStatus,
        ConsensusOutcome, LedgerProof,
    },
    feed::{FeedValue, PoolStats, PriceSnapshot},
    hazard::{BasisRisk, HazardEvent, HazardHistory, HazardReading, PoolType},
    payout::{PayoutTier, PayoutTierResult},
    policy::{NewPolicy, PolicyRecord, PolicyStatus, TimelineEvent, TimelineEventKind},
    premium::{Confidence, PremiumBreakdown},
};

/// Parapet version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Largest coverage a single policy may carry, in pool currency units
pub const MAX_COVERAGE_UNITS: u64 = 10_000_000;

/// Attestable sources needed for low basis risk
pub const LOW_BASIS_RISK_SOURCES: usize = 3;

/// Attestable sources needed for medium basis risk
pub const MEDIUM_BASIS_RISK_SOURCES: usize = 2;
