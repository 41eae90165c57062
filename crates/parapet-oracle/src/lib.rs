//! # Parapet Oracle
//!
//! Everything that knows about the outside world's hazard data:
//!
//! - [`catalog`]: static per-pool sources, consensus counts, and pricing
//!   histories
//! - [`hazard`]: the `HazardDataService` seam plus the deterministic
//!   simulated implementation
//! - [`http`]: live adapter over the catalog's public JSON APIs
//! - [`attest`]: attestation submission and proof relay
//! - [`consensus`]: parallel multi-source rounds and the consensus rule

pub mod attest;
pub mod catalog;
pub mod consensus;
pub mod hazard;
pub mod http;

pub use attest::{AttestationService, SimulatedAttestationService};
pub use catalog::{CatalogEntry, HazardCatalog, HistorySpec};
pub use consensus::{ConsensusConfig, ConsensusEngine};
pub use hazard::{HazardDataService, SimulatedHazardData, DEFAULT_CONSENSUS_REQUIRED};
pub use http::{extract_value, HttpHazardConfig, HttpHazardData};
