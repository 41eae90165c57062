//! Collaborator contracts and the bundle that wires them together.
//!
//! Each collaborator sits behind a trait object so pipelines never name a
//! concrete backend. The [`ServiceBundle`] is cheap to clone; every field
//! is shared.

pub mod database;
pub mod feed;
pub mod ledger;

pub use database::{DatabaseService, InMemoryDatabase};
pub use feed::{PriceFeedService, StaticPriceFeed};
pub use ledger::{
    InMemoryLedger, LedgerMetrics, LedgerPolicy, LedgerService, MintReceipt, PayoutReceipt, Signer,
};

use std::sync::Arc;

use rust_decimal_macros::dec;

use parapet_common::{Clock, RetryPolicy, SystemClock};
use parapet_oracle::attest::{AttestationService, SimulatedAttestationService};
use parapet_oracle::consensus::ConsensusEngine;
use parapet_oracle::hazard::{HazardDataService, SimulatedHazardData};

use crate::config::EngineConfig;

/// Everything the pipelines need, wired once at startup.
#[derive(Clone)]
pub struct ServiceBundle {
    pub feed: Arc<dyn PriceFeedService>,
    pub hazard: Arc<dyn HazardDataService>,
    pub attestation: Arc<dyn AttestationService>,
    pub consensus: Arc<ConsensusEngine>,
    pub ledger: Arc<dyn LedgerService>,
    pub database: Arc<dyn DatabaseService>,
    pub clock: Arc<dyn Clock>,
    pub retry: RetryPolicy,
    /// Present when this deployment may write to the ledger.
    pub signer: Option<Signer>,
    /// Symbols captured by price snapshots and claim settlements.
    pub feed_symbols: Vec<String>,
}

impl ServiceBundle {
    /// Fully in-memory bundle: simulated hazard data, simulated
    /// attestations, an in-memory ledger and store, and a static feed
    /// quoting FLR/USD. This is the default wiring for local runs and
    /// the integration suite.
    pub fn in_memory() -> Self {
        Self::in_memory_with_config(&EngineConfig::default())
    }

    pub fn in_memory_with_config(config: &EngineConfig) -> Self {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let attestation: Arc<dyn AttestationService> =
            Arc::new(SimulatedAttestationService::default());
        let feed = StaticPriceFeed::new(clock.clone()).with_price("FLR/USD", dec!(0.025));
        let signer = if config.signer_account.trim().is_empty() {
            None
        } else {
            Some(Signer::new(&config.signer_account))
        };

        Self {
            feed: Arc::new(feed),
            hazard: Arc::new(SimulatedHazardData::new(clock.clone())),
            attestation: attestation.clone(),
            consensus: Arc::new(ConsensusEngine::new(attestation.clone())),
            ledger: Arc::new(InMemoryLedger::new()),
            database: Arc::new(InMemoryDatabase::new()),
            clock,
            retry: config.retry_policy(),
            signer,
            feed_symbols: config.feed_symbols.clone(),
        }
    }

    pub fn with_feed(mut self, feed: Arc<dyn PriceFeedService>) -> Self {
        self.feed = feed;
        self
    }

    pub fn with_hazard(mut self, hazard: Arc<dyn HazardDataService>) -> Self {
        self.hazard = hazard;
        self
    }

    /// Swap the attestation backend. The consensus engine submits through
    /// it, so both fields move together.
    pub fn with_attestation(mut self, attestation: Arc<dyn AttestationService>) -> Self {
        self.consensus = Arc::new(ConsensusEngine::new(attestation.clone()));
        self.attestation = attestation;
        self
    }

    pub fn with_ledger(mut self, ledger: Arc<dyn LedgerService>) -> Self {
        self.ledger = ledger;
        self
    }

    pub fn with_database(mut self, database: Arc<dyn DatabaseService>) -> Self {
        self.database = database;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_signer(mut self, signer: Signer) -> Self {
        self.signer = Some(signer);
        self
    }

    /// A bundle that cannot write to the ledger. Mint and claim pipelines
    /// degrade to their store-only behavior.
    pub fn without_signer(mut self) -> Self {
        self.signer = None;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_memory_bundle_carries_signer_and_symbols() {
        let bundle = ServiceBundle::in_memory();
        assert!(bundle.signer.is_some());
        assert_eq!(bundle.feed_symbols, vec!["FLR/USD".to_string()]);
    }

    #[test]
    fn test_without_signer() {
        let bundle = ServiceBundle::in_memory().without_signer();
        assert!(bundle.signer.is_none());
    }

    #[test]
    fn test_bundle_clone_shares_backends() {
        let bundle = ServiceBundle::in_memory();
        let clone = bundle.clone();
        assert!(Arc::ptr_eq(&bundle.consensus, &clone.consensus));
    }
}
