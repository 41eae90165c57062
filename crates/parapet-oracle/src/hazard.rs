//! Hazard data service
//!
//! `HazardDataService` is the seam between pipelines and the outside
//! world's hazard feeds. `SimulatedHazardData` is the offline
//! implementation: deterministic location-seeded readings plus the
//! catalog's pricing histories.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

use parapet_common::{
    AttestationSourceConfig, Clock, HazardDataError, HazardHistory, HazardReading, PoolType,
};

use crate::catalog::HazardCatalog;

/// Consensus count assumed for pools the catalog does not know.
pub const DEFAULT_CONSENSUS_REQUIRED: usize = 2;

/// Access to hazard readings, pricing histories, and attestation wiring.
#[async_trait]
pub trait HazardDataService: Send + Sync {
    /// Current peril index at a location.
    async fn fetch_reading(
        &self,
        pool_type: PoolType,
        lat: f64,
        lng: f64,
    ) -> Result<HazardReading, HazardDataError>;

    /// Multi-year event series used for pricing.
    async fn fetch_history(
        &self,
        pool_type: PoolType,
        lat: f64,
        lng: f64,
    ) -> Result<HazardHistory, HazardDataError>;

    /// Sources able to attest this peril.
    fn attestation_sources(&self, pool_type: PoolType) -> Vec<AttestationSourceConfig>;

    /// Confirmations required before a payout may settle.
    fn consensus_required(&self, pool_type: PoolType) -> usize;
}

/// Offline hazard service.
///
/// Readings are synthesized from a location-seeded generator, so the same
/// coordinates always reproduce the same value; they are always flagged
/// simulated. Histories come straight from the catalog.
pub struct SimulatedHazardData {
    clock: Arc<dyn Clock>,
    catalog: &'static HazardCatalog,
    reading_overrides: DashMap<PoolType, f64>,
}

impl SimulatedHazardData {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            catalog: HazardCatalog::global(),
            reading_overrides: DashMap::new(),
        }
    }

    /// Pin the reading for one pool; later fetches return exactly `value`.
    pub fn with_reading(self, pool_type: PoolType, value: f64) -> Self {
        self.reading_overrides.insert(pool_type, value);
        self
    }

    /// Pin or re-pin a reading after construction.
    pub fn set_reading(&self, pool_type: PoolType, value: f64) {
        self.reading_overrides.insert(pool_type, value);
    }

    fn synthesize_value(pool_type: PoolType, lat: f64, lng: f64) -> f64 {
        let mut rng = SmallRng::seed_from_u64(location_seed(pool_type, lat, lng));
        let r: f64 = rng.gen();
        match pool_type {
            PoolType::Earthquake => 2.0 + r * 4.5,
            PoolType::Flood => 0.5 + r * 4.5,
            PoolType::Hurricane => 40.0 + r * 180.0,
            PoolType::Drought => r * 60.0,
            PoolType::Wildfire => 5.0 + r * 30.0,
        }
    }
}

#[async_trait]
impl HazardDataService for SimulatedHazardData {
    async fn fetch_reading(
        &self,
        pool_type: PoolType,
        lat: f64,
        lng: f64,
    ) -> Result<HazardReading, HazardDataError> {
        if self.catalog.entry(pool_type).is_none() {
            return Err(HazardDataError::UnsupportedPool {
                pool: pool_type.to_string(),
            });
        }

        let value = match self.reading_overrides.get(&pool_type) {
            Some(pinned) => *pinned,
            None => Self::synthesize_value(pool_type, lat, lng),
        };

        let mut rng = SmallRng::seed_from_u64(location_seed(pool_type, lat, lng) ^ 0xc0ff_ee00);
        let confidence = 70 + rng.gen_range(0..25u8);

        debug!(pool = %pool_type, lat, lng, value, "synthesized hazard reading");

        Ok(HazardReading {
            pool_type,
            lat,
            lng,
            value,
            unit: pool_type.unit().to_string(),
            source: "simulator".to_string(),
            confidence,
            timestamp: self.clock.now(),
            is_simulated: true,
        })
    }

    async fn fetch_history(
        &self,
        pool_type: PoolType,
        _lat: f64,
        _lng: f64,
    ) -> Result<HazardHistory, HazardDataError> {
        // Histories are per peril; regional catalogs would refine this
        // behind the same interface.
        self.catalog
            .entry(pool_type)
            .map(|entry| entry.history())
            .ok_or_else(|| HazardDataError::UnsupportedPool {
                pool: pool_type.to_string(),
            })
    }

    fn attestation_sources(&self, pool_type: PoolType) -> Vec<AttestationSourceConfig> {
        self.catalog
            .entry(pool_type)
            .map(|entry| entry.sources.clone())
            .unwrap_or_default()
    }

    fn consensus_required(&self, pool_type: PoolType) -> usize {
        self.catalog
            .entry(pool_type)
            .map(|entry| entry.consensus_required)
            .unwrap_or(DEFAULT_CONSENSUS_REQUIRED)
    }
}

/// Stable seed from peril and coordinates.
fn location_seed(pool_type: PoolType, lat: f64, lng: f64) -> u64 {
    let mut hasher = blake3::Hasher::new();
    hasher.update(pool_type.as_str().as_bytes());
    hasher.update(&lat.to_bits().to_le_bytes());
    hasher.update(&lng.to_bits().to_le_bytes());
    let digest = hasher.finalize();
    let mut seed = [0u8; 8];
    seed.copy_from_slice(&digest.as_bytes()[..8]);
    u64::from_le_bytes(seed)
}
