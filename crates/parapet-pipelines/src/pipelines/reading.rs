//! Current-reading pipeline.

use serde::Serialize;
use tracing::instrument;

use parapet_common::{
    with_retry, BasisRisk, CancelToken, HazardReading, PipelineError, PoolType, Result,
};

use crate::services::ServiceBundle;

use super::validate_location;

/// A live reading plus the attestation context a claim against it would have.
#[derive(Debug, Clone, Serialize)]
pub struct ClassifiedReading {
    pub reading: HazardReading,
    /// How well the payout index tracks actual loss at this location.
    pub basis_risk: BasisRisk,
    /// Sources that could attest this reading.
    pub attestable_sources: usize,
    /// Confirmations a payout would need.
    pub consensus_required: usize,
}

/// Fetches the current index value and classifies its attestation context.
///
/// The fetch retries per the bundle policy; source classification is local
/// catalog data and cannot fail.
#[instrument(skip(bundle, cancel))]
pub async fn read_and_classify(
    bundle: &ServiceBundle,
    cancel: &CancelToken,
    pool_type: PoolType,
    lat: f64,
    lng: f64,
) -> Result<ClassifiedReading> {
    validate_location(lat, lng)?;

    let hazard = bundle.hazard.clone();
    let reading = with_retry(&bundle.retry, cancel, move || {
        let hazard = hazard.clone();
        async move {
            hazard
                .fetch_reading(pool_type, lat, lng)
                .await
                .map_err(PipelineError::from)
        }
    })
    .await?;

    let attestable_sources = bundle.hazard.attestation_sources(pool_type).len();
    Ok(ClassifiedReading {
        reading,
        basis_risk: BasisRisk::from_source_count(attestable_sources),
        attestable_sources,
        consensus_required: bundle.hazard.consensus_required(pool_type),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::ServiceBundle;
    use parapet_common::ValidationError;
    use parapet_oracle::hazard::SimulatedHazardData;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_reading_carries_attestation_context() {
        let bundle = ServiceBundle::in_memory();
        let out = read_and_classify(
            &bundle,
            &CancelToken::disarmed(),
            PoolType::Earthquake,
            35.68,
            139.76,
        )
        .await
        .unwrap();

        assert_eq!(out.reading.pool_type, PoolType::Earthquake);
        assert!(out.reading.is_simulated);
        assert_eq!(out.attestable_sources, 3);
        assert_eq!(out.consensus_required, 2);
        assert_eq!(out.basis_risk, BasisRisk::Low);
    }

    #[tokio::test]
    async fn test_single_source_pool_is_high_basis_risk() {
        let bundle = ServiceBundle::in_memory();
        let out = read_and_classify(
            &bundle,
            &CancelToken::disarmed(),
            PoolType::Wildfire,
            -33.86,
            151.2,
        )
        .await
        .unwrap();

        assert_eq!(out.attestable_sources, 1);
        assert_eq!(out.basis_risk, BasisRisk::High);
    }

    #[tokio::test]
    async fn test_pinned_reading_flows_through() {
        let hazard = SimulatedHazardData::new(ServiceBundle::in_memory().clock.clone())
            .with_reading(PoolType::Flood, 4.2);
        let bundle = ServiceBundle::in_memory().with_hazard(Arc::new(hazard));

        let out = read_and_classify(&bundle, &CancelToken::disarmed(), PoolType::Flood, 51.5, -0.12)
            .await
            .unwrap();
        assert_eq!(out.reading.value, 4.2);
    }

    #[tokio::test]
    async fn test_out_of_range_location_rejected() {
        let bundle = ServiceBundle::in_memory();
        let err = read_and_classify(&bundle, &CancelToken::disarmed(), PoolType::Flood, 95.0, 0.0)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            PipelineError::Validation(ValidationError::LatOutOfRange { .. })
        ));
    }
}
