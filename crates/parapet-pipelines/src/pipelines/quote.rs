//! Quote and backtest pipelines.
//!
//! Both share one shape: validate the request, fetch the pool's event
//! history, then hand off to the pure pricing crate. A quote prices
//! forward; a backtest replays the trigger against the same history so a
//! buyer can see what the coverage would have done.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use parapet_common::{
    with_retry, BasisRisk, CancelToken, PipelineError, PoolType, PremiumBreakdown, Result,
};
use parapet_pricing::{BacktestReport, PayoutPreviewRow, PricingEngine};

use crate::services::ServiceBundle;

use super::{validate_coverage, validate_location, validate_trigger};

/// Parameters shared by quote and backtest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuoteRequest {
    pub pool_type: PoolType,
    pub lat: f64,
    pub lng: f64,
    /// Index value at which payouts start, in the pool's unit.
    pub trigger_value: f64,
    pub coverage_amount: Decimal,
}

impl QuoteRequest {
    fn validate(&self) -> Result<()> {
        validate_location(self.lat, self.lng)?;
        validate_trigger(self.trigger_value)?;
        validate_coverage(self.coverage_amount)?;
        Ok(())
    }
}

/// A priced offer.
#[derive(Debug, Clone, Serialize)]
pub struct Quote {
    pub breakdown: PremiumBreakdown,
    /// What each tier would pay at this coverage.
    pub payout_preview: Vec<PayoutPreviewRow>,
    pub basis_risk: BasisRisk,
    pub trigger_unit: String,
}

/// Prices coverage from the pool's event history.
#[instrument(skip(bundle, cancel, request), fields(pool = %request.pool_type))]
pub async fn quote(
    bundle: &ServiceBundle,
    cancel: &CancelToken,
    request: &QuoteRequest,
) -> Result<Quote> {
    request.validate()?;

    let history = fetch_history(bundle, cancel, request).await?;
    let breakdown = PricingEngine::new().price(&history, request.trigger_value, request.coverage_amount);
    let sources = bundle.hazard.attestation_sources(request.pool_type).len();

    Ok(Quote {
        breakdown,
        payout_preview: parapet_pricing::preview(request.coverage_amount),
        basis_risk: BasisRisk::from_source_count(sources),
        trigger_unit: request.pool_type.unit().to_string(),
    })
}

/// A historical replay of the trigger, with the forward price alongside.
#[derive(Debug, Clone, Serialize)]
pub struct BacktestOutcome {
    pub report: BacktestReport,
    pub breakdown: PremiumBreakdown,
}

/// Replays the trigger year by year against the same history a quote
/// would price from.
#[instrument(skip(bundle, cancel, request), fields(pool = %request.pool_type))]
pub async fn backtest(
    bundle: &ServiceBundle,
    cancel: &CancelToken,
    request: &QuoteRequest,
) -> Result<BacktestOutcome> {
    request.validate()?;

    let history = fetch_history(bundle, cancel, request).await?;
    let report = parapet_pricing::backtest::run(&history, request.trigger_value);
    let breakdown = PricingEngine::new().price(&history, request.trigger_value, request.coverage_amount);

    Ok(BacktestOutcome { report, breakdown })
}

async fn fetch_history(
    bundle: &ServiceBundle,
    cancel: &CancelToken,
    request: &QuoteRequest,
) -> Result<parapet_common::HazardHistory> {
    let hazard = bundle.hazard.clone();
    let (pool_type, lat, lng) = (request.pool_type, request.lat, request.lng);
    with_retry(&bundle.retry, cancel, move || {
        let hazard = hazard.clone();
        async move {
            hazard
                .fetch_history(pool_type, lat, lng)
                .await
                .map_err(PipelineError::from)
        }
    })
    .await
}
