//! Composition pipelines.
//!
//! Each pipeline is a free async function over a [`ServiceBundle`]: validate
//! first, then call collaborators, retrying only what the retry policy says
//! is transient. Ledger writes are issued exactly once and never wrapped in
//! a retry.
//!
//! [`ServiceBundle`]: crate::services::ServiceBundle

pub mod claim;
pub mod mint;
pub mod prices;
pub mod quote;
pub mod reading;
pub mod stats;

pub use claim::{trigger_payout, ClaimOutcome, RoundSummary};
pub use mint::{validate_and_mint, MintOutcome, MintRequest};
pub use prices::{current_prices, price_history, snapshot_prices};
pub use quote::{backtest, quote, BacktestOutcome, Quote, QuoteRequest};
pub use reading::{read_and_classify, ClassifiedReading};
pub use stats::{aggregate_pool_stats, PoolReport};

use rust_decimal::Decimal;

use parapet_common::{NewPolicy, ValidationError, MAX_COVERAGE_UNITS};

pub(crate) fn validate_location(lat: f64, lng: f64) -> Result<(), ValidationError> {
    if !lat.is_finite() || !(-90.0..=90.0).contains(&lat) {
        return Err(ValidationError::LatOutOfRange { lat });
    }
    if !lng.is_finite() || !(-180.0..=180.0).contains(&lng) {
        return Err(ValidationError::LngOutOfRange { lng });
    }
    Ok(())
}

pub(crate) fn validate_trigger(trigger_value: f64) -> Result<(), ValidationError> {
    if !trigger_value.is_finite() {
        return Err(ValidationError::NonFiniteTrigger);
    }
    Ok(())
}

pub(crate) fn validate_coverage(coverage: Decimal) -> Result<(), ValidationError> {
    if coverage <= Decimal::ZERO {
        return Err(ValidationError::NonPositiveCoverage);
    }
    if coverage > Decimal::from(MAX_COVERAGE_UNITS) {
        return Err(ValidationError::CoverageTooLarge {
            amount: coverage.to_string(),
            limit: MAX_COVERAGE_UNITS.to_string(),
        });
    }
    Ok(())
}

/// Full policy input validation, run before any collaborator is touched.
pub(crate) fn validate_new_policy(new: &NewPolicy) -> Result<(), ValidationError> {
    validate_location(new.lat, new.lng)?;
    validate_trigger(new.trigger_value)?;
    validate_coverage(new.coverage_amount)?;
    if new.premium_amount <= Decimal::ZERO {
        return Err(ValidationError::NonPositivePremium);
    }
    Ok(())
}
