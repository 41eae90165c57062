//! Actuarial pricing engine
//!
//! Burn-cost pricing over a historical event series:
//! - frequency/severity decomposition of trigger-crossing events
//! - credibility-weighted volatility loading from per-year loss buckets
//! - fixed expense loading and a hard floor on the gross rate
//!
//! The engine is pure: same history, trigger, and coverage produce a
//! bit-identical breakdown.

use std::collections::BTreeMap;

use parapet_common::{Confidence, HazardHistory, PremiumBreakdown};
use rust_decimal::Decimal;
use tracing::debug;

/// Hard floor on the annual gross premium rate (0.5%).
pub const PREMIUM_RATE_FLOOR: f64 = 0.005;

/// Fixed operating-expense loading (15%).
pub const EXPENSE_LOADING: f64 = 0.15;

/// Bounds on the volatility loading.
pub const RISK_LOADING_MIN: f64 = 0.15;
pub const RISK_LOADING_MAX: f64 = 0.40;

/// Window length at which history earns full credibility.
pub const CREDIBILITY_FULL_YEARS: f64 = 20.0;

/// Mean severity assumed when no qualifying event exists.
pub const SEVERITY_FALLBACK: f64 = 0.5;

/// Tunable loadings and bounds; the defaults are the protocol values.
#[derive(Debug, Clone)]
pub struct PricingAssumptions {
    pub premium_rate_floor: f64,
    pub expense_loading: f64,
    pub risk_loading_min: f64,
    pub risk_loading_max: f64,
    pub credibility_full_years: f64,
    pub severity_fallback: f64,
}

impl Default for PricingAssumptions {
    fn default() -> Self {
        Self {
            premium_rate_floor: PREMIUM_RATE_FLOOR,
            expense_loading: EXPENSE_LOADING,
            risk_loading_min: RISK_LOADING_MIN,
            risk_loading_max: RISK_LOADING_MAX,
            credibility_full_years: CREDIBILITY_FULL_YEARS,
            severity_fallback: SEVERITY_FALLBACK,
        }
    }
}

/// Frequency/severity premium engine.
pub struct PricingEngine {
    assumptions: PricingAssumptions,
}

impl Default for PricingEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl PricingEngine {
    pub fn new() -> Self {
        Self {
            assumptions: PricingAssumptions::default(),
        }
    }

    pub fn with_assumptions(assumptions: PricingAssumptions) -> Self {
        Self { assumptions }
    }

    /// Price coverage against a trigger from a historical event series.
    ///
    /// Total over all inputs: an empty or event-free window prices at the
    /// floor with the severity fallback, never NaN.
    pub fn price(
        &self,
        history: &HazardHistory,
        trigger_value: f64,
        coverage_amount: Decimal,
    ) -> PremiumBreakdown {
        let a = &self.assumptions;
        let years = history.years_of_data.max(1);

        // Severity per qualifying event, bucketed by calendar year.
        let mut per_year: BTreeMap<u16, f64> = BTreeMap::new();
        let mut total_severity = 0.0;
        let mut event_count: u32 = 0;
        for event in history.events_at_or_above(trigger_value) {
            let severity = severity_of(event.value, trigger_value, a.severity_fallback);
            *per_year.entry(event.year).or_insert(0.0) += severity;
            total_severity += severity;
            event_count += 1;
        }

        let frequency = f64::from(event_count) / f64::from(years);
        let avg_severity = if event_count > 0 {
            total_severity / f64::from(event_count)
        } else {
            a.severity_fallback
        };
        let pure_premium_rate = frequency * avg_severity;

        // Volatility of annual losses over the whole window, zeros included.
        let mut buckets: Vec<f64> = per_year.values().copied().collect();
        buckets.resize(years as usize, 0.0);
        let mean = total_severity / f64::from(years);
        let risk_loading = if per_year.len() < 2 {
            a.risk_loading_max
        } else {
            let cv = population_stdev(&buckets, mean) / mean;
            let credibility = (f64::from(years) / a.credibility_full_years).sqrt().min(1.0);
            (cv * (1.0 - credibility * 0.5)).clamp(a.risk_loading_min, a.risk_loading_max)
        };

        let gross_premium_rate = (pure_premium_rate
            * (1.0 + risk_loading)
            * (1.0 + a.expense_loading))
            .max(a.premium_rate_floor);

        let premium_amount =
            coverage_amount * Decimal::try_from(gross_premium_rate).unwrap_or_default();

        debug!(
            pool = %history.pool_type,
            trigger = trigger_value,
            frequency,
            avg_severity,
            gross_premium_rate,
            "priced coverage"
        );

        PremiumBreakdown {
            frequency,
            severity: avg_severity,
            pure_premium_rate,
            risk_loading,
            expense_loading: a.expense_loading,
            gross_premium_rate,
            premium_amount,
            data_source: history.source.clone(),
            data_range_label: history.range_label.clone(),
            years_of_data: history.years_of_data,
            event_count,
            is_simulated: history.is_simulated,
            confidence: Confidence::from_years(history.years_of_data),
        }
    }
}

/// Severity of one qualifying event: 0.5 at the trigger, 1.0 at double the
/// trigger and beyond. Clamped so degenerate triggers stay finite.
fn severity_of(value: f64, trigger: f64, fallback: f64) -> f64 {
    if trigger.abs() < f64::EPSILON {
        return fallback;
    }
    (0.5 + (value - trigger) / trigger).clamp(0.0, 1.0)
}

/// Population standard deviation; the window is the whole population.
fn population_stdev(values: &[f64], mean: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let variance = values
        .iter()
        .map(|v| {
            let d = v - mean;
            d * d
        })
        .sum::<f64>()
        / values.len() as f64;
    variance.sqrt()
}
