//! Payout evaluation
//!
//! The single place where a hazard reading, a policy trigger, and a
//! coverage amount become money. Quote previews and claim settlement both
//! call [`evaluate`]; there is no second copy of the tier table.

use parapet_common::{PayoutTier, PayoutTierResult};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// Overshoot ratio of a reading against a trigger.
///
/// Signs carry no meaning for parametric indices, so both operands are
/// taken absolute. A zero trigger cannot be overshot and yields ratio 0.
pub fn trigger_ratio(reading_value: f64, trigger_value: f64) -> f64 {
    let trigger = trigger_value.abs();
    if trigger == 0.0 {
        return 0.0;
    }
    reading_value.abs() / trigger
}

/// Payout owed for one tier against a coverage amount.
pub fn amount_for(tier: PayoutTier, coverage: Decimal) -> Decimal {
    coverage * Decimal::from(tier.percentage()) / dec!(100)
}

/// Grade a reading against a policy trigger and coverage.
pub fn evaluate(reading_value: f64, trigger_value: f64, coverage: Decimal) -> PayoutTierResult {
    let ratio = trigger_ratio(reading_value, trigger_value);
    let tier = PayoutTier::from_ratio(ratio);
    PayoutTierResult {
        tier,
        ratio,
        percentage: tier.percentage(),
        payout_amount: amount_for(tier, coverage),
    }
}

/// One row of the quote-time payout preview.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PayoutPreviewRow {
    pub tier: PayoutTier,

    /// Smallest overshoot ratio that lands in this tier
    pub min_ratio: f64,

    pub percentage: u8,
    pub payout_amount: Decimal,
}

/// Per-tier payout table for a coverage amount, shown alongside quotes.
pub fn preview(coverage: Decimal) -> Vec<PayoutPreviewRow> {
    use parapet_common::types::payout::{MINOR_RATIO, MODERATE_RATIO, SEVERE_RATIO};

    [
        (PayoutTier::Minor, MINOR_RATIO),
        (PayoutTier::Moderate, MODERATE_RATIO),
        (PayoutTier::Severe, SEVERE_RATIO),
    ]
    .into_iter()
    .map(|(tier, min_ratio)| PayoutPreviewRow {
        tier,
        min_ratio,
        percentage: tier.percentage(),
        payout_amount: amount_for(tier, coverage),
    })
    .collect()
}
