//! Graded payout tiers
//!
//! Payouts step up with how far the measured index overshoots the policy
//! trigger. The tier table is the single source of truth for both the
//! quote-time preview and claim settlement.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Trigger-overshoot ratio at which a payout starts.
pub const MINOR_RATIO: f64 = 1.0;

/// Ratio at which the payout steps up to 50%.
pub const MODERATE_RATIO: f64 = 1.3;

/// Ratio at which the payout steps up to 100%.
pub const SEVERE_RATIO: f64 = 1.6;

/// Graded payout tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PayoutTier {
    None,
    Minor,
    Moderate,
    Severe,
}

impl PayoutTier {
    /// Tier for a reading/trigger ratio.
    ///
    /// Boundaries are inclusive on the lower edge: a ratio of exactly 1.0
    /// pays the minor tier, 1.3 the moderate tier, 1.6 the severe tier.
    pub fn from_ratio(ratio: f64) -> Self {
        if ratio >= SEVERE_RATIO {
            PayoutTier::Severe
        } else if ratio >= MODERATE_RATIO {
            PayoutTier::Moderate
        } else if ratio >= MINOR_RATIO {
            PayoutTier::Minor
        } else {
            PayoutTier::None
        }
    }

    /// Payout as a percentage of coverage.
    pub fn percentage(&self) -> u8 {
        match self {
            PayoutTier::None => 0,
            PayoutTier::Minor => 25,
            PayoutTier::Moderate => 50,
            PayoutTier::Severe => 100,
        }
    }
}

impl fmt::Display for PayoutTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PayoutTier::None => "none",
            PayoutTier::Minor => "minor",
            PayoutTier::Moderate => "moderate",
            PayoutTier::Severe => "severe",
        };
        f.write_str(s)
    }
}

/// A tier decision applied to a concrete coverage amount.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PayoutTierResult {
    /// Tier the reading landed in
    pub tier: PayoutTier,

    /// Reading/trigger overshoot ratio that produced the tier
    pub ratio: f64,

    /// Payout percentage of coverage
    pub percentage: u8,

    /// Payout owed for the policy's coverage
    pub payout_amount: Decimal,
}

impl PayoutTierResult {
    pub fn pays_out(&self) -> bool {
        self.percentage > 0
    }
}
