//! Premium pricing output types

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// How much weight the historical window deserves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
    High,
    Medium,
    Low,
}

impl Confidence {
    /// One uniform rule across hazard families.
    pub fn from_years(years_of_data: u32) -> Self {
        if years_of_data >= 15 {
            Confidence::High
        } else if years_of_data >= 8 {
            Confidence::Medium
        } else {
            Confidence::Low
        }
    }
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Confidence::High => "high",
            Confidence::Medium => "medium",
            Confidence::Low => "low",
        };
        f.write_str(s)
    }
}

/// Full decomposition of a quoted premium.
///
/// Every rate is annual and unitless; `premium_amount` is the only money
/// field. Invariant: `gross_premium_rate` never drops below the 0.5% floor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PremiumBreakdown {
    /// Annual probability of a trigger-crossing event
    pub frequency: f64,

    /// Mean severity of qualifying events, 0.5-1.0
    pub severity: f64,

    /// Expected annual loss rate: frequency x severity
    pub pure_premium_rate: f64,

    /// Volatility loading, 0.15-0.40
    pub risk_loading: f64,

    /// Fixed operating-cost loading
    pub expense_loading: f64,

    /// Final annual rate after loadings and floor
    pub gross_premium_rate: f64,

    /// Premium charged for the requested coverage
    pub premium_amount: Decimal,

    /// Catalog or model the history came from
    pub data_source: String,

    /// Observation window label, e.g. "1994-2023"
    pub data_range_label: String,

    /// Window length in years
    pub years_of_data: u32,

    /// Trigger-crossing events found in the window
    pub event_count: u32,

    /// True when the underlying series was curve-generated
    pub is_simulated: bool,

    /// Confidence grade derived from the window length
    pub confidence: Confidence,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_confidence_grades() {
        assert_eq!(Confidence::from_years(30), Confidence::High);
        assert_eq!(Confidence::from_years(15), Confidence::High);
        assert_eq!(Confidence::from_years(14), Confidence::Medium);
        assert_eq!(Confidence::from_years(8), Confidence::Medium);
        assert_eq!(Confidence::from_years(7), Confidence::Low);
        assert_eq!(Confidence::from_years(0), Confidence::Low);
    }
}
