//! Price feed and pool accounting types

use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One price observation from the feed, e.g. FLR/USD.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedValue {
    /// Feed symbol, e.g. "FLR/USD"
    pub symbol: String,

    /// Quoted price
    pub value: Decimal,

    /// When the feed published the value
    pub at: DateTime<Utc>,
}

/// A persisted point-in-time capture of every configured feed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceSnapshot {
    pub at: DateTime<Utc>,
    pub values: Vec<FeedValue>,
}

/// Aggregate accounting for the coverage pool.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PoolStats {
    pub total_policies: u64,
    pub active_policies: u64,
    pub total_premiums: Decimal,
    pub total_payouts: Decimal,
}

impl PoolStats {
    /// Payouts over premiums; 0 while no premium has been collected.
    pub fn loss_ratio(&self) -> f64 {
        if self.total_premiums.is_zero() {
            return 0.0;
        }
        (self.total_payouts / self.total_premiums)
            .to_f64()
            .unwrap_or(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_loss_ratio() {
        let stats = PoolStats {
            total_policies: 13,
            active_policies: 12,
            total_premiums: dec!(32500),
            total_payouts: dec!(10000),
        };
        assert!((stats.loss_ratio() - 0.3077).abs() < 0.0001);
    }

    #[test]
    fn test_loss_ratio_zero_premiums() {
        let stats = PoolStats::default();
        assert_eq!(stats.loss_ratio(), 0.0);
    }
}
