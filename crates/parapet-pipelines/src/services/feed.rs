//! Price feed access.
//!
//! Settlement amounts are denominated in pool currency units; the feed
//! supplies reference prices so callers can express them in fiat. The
//! trait is the seam: production wires a live adapter, tests and the
//! default bundle use [`StaticPriceFeed`].

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use rust_decimal::Decimal;

use parapet_common::{Clock, FeedError, FeedValue};

/// Read-only access to reference prices.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PriceFeedService: Send + Sync {
    /// Returns one value per requested symbol, in request order.
    ///
    /// Fails on the first symbol the feed does not carry.
    async fn read_feeds(&self, symbols: &[String]) -> Result<Vec<FeedValue>, FeedError>;
}

/// Fixed-price feed backed by an in-memory table.
pub struct StaticPriceFeed {
    prices: DashMap<String, Decimal>,
    clock: Arc<dyn Clock>,
}

impl StaticPriceFeed {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            prices: DashMap::new(),
            clock,
        }
    }

    /// Builder-style price registration.
    pub fn with_price(self, symbol: &str, value: Decimal) -> Self {
        self.prices.insert(symbol.to_string(), value);
        self
    }

    /// Updates a quoted price in place.
    pub fn set_price(&self, symbol: &str, value: Decimal) {
        self.prices.insert(symbol.to_string(), value);
    }
}

#[async_trait]
impl PriceFeedService for StaticPriceFeed {
    async fn read_feeds(&self, symbols: &[String]) -> Result<Vec<FeedValue>, FeedError> {
        let at = self.clock.now();
        symbols
            .iter()
            .map(|symbol| {
                let value = self
                    .prices
                    .get(symbol)
                    .map(|entry| *entry.value())
                    .ok_or_else(|| FeedError::UnknownSymbol {
                        symbol: symbol.clone(),
                    })?;
                Ok(FeedValue {
                    symbol: symbol.clone(),
                    value,
                    at,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parapet_common::FixedClock;
    use rust_decimal_macros::dec;

    fn feed() -> StaticPriceFeed {
        StaticPriceFeed::new(Arc::new(FixedClock::default()))
            .with_price("FLR/USD", dec!(0.025))
            .with_price("USDC/USD", dec!(1.0))
    }

    #[tokio::test]
    async fn test_reads_in_request_order() {
        let feed = feed();
        let values = feed
            .read_feeds(&["USDC/USD".to_string(), "FLR/USD".to_string()])
            .await
            .unwrap();

        assert_eq!(values.len(), 2);
        assert_eq!(values[0].symbol, "USDC/USD");
        assert_eq!(values[0].value, dec!(1.0));
        assert_eq!(values[1].symbol, "FLR/USD");
        assert_eq!(values[1].value, dec!(0.025));
    }

    #[tokio::test]
    async fn test_unknown_symbol_is_an_error() {
        let feed = feed();
        let err = feed
            .read_feeds(&["DOGE/USD".to_string()])
            .await
            .unwrap_err();

        assert!(matches!(err, FeedError::UnknownSymbol { ref symbol } if symbol == "DOGE/USD"));
    }

    #[tokio::test]
    async fn test_set_price_overrides() {
        let feed = feed();
        feed.set_price("FLR/USD", dec!(0.031));

        let values = feed.read_feeds(&["FLR/USD".to_string()]).await.unwrap();
        assert_eq!(values[0].value, dec!(0.031));
    }
}
