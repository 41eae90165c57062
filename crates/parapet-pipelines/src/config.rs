//! Engine configuration

use std::time::Duration;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use parapet_common::RetryPolicy;

/// Pipeline engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Retry behavior for transient collaborator failures
    pub retry: RetrySettings,
    /// Feed symbols captured by snapshots and claim settlements
    pub feed_symbols: Vec<String>,
    /// Ledger signing account; empty disables ledger writes
    pub signer_account: String,
    /// Rows returned by price history queries
    pub price_history_limit: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            retry: RetrySettings::default(),
            feed_symbols: vec!["FLR/USD".to_string()],
            signer_account: "pool-operator".to_string(),
            price_history_limit: 100,
        }
    }
}

impl EngineConfig {
    /// Load configuration from environment and .env file
    pub fn load() -> Result<Self> {
        let _ = dotenvy::dotenv();

        let mut cfg = Self::default();

        if let Ok(val) = std::env::var("PARAPET_RETRY_MAX_ATTEMPTS") {
            if let Ok(v) = val.parse() {
                cfg.retry.max_attempts = v;
            }
        }
        if let Ok(val) = std::env::var("PARAPET_RETRY_BASE_DELAY_MS") {
            if let Ok(v) = val.parse() {
                cfg.retry.base_delay_ms = v;
            }
        }

        if let Ok(val) = std::env::var("PARAPET_FEED_SYMBOLS") {
            let symbols = parse_symbols(&val);
            if !symbols.is_empty() {
                cfg.feed_symbols = symbols;
            }
        }
        if let Ok(val) = std::env::var("PARAPET_SIGNER_ACCOUNT") {
            cfg.signer_account = val;
        }
        if let Ok(val) = std::env::var("PARAPET_PRICE_HISTORY_LIMIT") {
            if let Ok(v) = val.parse() {
                cfg.price_history_limit = v;
            }
        }

        Ok(cfg)
    }

    /// Retry policy with the default transient-only predicate.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.retry.max_attempts,
            Duration::from_millis(self.retry.base_delay_ms),
        )
    }
}

/// Retry settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrySettings {
    /// Total attempts, including the first
    pub max_attempts: u32,
    /// Base backoff; the wait before attempt n+1 is base * n
    pub base_delay_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 200,
        }
    }
}

fn parse_symbols(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = EngineConfig::default();
        assert_eq!(cfg.retry.max_attempts, 3);
        assert_eq!(cfg.retry.base_delay_ms, 200);
        assert_eq!(cfg.feed_symbols, vec!["FLR/USD".to_string()]);
        assert_eq!(cfg.price_history_limit, 100);
    }

    #[test]
    fn test_retry_policy_mapping() {
        let mut cfg = EngineConfig::default();
        cfg.retry.max_attempts = 5;
        cfg.retry.base_delay_ms = 50;

        let policy = cfg.retry_policy();
        assert_eq!(policy.max_attempts, 5);
        assert_eq!(policy.delay_for(2), Duration::from_millis(100));
    }

    #[test]
    fn test_parse_symbols_trims_and_drops_empties() {
        assert_eq!(
            parse_symbols("FLR/USD, USDC/USD,,  "),
            vec!["FLR/USD".to_string(), "USDC/USD".to_string()]
        );
        assert!(parse_symbols("").is_empty());
    }
}
