//! Pool statistics pipeline.
//!
//! Joins the store's accounting with the ledger's view of the pool. All
//! four reads are idempotent, so each is retried independently and they
//! run concurrently.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::instrument;

use parapet_common::{with_retry, CancelToken, FeedValue, PipelineError, PoolStats, Result};

use crate::services::ServiceBundle;

/// Store accounting plus the ledger's live view.
#[derive(Debug, Clone, Serialize)]
pub struct PoolReport {
    pub stats: PoolStats,
    /// Payouts over premiums.
    pub loss_ratio: f64,
    /// Policies ever minted on the ledger.
    pub ledger_policy_count: u64,
    /// Funds currently backing payouts.
    pub ledger_pool_balance: Decimal,
    pub prices: Vec<FeedValue>,
    pub as_of: DateTime<Utc>,
}

#[instrument(skip(bundle, cancel))]
pub async fn aggregate_pool_stats(
    bundle: &ServiceBundle,
    cancel: &CancelToken,
) -> Result<PoolReport> {
    let ledger = bundle.ledger.clone();
    let count_fut = with_retry(&bundle.retry, cancel, move || {
        let ledger = ledger.clone();
        async move {
            ledger
                .read_policy_count()
                .await
                .map_err(PipelineError::from)
        }
    });

    let ledger = bundle.ledger.clone();
    let balance_fut = with_retry(&bundle.retry, cancel, move || {
        let ledger = ledger.clone();
        async move {
            ledger
                .read_pool_balance()
                .await
                .map_err(PipelineError::from)
        }
    });

    let database = bundle.database.clone();
    let stats_fut = with_retry(&bundle.retry, cancel, move || {
        let database = database.clone();
        async move { database.get_pool_stats().await.map_err(PipelineError::from) }
    });

    let feed = bundle.feed.clone();
    let symbols = bundle.feed_symbols.clone();
    let prices_fut = with_retry(&bundle.retry, cancel, move || {
        let feed = feed.clone();
        let symbols = symbols.clone();
        async move { feed.read_feeds(&symbols).await.map_err(PipelineError::from) }
    });

    let (ledger_policy_count, ledger_pool_balance, stats, prices) =
        tokio::try_join!(count_fut, balance_fut, stats_fut, prices_fut)?;

    Ok(PoolReport {
        loss_ratio: stats.loss_ratio(),
        stats,
        ledger_policy_count,
        ledger_pool_balance,
        prices,
        as_of: bundle.clock.now(),
    })
}
