//! Price feed pipelines.

use tracing::{info, instrument};

use parapet_common::{
    with_retry, CancelToken, FeedValue, PipelineError, PriceSnapshot, Result,
};

use crate::services::ServiceBundle;

/// Current values for every configured feed symbol.
#[instrument(skip(bundle, cancel))]
pub async fn current_prices(bundle: &ServiceBundle, cancel: &CancelToken) -> Result<Vec<FeedValue>> {
    read_feeds(bundle, cancel).await
}

/// Captures the configured feeds as one persisted snapshot.
#[instrument(skip(bundle, cancel))]
pub async fn snapshot_prices(bundle: &ServiceBundle, cancel: &CancelToken) -> Result<PriceSnapshot> {
    let values = read_feeds(bundle, cancel).await?;
    let snapshot = PriceSnapshot {
        at: bundle.clock.now(),
        values,
    };
    bundle.database.save_price_snapshot(snapshot.clone()).await?;
    info!(symbols = snapshot.values.len(), "price snapshot saved");
    Ok(snapshot)
}

/// Persisted snapshots, newest first.
#[instrument(skip(bundle, cancel))]
pub async fn price_history(
    bundle: &ServiceBundle,
    cancel: &CancelToken,
    limit: usize,
) -> Result<Vec<PriceSnapshot>> {
    let database = bundle.database.clone();
    with_retry(&bundle.retry, cancel, move || {
        let database = database.clone();
        async move {
            database
                .get_price_history(limit)
                .await
                .map_err(PipelineError::from)
        }
    })
    .await
}

async fn read_feeds(bundle: &ServiceBundle, cancel: &CancelToken) -> Result<Vec<FeedValue>> {
    let feed = bundle.feed.clone();
    let symbols = bundle.feed_symbols.clone();
    with_retry(&bundle.retry, cancel, move || {
        let feed = feed.clone();
        let symbols = symbols.clone();
        async move { feed.read_feeds(&symbols).await.map_err(PipelineError::from) }
    })
    .await
}
