//! HTTP-backed hazard data
//!
//! Queries the catalog's public JSON APIs directly: sources are tried in
//! catalog order and the first healthy response wins. Extraction is a JSON
//! pointer from the source config, with a `/last` suffix for feeds that
//! key their latest value by date or position.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, warn};

use parapet_common::{
    AttestationKind, AttestationSourceConfig, Clock, HazardDataError, HazardHistory,
    HazardReading, PoolType,
};

use crate::catalog::HazardCatalog;
use crate::hazard::{HazardDataService, DEFAULT_CONSENSUS_REQUIRED};

/// HTTP adapter settings.
#[derive(Debug, Clone)]
pub struct HttpHazardConfig {
    pub timeout: Duration,
    pub user_agent: String,
}

impl Default for HttpHazardConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            user_agent: format!("parapet/{}", parapet_common::VERSION),
        }
    }
}

/// Live hazard service over the catalog's public APIs.
pub struct HttpHazardData {
    client: reqwest::Client,
    clock: Arc<dyn Clock>,
    catalog: &'static HazardCatalog,
}

impl HttpHazardData {
    pub fn new(clock: Arc<dyn Clock>, config: HttpHazardConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent)
            .build()
            .context("failed to build hazard HTTP client")?;
        Ok(Self {
            client,
            clock,
            catalog: HazardCatalog::global(),
        })
    }

    async fn query_source(
        &self,
        source: &AttestationSourceConfig,
        lat: f64,
        lng: f64,
    ) -> Result<f64, HazardDataError> {
        let url = source.endpoint_for(lat, lng);
        debug!(source = %source.source_name, %url, "querying hazard source");

        let response = self.client.get(&url).send().await.map_err(|e| {
            HazardDataError::SourceUnavailable {
                source: source.source_name.clone(),
                reason: e.to_string(),
            }
        })?;

        if !response.status().is_success() {
            return Err(HazardDataError::SourceUnavailable {
                source: source.source_name.clone(),
                reason: format!("status {}", response.status()),
            });
        }

        let body: Value =
            response
                .json()
                .await
                .map_err(|e| HazardDataError::MalformedResponse {
                    source: source.source_name.clone(),
                    reason: e.to_string(),
                })?;

        extract_value(&body, &source.extraction_rule).ok_or_else(|| {
            HazardDataError::ExtractionFailed {
                source: source.source_name.clone(),
                pointer: source.extraction_rule.clone(),
            }
        })
    }
}

#[async_trait]
impl HazardDataService for HttpHazardData {
    async fn fetch_reading(
        &self,
        pool_type: PoolType,
        lat: f64,
        lng: f64,
    ) -> Result<HazardReading, HazardDataError> {
        let entry =
            self.catalog
                .entry(pool_type)
                .ok_or_else(|| HazardDataError::UnsupportedPool {
                    pool: pool_type.to_string(),
                })?;

        let mut attempted = 0usize;
        for (rank, source) in entry.sources.iter().enumerate() {
            // Keyed push feeds cannot be polled anonymously.
            if source.kind != AttestationKind::JsonApi {
                continue;
            }
            attempted += 1;
            match self.query_source(source, lat, lng).await {
                Ok(value) => {
                    return Ok(HazardReading {
                        pool_type,
                        lat,
                        lng,
                        value,
                        unit: pool_type.unit().to_string(),
                        source: source.source_name.clone(),
                        confidence: 95u8.saturating_sub(rank as u8 * 10),
                        timestamp: self.clock.now(),
                        is_simulated: false,
                    });
                }
                Err(err) => {
                    warn!(source = %source.source_name, error = %err, "hazard source failed, trying next");
                }
            }
        }

        Err(HazardDataError::AllSourcesFailed {
            pool: pool_type.to_string(),
            attempted,
        })
    }

    async fn fetch_history(
        &self,
        pool_type: PoolType,
        _lat: f64,
        _lng: f64,
    ) -> Result<HazardHistory, HazardDataError> {
        // Archival queries stay on the bundled catalog; only current
        // readings go to the live APIs.
        self.catalog
            .entry(pool_type)
            .map(|entry| entry.history())
            .ok_or_else(|| HazardDataError::UnsupportedPool {
                pool: pool_type.to_string(),
            })
    }

    fn attestation_sources(&self, pool_type: PoolType) -> Vec<AttestationSourceConfig> {
        self.catalog
            .entry(pool_type)
            .map(|entry| entry.sources.clone())
            .unwrap_or_default()
    }

    fn consensus_required(&self, pool_type: PoolType) -> usize {
        self.catalog
            .entry(pool_type)
            .map(|entry| entry.consensus_required)
            .unwrap_or(DEFAULT_CONSENSUS_REQUIRED)
    }
}

/// Resolve an extraction rule against a response body.
///
/// Plain JSON pointers resolve as usual. A trailing `/last` selects the
/// final array element, or the greatest key of a date-keyed object.
pub fn extract_value(body: &Value, pointer: &str) -> Option<f64> {
    let target = if let Some(prefix) = pointer.strip_suffix("/last") {
        match body.pointer(prefix)? {
            Value::Array(items) => items.last()?,
            Value::Object(map) => map.values().last()?,
            other => other,
        }
    } else {
        body.pointer(pointer)?
    };

    match target {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
