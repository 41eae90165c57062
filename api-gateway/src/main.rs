//! Parapet API Gateway
//!
//! HTTP surface for the parametric-coverage engine:
//! - Quoting: premium offers and historical backtests per peril
//! - Policies: mint, inspect with audit timeline, claim
//! - Oracle: live hazard readings and attestation round status
//! - Pool: solvency stats and reference price snapshots

use std::sync::Arc;

use axum::{
    extract::{Path, Query, Request, State},
    http::{header, Method, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tower::ServiceBuilder;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{debug, error, info};
use uuid::Uuid;

use parapet_common::{
    AttestationError, CancelSource, CancelToken, FeedValue, PersistenceError, PipelineError,
    PolicyRecord, PoolType, PriceSnapshot, TimelineEvent, ValidationError,
};
use parapet_pipelines::{
    aggregate_pool_stats, backtest, current_prices, price_history, quote, read_and_classify,
    snapshot_prices, trigger_payout, validate_and_mint, BacktestOutcome, ClaimOutcome,
    ClassifiedReading, EngineConfig, InMemoryLedger, MintOutcome, MintRequest, PoolReport, Quote,
    QuoteRequest, RoundSummary, ServiceBundle,
};

// ============ STATE ============

#[derive(Clone)]
struct AppState {
    bundle: ServiceBundle,
    cancel: CancelToken,
    api_token: Option<String>,
    history_limit: usize,
}

// ============ ERROR MAPPING ============

/// Renders the pipeline failure taxonomy as HTTP responses. Caller mistakes
/// come back with detail; everything else is a generic 500 and the full
/// error goes to the log.
struct ApiError(PipelineError);

impl<E: Into<PipelineError>> From<E> for ApiError {
    fn from(err: E) -> Self {
        ApiError(err.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self.0 {
            PipelineError::Validation(err) => {
                (StatusCode::BAD_REQUEST, "validation", err.to_string())
            }
            PipelineError::Persistence(PersistenceError::NotFound { entity, id }) => (
                StatusCode::NOT_FOUND,
                "not_found",
                format!("{entity} {id} not found"),
            ),
            // The ledger accepted the write but the record never reached the
            // store. The caller must not blindly re-submit.
            PipelineError::Persistence(PersistenceError::AfterLedgerWrite { tx_handle, .. }) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "ledger_recorded_not_persisted",
                format!("transaction {tx_handle} settled on the ledger but the record was not stored"),
            ),
            PipelineError::Attestation(AttestationError::RoundNotFound { round_id }) => (
                StatusCode::NOT_FOUND,
                "not_found",
                format!("attestation round {round_id} not found"),
            ),
            other => (
                StatusCode::INTERNAL_SERVER_ERROR,
                other.kind(),
                "internal error".to_string(),
            ),
        };

        if status.is_server_error() {
            error!(code, detail = %self.0, "request failed");
        } else {
            debug!(code, detail = %self.0, "request rejected");
        }

        let body = Json(serde_json::json!({
            "error": { "code": code, "message": message }
        }));
        (status, body).into_response()
    }
}

// ============ AUTH ============

/// Bearer check for the /api/v1 surface. A no-op until a token is
/// configured.
async fn require_bearer(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let Some(expected) = state.api_token.as_deref() else {
        return next.run(req).await;
    };

    let presented = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "));

    if presented == Some(expected) {
        next.run(req).await
    } else {
        let body = Json(serde_json::json!({
            "error": { "code": "unauthorized", "message": "missing or invalid bearer token" }
        }));
        (StatusCode::UNAUTHORIZED, body).into_response()
    }
}

// ============ REQUEST TYPES ============

#[derive(Debug, Deserialize)]
struct QuoteParams {
    pool_type: String,
    lat: f64,
    lng: f64,
    trigger_value: f64,
    coverage_amount: Decimal,
    /// Display label for the trigger, defaults to the pool's unit.
    trigger_unit: Option<String>,
}

impl QuoteParams {
    fn to_request(&self) -> Result<QuoteRequest, ApiError> {
        Ok(QuoteRequest {
            pool_type: parse_pool(&self.pool_type)?,
            lat: self.lat,
            lng: self.lng,
            trigger_value: self.trigger_value,
            coverage_amount: self.coverage_amount,
        })
    }
}

#[derive(Debug, Deserialize)]
struct ReadingParams {
    pool_type: String,
    lat: f64,
    lng: f64,
}

#[derive(Debug, Deserialize)]
struct HistoryParams {
    limit: Option<usize>,
}

fn parse_pool(value: &str) -> Result<PoolType, ApiError> {
    value.parse::<PoolType>().map_err(|_| {
        ValidationError::UnknownPoolType {
            value: value.to_string(),
        }
        .into()
    })
}

// ============ RESPONSE TYPES ============

#[derive(Debug, Serialize)]
struct PolicyView {
    policy: PolicyRecord,
    timeline: Vec<TimelineEvent>,
}

// ============ HANDLERS ============

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
        "pools": PoolType::ALL.iter().map(PoolType::as_str).collect::<Vec<_>>(),
    }))
}

async fn get_quote(
    State(state): State<AppState>,
    Query(params): Query<QuoteParams>,
) -> Result<Json<Quote>, ApiError> {
    let request = params.to_request()?;
    let mut offer = quote(&state.bundle, &state.cancel, &request).await?;
    if let Some(unit) = params.trigger_unit.filter(|unit| !unit.trim().is_empty()) {
        offer.trigger_unit = unit;
    }
    Ok(Json(offer))
}

async fn get_backtest(
    State(state): State<AppState>,
    Query(params): Query<QuoteParams>,
) -> Result<Json<BacktestOutcome>, ApiError> {
    let request = params.to_request()?;
    let replay = backtest(&state.bundle, &state.cancel, &request).await?;
    Ok(Json(replay))
}

async fn get_reading(
    State(state): State<AppState>,
    Query(params): Query<ReadingParams>,
) -> Result<Json<ClassifiedReading>, ApiError> {
    let pool_type = parse_pool(&params.pool_type)?;
    let reading =
        read_and_classify(&state.bundle, &state.cancel, pool_type, params.lat, params.lng).await?;
    Ok(Json(reading))
}

async fn create_policy(
    State(state): State<AppState>,
    Json(request): Json<MintRequest>,
) -> Result<Json<MintOutcome>, ApiError> {
    let outcome = validate_and_mint(&state.bundle, &request).await?;
    Ok(Json(outcome))
}

async fn get_policy(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<PolicyView>, ApiError> {
    let policy = state.bundle.database.get_policy(id).await?;
    let timeline = state.bundle.database.get_policy_timeline(id).await?;
    Ok(Json(PolicyView { policy, timeline }))
}

async fn claim_policy(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ClaimOutcome>, ApiError> {
    let outcome = trigger_payout(&state.bundle, &state.cancel, id).await?;
    Ok(Json(outcome))
}

async fn get_attestation_round(
    State(state): State<AppState>,
    Path(round_id): Path<String>,
) -> Result<Json<RoundSummary>, ApiError> {
    let outcome = state.bundle.consensus.outcome(&round_id)?;
    let results = state.bundle.consensus.results(&round_id)?;
    Ok(Json(RoundSummary {
        round_id,
        outcome,
        results,
    }))
}

async fn get_pool_stats(State(state): State<AppState>) -> Result<Json<PoolReport>, ApiError> {
    let report = aggregate_pool_stats(&state.bundle, &state.cancel).await?;
    Ok(Json(report))
}

async fn get_prices(State(state): State<AppState>) -> Result<Json<Vec<FeedValue>>, ApiError> {
    let values = current_prices(&state.bundle, &state.cancel).await?;
    Ok(Json(values))
}

async fn create_price_snapshot(
    State(state): State<AppState>,
) -> Result<Json<PriceSnapshot>, ApiError> {
    let snapshot = snapshot_prices(&state.bundle, &state.cancel).await?;
    Ok(Json(snapshot))
}

async fn get_price_history(
    State(state): State<AppState>,
    Query(params): Query<HistoryParams>,
) -> Result<Json<Vec<PriceSnapshot>>, ApiError> {
    let limit = params.limit.unwrap_or(state.history_limit);
    let snapshots = price_history(&state.bundle, &state.cancel, limit).await?;
    Ok(Json(snapshots))
}

// ============ ROUTER ============

fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    let api = Router::new()
        // Quoting
        .route("/quote", get(get_quote))
        .route("/backtest", get(get_backtest))
        // Oracle
        .route("/reading", get(get_reading))
        .route("/attestations/:round_id", get(get_attestation_round))
        // Policies
        .route("/policies", post(create_policy))
        .route("/policies/:id", get(get_policy))
        .route("/policies/:id/claim", post(claim_policy))
        // Pool and prices
        .route("/pool/stats", get(get_pool_stats))
        .route("/prices", get(get_prices))
        .route("/prices/snapshot", post(create_price_snapshot))
        .route("/prices/history", get(get_price_history))
        .layer(middleware::from_fn_with_state(state.clone(), require_bearer));

    Router::new()
        .route("/health", get(health))
        .nest("/api/v1", api)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CompressionLayer::new())
                .layer(cors),
        )
        .with_state(state)
}

// ============ MAIN ============

async fn shutdown_signal(source: CancelSource) {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            info!("shutdown signal received, cancelling in-flight retries");
            source.cancel();
        }
        Err(err) => {
            error!(%err, "failed to install ctrl-c handler");
            std::future::pending::<()>().await;
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("api_gateway=info".parse()?)
                .add_directive("parapet_pipelines=info".parse()?),
        )
        .json()
        .init();

    dotenvy::dotenv().ok();

    let config = EngineConfig::load()?;
    // Opening float so demo claims can settle against the in-memory ledger.
    let ledger = InMemoryLedger::new().with_balance(Decimal::from(1_000_000u64));
    let bundle = ServiceBundle::in_memory_with_config(&config).with_ledger(Arc::new(ledger));

    let source = CancelSource::new();
    let state = AppState {
        bundle,
        cancel: source.token(),
        api_token: std::env::var("PARAPET_API_TOKEN")
            .ok()
            .filter(|token| !token.trim().is_empty()),
        history_limit: config.price_history_limit,
    };
    if state.api_token.is_some() {
        info!("bearer auth enabled for /api/v1");
    }

    let app = build_router(state);

    let host = std::env::var("PARAPET_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
    let port = std::env::var("PARAPET_PORT")
        .or_else(|_| std::env::var("PORT"))
        .unwrap_or_else(|_| "8080".to_string());
    let addr = format!("{host}:{port}");
    info!("Parapet API gateway starting on {}", addr);
    info!("Endpoints: /health, /api/v1/quote, /api/v1/backtest, /api/v1/reading, /api/v1/policies, /api/v1/attestations, /api/v1/pool/stats, /api/v1/prices");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(source))
        .await?;

    Ok(())
}

// ============ TESTS ============

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request as HttpRequest;
    use tower::ServiceExt;

    fn test_state(api_token: Option<&str>) -> AppState {
        AppState {
            bundle: ServiceBundle::in_memory(),
            cancel: CancelToken::disarmed(),
            api_token: api_token.map(str::to_string),
            history_limit: 100,
        }
    }

    fn get_request(uri: &str, bearer: Option<&str>) -> HttpRequest<Body> {
        let mut builder = HttpRequest::builder().uri(uri);
        if let Some(token) = bearer {
            builder = builder.header("authorization", format!("Bearer {token}"));
        }
        builder.body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_health_is_open_without_token() {
        let app = build_router(test_state(Some("secret")));
        let response = app.oneshot(get_request("/health", None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_api_rejects_missing_and_wrong_bearer() {
        let app = build_router(test_state(Some("secret")));
        let response = app
            .clone()
            .oneshot(get_request("/api/v1/prices", None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = app
            .oneshot(get_request("/api/v1/prices", Some("wrong")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_api_accepts_configured_bearer() {
        let app = build_router(test_state(Some("secret")));
        let response = app
            .oneshot(get_request("/api/v1/prices", Some("secret")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_api_is_open_without_configured_token() {
        let app = build_router(test_state(None));
        let response = app
            .oneshot(get_request("/api/v1/prices", None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_unknown_pool_type_is_bad_request() {
        let app = build_router(test_state(None));
        let response = app
            .oneshot(get_request("/api/v1/reading?pool_type=volcano&lat=0&lng=0", None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_out_of_range_latitude_is_bad_request() {
        let app = build_router(test_state(None));
        let response = app
            .oneshot(get_request(
                "/api/v1/reading?pool_type=earthquake&lat=95.0&lng=0",
                None,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_unknown_policy_is_not_found() {
        let app = build_router(test_state(None));
        let uri = format!("/api/v1/policies/{}", Uuid::now_v7());
        let response = app.oneshot(get_request(&uri, None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_after_ledger_write_gets_distinct_code() {
        let err = ApiError(
            PersistenceError::AfterLedgerWrite {
                tx_handle: "0xabc".to_string(),
                reason: "store offline".to_string(),
            }
            .into(),
        );
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"]["code"], "ledger_recorded_not_persisted");
        assert!(body["error"]["message"].as_str().unwrap().contains("0xabc"));
    }

    #[tokio::test]
    async fn test_generic_failures_hide_internal_detail() {
        let err =
            ApiError(parapet_common::FeedError::Unavailable("socket reset".to_string()).into());
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"]["code"], "feed");
        assert_eq!(body["error"]["message"], "internal error");
    }
}
