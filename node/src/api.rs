//! # REST API
//!
//! Builds the axum router that exposes the vault registry over HTTP/JSON.
//! All endpoints share application state through axum's `State` extractor.
//!
//! The node holds the registry's two capabilities. Callers never see them;
//! instead, privileged routes require `Authorization: Bearer <uuid>` where
//! the UUID is the identity of the capability the route needs. A matching
//! token lets the node act with the capability on the caller's behalf.
//!
//! ## Endpoints
//!
//! | Method | Path                                   | Auth   |
//! |--------|----------------------------------------|--------|
//! | GET    | `/health`                              |        |
//! | GET    | `/status`                              |        |
//! | GET    | `/vaults`                              |        |
//! | POST   | `/vaults`                              | admin  |
//! | GET    | `/vaults/:asset`                       |        |
//! | POST   | `/vaults/:asset/deposit`               |        |
//! | POST   | `/vaults/:asset/withdraw`              |        |
//! | POST   | `/vaults/:asset/borrow`                | credit |
//! | POST   | `/vaults/:asset/repay`                 | credit |
//! | POST   | `/vaults/:asset/deposit-and-borrow`    | credit |
//! | POST   | `/vaults/:asset/repay-and-withdraw`    | credit |
//! | POST   | `/vaults/:asset/admin/status`          | admin  |
//! | POST   | `/vaults/:asset/admin/config`          | admin  |
//! | POST   | `/vaults/:asset/admin/daily-limit`     | admin  |
//! | POST   | `/vaults/:asset/admin/reset-daily-limit` | admin |
//! | POST   | `/vaults/:asset/admin/force-day`       | admin  |
//! | POST   | `/vaults/:asset/admin/emergency-pause` | admin  |
//! | POST   | `/vaults/:asset/admin/collect-fees`    | admin  |
//! | POST   | `/vaults/:asset/admin/upgrade-schema`  | admin  |
//! | POST   | `/admin/global-emergency-pause`        | admin  |
//! | PUT    | `/oracle/prices/:asset`                | admin  |
//! | POST   | `/risk/health`                         |        |
//! | POST   | `/risk/liquidation`                    |        |
//! | POST   | `/risk/capacity`                       |        |

use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, Method, StatusCode},
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use prometheus::IntCounter;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use reservoir_protocol::config::VaultConfig;
use reservoir_protocol::oracle::{ManualOracle, PriceOracle, PriceQuote};
use reservoir_protocol::risk::{
    BorrowingCapacity, LiquidationCheck, Position, PositionHealth, RiskEngine,
};
use reservoir_protocol::vault::{
    AssetId, DailyLimit, RepayOutcome, Vault, VaultError, VaultRegistry, VaultStatistics,
    VaultStatus,
};
use reservoir_protocol::{AdminCap, Capability, CreditCap, TxContext};

use crate::metrics::SharedMetrics;

// ---------------------------------------------------------------------------
// Application State
// ---------------------------------------------------------------------------

/// Defaults applied to vaults created without explicit parameters.
#[derive(Debug, Clone, Copy)]
pub struct VaultDefaults {
    pub config: VaultConfig,
    pub max_daily_withdrawal: u64,
}

/// Source of the transaction context for each request.
pub type Clock = Arc<dyn Fn() -> TxContext + Send + Sync>;

/// Shared application state available to all request handlers.
///
/// Cheap to clone: everything behind `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// The node's reported version string.
    pub version: String,
    /// When this node started.
    pub started_at: DateTime<Utc>,
    /// The vault registry. One writer at a time, readers in parallel.
    pub registry: Arc<RwLock<VaultRegistry>>,
    /// Price feeds consumed by the risk routes.
    pub oracle: Arc<RwLock<ManualOracle>>,
    /// Admin capability held on behalf of admin-token bearers.
    pub admin_cap: Arc<AdminCap>,
    /// Credit capability held on behalf of credit-token bearers.
    pub credit_cap: Arc<CreditCap>,
    /// Defaults for `POST /vaults`.
    pub defaults: VaultDefaults,
    /// Reference to Prometheus metrics for in-handler recording.
    pub metrics: SharedMetrics,
    /// Wall clock by default. Every handler reads time through it.
    pub clock: Clock,
}

impl AppState {
    /// Wraps a freshly initialized registry and its capabilities.
    pub fn new(
        version: String,
        registry: VaultRegistry,
        admin_cap: AdminCap,
        credit_cap: CreditCap,
        defaults: VaultDefaults,
        metrics: SharedMetrics,
    ) -> Self {
        metrics.observe_registry(&registry);
        Self {
            version,
            started_at: Utc::now(),
            registry: Arc::new(RwLock::new(registry)),
            oracle: Arc::new(RwLock::new(ManualOracle::new())),
            admin_cap: Arc::new(admin_cap),
            credit_cap: Arc::new(credit_cap),
            defaults,
            metrics,
            clock: Arc::new(TxContext::now),
        }
    }

    /// Replaces the clock handlers read the current time from.
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }
}

// ---------------------------------------------------------------------------
// Router Construction
// ---------------------------------------------------------------------------

/// Builds the full axum [`Router`] with all API routes, CORS, and tracing.
///
/// The returned router is ready to be served on the configured RPC port.
pub fn create_router(state: AppState) -> Router {
    let cors = tower_http::cors::CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::OPTIONS])
        .allow_headers(tower_http::cors::Any);

    Router::new()
        .route("/health", get(health_handler))
        .route("/status", get(status_handler))
        .route("/vaults", get(list_vaults_handler).post(create_vault_handler))
        .route("/vaults/:asset", get(vault_handler))
        .route("/vaults/:asset/deposit", post(deposit_handler))
        .route("/vaults/:asset/withdraw", post(withdraw_handler))
        .route("/vaults/:asset/borrow", post(borrow_handler))
        .route("/vaults/:asset/repay", post(repay_handler))
        .route("/vaults/:asset/deposit-and-borrow", post(deposit_and_borrow_handler))
        .route("/vaults/:asset/repay-and-withdraw", post(repay_and_withdraw_handler))
        .route("/vaults/:asset/admin/status", post(set_status_handler))
        .route("/vaults/:asset/admin/config", post(update_config_handler))
        .route("/vaults/:asset/admin/daily-limit", post(update_daily_limit_handler))
        .route("/vaults/:asset/admin/reset-daily-limit", post(reset_daily_limit_handler))
        .route("/vaults/:asset/admin/force-day", post(force_day_handler))
        .route("/vaults/:asset/admin/emergency-pause", post(emergency_pause_handler))
        .route("/vaults/:asset/admin/collect-fees", post(collect_fees_handler))
        .route("/vaults/:asset/admin/upgrade-schema", post(upgrade_schema_handler))
        .route(
            "/admin/global-emergency-pause",
            post(global_emergency_pause_handler),
        )
        .route("/oracle/prices/:asset", put(set_price_handler))
        .route("/risk/health", post(risk_health_handler))
        .route("/risk/liquidation", post(risk_liquidation_handler))
        .route("/risk/capacity", post(risk_capacity_handler))
        .layer(middleware::from_fn_with_state(
            Arc::clone(&state.metrics),
            crate::metrics::track_latency,
        ))
        .layer(cors)
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Generic error body returned by REST endpoints on failure.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Anything a handler can fail with.
#[derive(Debug)]
pub enum ApiError {
    /// The protocol refused the operation.
    Vault(VaultError),
    /// Missing, malformed, or wrong bearer token.
    Unauthorized,
    /// The request itself is malformed (bad asset symbol, etc.).
    BadRequest(String),
}

impl From<VaultError> for ApiError {
    fn from(err: VaultError) -> Self {
        ApiError::Vault(err)
    }
}

/// Maps a protocol error to its HTTP status.
pub fn vault_error_status(err: &VaultError) -> StatusCode {
    match err {
        VaultError::ZeroAmount
        | VaultError::BelowMinimum { .. }
        | VaultError::ZeroShares { .. }
        | VaultError::InsufficientShares { .. }
        | VaultError::InvalidConfig(_)
        | VaultError::Math(_) => StatusCode::BAD_REQUEST,
        VaultError::Unauthorized => StatusCode::UNAUTHORIZED,
        VaultError::VaultNotFound(_) => StatusCode::NOT_FOUND,
        VaultError::StatusViolation { .. }
        | VaultError::DailyLimitExceeded { .. }
        | VaultError::InsufficientLiquidity { .. }
        | VaultError::VaultAlreadyExists(_)
        | VaultError::SchemaVersionMismatch { .. }
        | VaultError::IdentityMismatch { .. }
        | VaultError::NotUpgradeable { .. } => StatusCode::CONFLICT,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Vault(err) => (vault_error_status(&err), err.to_string()),
            ApiError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "missing or invalid bearer token".to_string(),
            ),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
        };
        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

type ApiResult<T> = Result<Json<T>, ApiError>;

// ---------------------------------------------------------------------------
// Request / Response Types
// ---------------------------------------------------------------------------

/// Response payload for `GET /status`.
#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    /// Node software version.
    pub version: String,
    /// Number of registered vaults.
    pub vaults: usize,
    /// Sum of total assets across vaults.
    pub total_assets: u128,
    /// Sum of borrowed principal across vaults.
    pub total_borrowed: u128,
    /// Whether the price oracle is paused.
    pub oracle_paused: bool,
    /// Seconds since the node started.
    pub uptime_secs: i64,
    /// ISO-8601 timestamp of the response.
    pub timestamp: String,
}

/// Public view of one vault.
#[derive(Debug, Serialize, Deserialize)]
pub struct VaultSummary {
    pub id: Uuid,
    pub asset: AssetId,
    pub status: VaultStatus,
    pub schema_version: u64,
    pub config: VaultConfig,
    pub daily_limit: DailyLimit,
    pub statistics: VaultStatistics,
    pub updated_at: DateTime<Utc>,
}

impl From<&Vault> for VaultSummary {
    fn from(vault: &Vault) -> Self {
        Self {
            id: vault.id(),
            asset: vault.asset().clone(),
            status: vault.status(),
            schema_version: vault.schema_version(),
            config: *vault.config(),
            daily_limit: *vault.daily_limit(),
            statistics: vault.statistics(),
            updated_at: vault.updated_at(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateVaultRequest {
    pub asset: AssetId,
    pub config: Option<VaultConfig>,
    pub max_daily_withdrawal: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct DepositRequest {
    pub assets: u64,
}

#[derive(Debug, Deserialize)]
pub struct WithdrawRequest {
    pub shares: u64,
}

#[derive(Debug, Deserialize)]
pub struct AmountRequest {
    pub amount: u64,
}

#[derive(Debug, Deserialize)]
pub struct DepositAndBorrowRequest {
    pub deposit_assets: u64,
    pub borrow_amount: u64,
}

#[derive(Debug, Deserialize)]
pub struct RepayAndWithdrawRequest {
    pub repay_amount: u64,
    pub shares: u64,
}

#[derive(Debug, Deserialize)]
pub struct SetStatusRequest {
    pub status: VaultStatus,
}

#[derive(Debug, Deserialize)]
pub struct DailyLimitRequest {
    pub max_daily_withdrawal: u64,
}

/// Body of `PUT /oracle/prices/:asset`. Omitted fields default to a quote
/// published now and marked valid.
#[derive(Debug, Deserialize)]
pub struct PriceUpdateRequest {
    pub price: u128,
    #[serde(default)]
    pub confidence: u128,
    pub timestamp: Option<i64>,
    #[serde(default)]
    pub decimals: u8,
    pub valid: Option<bool>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SharesResponse {
    pub shares: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AssetsResponse {
    pub assets: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BorrowResponse {
    pub borrowed: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DepositAndBorrowResponse {
    pub shares: u64,
    pub borrowed: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RepayAndWithdrawResponse {
    pub repay: RepayOutcome,
    pub assets: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CollectedResponse {
    pub collected: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PausedResponse {
    pub paused: usize,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Checks `Authorization: Bearer <uuid>` against `expected`.
fn require_token(headers: &HeaderMap, expected: Uuid) -> Result<(), ApiError> {
    let presented = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .and_then(|token| Uuid::parse_str(token.trim()).ok());

    match presented {
        Some(token) if token == expected => Ok(()),
        _ => {
            tracing::warn!("rejected request with missing or invalid bearer token");
            Err(ApiError::Unauthorized)
        }
    }
}

fn parse_asset(raw: &str) -> Result<AssetId, ApiError> {
    raw.parse()
        .map_err(|e| ApiError::BadRequest(format!("invalid asset {raw:?}: {e}")))
}

/// Runs `op` against the vault for `asset` under the registry write lock,
/// bumps `counter` on success (or the rejection counter on failure), and
/// refreshes the book gauges.
fn with_vault<T>(
    state: &AppState,
    asset: &str,
    counters: &[&IntCounter],
    op: impl FnOnce(&mut Vault, &TxContext) -> Result<T, VaultError>,
) -> Result<T, ApiError> {
    let asset = parse_asset(asset)?;
    let ctx = (state.clock)();
    let mut registry = state.registry.write();
    let result = registry.vault_mut(&asset).and_then(|vault| op(vault, &ctx));
    match result {
        Ok(value) => {
            for counter in counters {
                counter.inc();
            }
            state.metrics.observe_registry(&registry);
            Ok(value)
        }
        Err(err) => {
            state.metrics.rejected_operations_total.inc();
            tracing::debug!(asset = %asset, error = %err, "operation rejected");
            Err(err.into())
        }
    }
}

fn summary(state: &AppState, asset: &AssetId) -> Result<VaultSummary, ApiError> {
    let registry = state.registry.read();
    Ok(VaultSummary::from(registry.vault(asset)?))
}

// ---------------------------------------------------------------------------
// Handlers: node
// ---------------------------------------------------------------------------

/// `GET /health`: returns 200 if the node is alive.
///
/// This is the liveness probe for orchestrators (k8s, systemd, etc.).
/// It intentionally does not check internal state; that belongs in
/// `/status`.
async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, Json(serde_json::json!({ "status": "ok" })))
}

/// `GET /status`: node summary.
async fn status_handler(State(state): State<AppState>) -> Json<StatusResponse> {
    let registry = state.registry.read();
    let (total_assets, total_borrowed) =
        registry.vaults().fold((0u128, 0u128), |(a, b), v| {
            (
                a + u128::from(v.total_assets()),
                b + u128::from(v.borrowed_principal()),
            )
        });
    let now = Utc::now();
    Json(StatusResponse {
        version: state.version.clone(),
        vaults: registry.len(),
        total_assets,
        total_borrowed,
        oracle_paused: state.oracle.read().is_paused(),
        uptime_secs: (now - state.started_at).num_seconds(),
        timestamp: now.to_rfc3339(),
    })
}

// ---------------------------------------------------------------------------
// Handlers: vaults
// ---------------------------------------------------------------------------

async fn list_vaults_handler(State(state): State<AppState>) -> Json<Vec<VaultSummary>> {
    let registry = state.registry.read();
    Json(registry.vaults().map(VaultSummary::from).collect())
}

async fn create_vault_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<CreateVaultRequest>,
) -> Result<(StatusCode, Json<VaultSummary>), ApiError> {
    require_token(&headers, state.admin_cap.id())?;
    let config = req.config.unwrap_or(state.defaults.config);
    let max_daily = req
        .max_daily_withdrawal
        .unwrap_or(state.defaults.max_daily_withdrawal);

    let mut registry = state.registry.write();
    if let Err(err) = registry.create_vault(
        &state.admin_cap,
        req.asset.clone(),
        config,
        max_daily,
        &(state.clock)(),
    ) {
        state.metrics.rejected_operations_total.inc();
        return Err(err.into());
    }
    state.metrics.observe_registry(&registry);
    let summary = VaultSummary::from(registry.vault(&req.asset)?);
    Ok((StatusCode::CREATED, Json(summary)))
}

async fn vault_handler(
    State(state): State<AppState>,
    Path(asset): Path<String>,
) -> ApiResult<VaultSummary> {
    let asset = parse_asset(&asset)?;
    Ok(Json(summary(&state, &asset)?))
}

async fn deposit_handler(
    State(state): State<AppState>,
    Path(asset): Path<String>,
    Json(req): Json<DepositRequest>,
) -> ApiResult<SharesResponse> {
    let shares = with_vault(&state, &asset, &[&state.metrics.deposits_total], |v, ctx| {
        v.deposit(req.assets, ctx)
    })?;
    Ok(Json(SharesResponse { shares }))
}

async fn withdraw_handler(
    State(state): State<AppState>,
    Path(asset): Path<String>,
    Json(req): Json<WithdrawRequest>,
) -> ApiResult<AssetsResponse> {
    let assets = with_vault(&state, &asset, &[&state.metrics.withdrawals_total], |v, ctx| {
        v.withdraw(req.shares, ctx)
    })?;
    Ok(Json(AssetsResponse { assets }))
}

async fn borrow_handler(
    State(state): State<AppState>,
    Path(asset): Path<String>,
    headers: HeaderMap,
    Json(req): Json<AmountRequest>,
) -> ApiResult<BorrowResponse> {
    require_token(&headers, state.credit_cap.id())?;
    let borrowed = with_vault(&state, &asset, &[&state.metrics.borrows_total], |v, ctx| {
        v.borrow(&state.credit_cap, req.amount, ctx)
    })?;
    Ok(Json(BorrowResponse { borrowed }))
}

async fn repay_handler(
    State(state): State<AppState>,
    Path(asset): Path<String>,
    headers: HeaderMap,
    Json(req): Json<AmountRequest>,
) -> ApiResult<RepayOutcome> {
    require_token(&headers, state.credit_cap.id())?;
    let outcome = with_vault(&state, &asset, &[&state.metrics.repays_total], |v, ctx| {
        v.repay(&state.credit_cap, req.amount, ctx)
    })?;
    Ok(Json(outcome))
}

async fn deposit_and_borrow_handler(
    State(state): State<AppState>,
    Path(asset): Path<String>,
    headers: HeaderMap,
    Json(req): Json<DepositAndBorrowRequest>,
) -> ApiResult<DepositAndBorrowResponse> {
    require_token(&headers, state.credit_cap.id())?;
    let (shares, borrowed) = with_vault(
        &state,
        &asset,
        &[&state.metrics.deposits_total, &state.metrics.borrows_total],
        |v, ctx| {
            v.deposit_and_borrow(&state.credit_cap, req.deposit_assets, req.borrow_amount, ctx)
        },
    )?;
    Ok(Json(DepositAndBorrowResponse { shares, borrowed }))
}

async fn repay_and_withdraw_handler(
    State(state): State<AppState>,
    Path(asset): Path<String>,
    headers: HeaderMap,
    Json(req): Json<RepayAndWithdrawRequest>,
) -> ApiResult<RepayAndWithdrawResponse> {
    require_token(&headers, state.credit_cap.id())?;
    let (repay, assets) = with_vault(
        &state,
        &asset,
        &[&state.metrics.repays_total, &state.metrics.withdrawals_total],
        |v, ctx| {
            v.repay_and_withdraw(&state.credit_cap, req.repay_amount, req.shares, ctx)
        },
    )?;
    Ok(Json(RepayAndWithdrawResponse { repay, assets }))
}

// ---------------------------------------------------------------------------
// Handlers: admin
// ---------------------------------------------------------------------------

/// Runs an admin operation on one vault and returns the updated summary.
fn admin_op(
    state: &AppState,
    headers: &HeaderMap,
    asset: &str,
    op: impl FnOnce(&mut Vault, &AdminCap, &TxContext) -> Result<(), VaultError>,
) -> ApiResult<VaultSummary> {
    require_token(headers, state.admin_cap.id())?;
    with_vault(state, asset, &[], |v, ctx| op(v, &state.admin_cap, ctx))?;
    Ok(Json(summary(state, &parse_asset(asset)?)?))
}

async fn set_status_handler(
    State(state): State<AppState>,
    Path(asset): Path<String>,
    headers: HeaderMap,
    Json(req): Json<SetStatusRequest>,
) -> ApiResult<VaultSummary> {
    admin_op(&state, &headers, &asset, |v, cap, ctx| match req.status {
        VaultStatus::Active => v.resume(cap, ctx),
        VaultStatus::Paused => v.pause(cap, ctx),
        VaultStatus::DepositsOnly => v.set_deposits_only(cap, ctx),
        VaultStatus::WithdrawalsOnly => v.set_withdrawals_only(cap, ctx),
        VaultStatus::Inactive => v.deactivate(cap, ctx),
    })
}

async fn update_config_handler(
    State(state): State<AppState>,
    Path(asset): Path<String>,
    headers: HeaderMap,
    Json(config): Json<VaultConfig>,
) -> ApiResult<VaultSummary> {
    admin_op(&state, &headers, &asset, |v, cap, ctx| {
        v.update_config(cap, config, ctx)
    })
}

async fn update_daily_limit_handler(
    State(state): State<AppState>,
    Path(asset): Path<String>,
    headers: HeaderMap,
    Json(req): Json<DailyLimitRequest>,
) -> ApiResult<VaultSummary> {
    admin_op(&state, &headers, &asset, |v, cap, ctx| {
        v.update_daily_limit(cap, req.max_daily_withdrawal, ctx)
    })
}

async fn reset_daily_limit_handler(
    State(state): State<AppState>,
    Path(asset): Path<String>,
    headers: HeaderMap,
) -> ApiResult<VaultSummary> {
    admin_op(&state, &headers, &asset, |v, cap, ctx| {
        v.reset_daily_limit(cap, ctx)
    })
}

async fn force_day_handler(
    State(state): State<AppState>,
    Path(asset): Path<String>,
    headers: HeaderMap,
) -> ApiResult<VaultSummary> {
    admin_op(&state, &headers, &asset, |v, cap, ctx| {
        v.force_update_day_counter(cap, ctx)
    })
}

async fn emergency_pause_handler(
    State(state): State<AppState>,
    Path(asset): Path<String>,
    headers: HeaderMap,
) -> ApiResult<VaultSummary> {
    admin_op(&state, &headers, &asset, |v, cap, ctx| {
        v.emergency_pause(cap, ctx)
    })
}

async fn upgrade_schema_handler(
    State(state): State<AppState>,
    Path(asset): Path<String>,
    headers: HeaderMap,
) -> ApiResult<VaultSummary> {
    admin_op(&state, &headers, &asset, |v, cap, ctx| {
        v.upgrade_schema(cap, ctx)
    })
}

async fn collect_fees_handler(
    State(state): State<AppState>,
    Path(asset): Path<String>,
    headers: HeaderMap,
) -> ApiResult<CollectedResponse> {
    require_token(&headers, state.admin_cap.id())?;
    let collected = with_vault(&state, &asset, &[], |v, ctx| {
        v.collect_fees(&state.admin_cap, ctx)
    })?;
    Ok(Json(CollectedResponse { collected }))
}

async fn global_emergency_pause_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<PausedResponse> {
    require_token(&headers, state.admin_cap.id())?;
    let mut registry = state.registry.write();
    let paused = registry.global_emergency_pause(&state.admin_cap, &(state.clock)())?;
    Ok(Json(PausedResponse { paused }))
}

async fn set_price_handler(
    State(state): State<AppState>,
    Path(asset): Path<String>,
    headers: HeaderMap,
    Json(req): Json<PriceUpdateRequest>,
) -> ApiResult<PriceQuote> {
    require_token(&headers, state.admin_cap.id())?;
    let asset = parse_asset(&asset)?;
    let quote = PriceQuote {
        price: req.price,
        confidence: req.confidence,
        timestamp: req.timestamp.unwrap_or_else(|| (state.clock)().now.timestamp()),
        decimals: req.decimals,
        valid: req.valid.unwrap_or(true),
    };
    state.oracle.write().set_price(asset, quote);
    Ok(Json(quote))
}

// ---------------------------------------------------------------------------
// Handlers: risk
// ---------------------------------------------------------------------------

async fn risk_health_handler(
    State(state): State<AppState>,
    Json(position): Json<Position>,
) -> Json<PositionHealth> {
    let oracle = state.oracle.read();
    let engine = RiskEngine::new(&*oracle);
    Json(engine.calculate_position_health(&position, &(state.clock)()))
}

async fn risk_liquidation_handler(
    State(state): State<AppState>,
    Json(position): Json<Position>,
) -> Json<LiquidationCheck> {
    let oracle = state.oracle.read();
    let engine = RiskEngine::new(&*oracle);
    Json(engine.check_liquidation_eligibility(&position, &(state.clock)()))
}

async fn risk_capacity_handler(
    State(state): State<AppState>,
    Json(position): Json<Position>,
) -> Json<BorrowingCapacity> {
    let oracle = state.oracle.read();
    let engine = RiskEngine::new(&*oracle);
    Json(engine.calculate_borrowing_capacity(&position, &(state.clock)()))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
