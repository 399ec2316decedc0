//! # REST + JSON-RPC API
//!
//! Builds the axum router that exposes the asset ledger over HTTP. All
//! endpoints share application state through axum's `State` extractor.
//!
//! ## Endpoints
//!
//! | Method | Path                    | Description                         |
//! |--------|-------------------------|-------------------------------------|
//! | GET    | `/health`               | Liveness probe                      |
//! | GET    | `/status`               | Node status summary                 |
//! | GET    | `/assets`               | Every record in the world state     |
//! | POST   | `/assets`               | Create an asset                     |
//! | GET    | `/assets/:id`           | Stored record text                  |
//! | PUT    | `/assets/:id`           | Replace an existing asset           |
//! | DELETE | `/assets/:id`           | Remove an existing asset            |
//! | GET    | `/assets/:id/exists`    | Existence check                     |
//! | POST   | `/assets/:id/transfer`  | Change owner                        |
//! | POST   | `/rpc`                  | JSON-RPC 2.0 gateway                |
//!
//! ## Error Mapping
//!
//! | Ledger error       | HTTP | JSON-RPC |
//! |--------------------|------|----------|
//! | not found          | 404  | -32001   |
//! | validation         | 400  | -32602   |
//! | undecodable record | 422  | -32002   |
//! | store / serialize  | 500  | -32603   |

use axum::{
    extract::{Path, State},
    http::{header, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;
use tokio::task;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use bikechain_contracts::asset::parse_price;
use bikechain_contracts::seed::init_ledger;
use bikechain_contracts::{AssetLedger, Entry, LedgerError, LedgerResult, ValidationError};
use bikechain_protocol::config::{DOC_TYPE, OPEN_BOUND, UNASSIGNED_OWNER};
use bikechain_protocol::storage::{SledStore, StateStore, StoreError};

use crate::metrics::SharedMetrics;

// ---------------------------------------------------------------------------
// Application State
// ---------------------------------------------------------------------------

/// The ledger as hosted by the node.
pub type SharedLedger = Arc<AssetLedger<SledStore>>;

/// Shared application state available to all request handlers.
///
/// Cheap to clone, everything behind `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// The node's reported version string.
    pub version: String,
    /// The asset ledger over the persistent world state.
    pub ledger: SharedLedger,
    /// Reference to Prometheus metrics for in-handler recording.
    pub metrics: SharedMetrics,
}

impl AppState {
    /// Runs one ledger call on the blocking pool and records its outcome and
    /// latency. Sled I/O never runs on an async worker thread.
    async fn call<T, F>(&self, operation: &'static str, f: F) -> LedgerResult<T>
    where
        F: FnOnce(&AssetLedger<SledStore>) -> LedgerResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let ledger = Arc::clone(&self.ledger);
        let started = Instant::now();
        let result = match task::spawn_blocking(move || f(&ledger)).await {
            Ok(result) => result,
            Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
            Err(e) => Err(LedgerError::Store(StoreError::Unavailable(format!(
                "ledger task did not complete: {}",
                e
            )))),
        };
        self.metrics.observe(operation, started.elapsed(), &result);
        result
    }

    async fn list_all(&self) -> LedgerResult<Vec<Entry>> {
        let entries = self.call("list_all", |ledger| ledger.list_all()).await?;
        let raw = entries.iter().filter(|e| e.record.is_raw()).count();
        self.metrics.undecodable_records_total.inc_by(raw as u64);
        Ok(entries)
    }
}

// ---------------------------------------------------------------------------
// Router Construction
// ---------------------------------------------------------------------------

/// Builds the full axum [`Router`] with all API routes, CORS, and tracing.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_handler))
        .route("/status", get(status_handler))
        .route("/rpc", post(rpc_handler))
        .route("/assets", get(list_assets_handler).post(create_asset_handler))
        .route(
            "/assets/:id",
            get(read_asset_handler)
                .put(update_asset_handler)
                .delete(delete_asset_handler),
        )
        .route("/assets/:id/exists", get(asset_exists_handler))
        .route("/assets/:id/transfer", post(transfer_asset_handler))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}

// ---------------------------------------------------------------------------
// JSON-RPC Types
// ---------------------------------------------------------------------------

/// A JSON-RPC 2.0 request envelope.
#[derive(Debug, Deserialize)]
pub struct JsonRpcRequest {
    /// Protocol version. Must be "2.0".
    pub jsonrpc: String,
    /// The method to invoke.
    pub method: String,
    /// Positional method parameters.
    pub params: Option<Value>,
    /// Request identifier. Echoed back in the response.
    pub id: Value,
}

/// A JSON-RPC 2.0 response envelope.
#[derive(Debug, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    /// Protocol version. Always "2.0".
    pub jsonrpc: String,
    /// The result on success.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    /// The error on failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
    /// Request identifier, echoed from the request.
    pub id: Value,
}

/// A JSON-RPC 2.0 error object.
#[derive(Debug, Serialize, Deserialize)]
pub struct JsonRpcError {
    /// Numeric error code.
    pub code: i32,
    /// Short human-readable error description.
    pub message: String,
    /// Optional structured error data.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

const INVALID_REQUEST: i32 = -32600;
const METHOD_NOT_FOUND: i32 = -32601;
const INVALID_PARAMS: i32 = -32602;
const INTERNAL_ERROR: i32 = -32603;
const ASSET_NOT_FOUND: i32 = -32001;
const UNDECODABLE_RECORD: i32 = -32002;

// ---------------------------------------------------------------------------
// Request / Response Types
// ---------------------------------------------------------------------------

/// A price given either as a JSON number or as decimal text.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PriceInput {
    Amount(u64),
    Text(String),
}

impl PriceInput {
    fn resolve(&self) -> Result<u64, ValidationError> {
        match self {
            PriceInput::Amount(price) => Ok(*price),
            PriceInput::Text(raw) => parse_price(raw),
        }
    }
}

fn unassigned_owner() -> String {
    UNASSIGNED_OWNER.to_string()
}

/// Body of `POST /assets`. Field names follow the stored record.
#[derive(Debug, Deserialize)]
pub struct CreateAssetRequest {
    #[serde(rename = "ID")]
    pub id: String,
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Category", default)]
    pub category: String,
    /// Defaults to the unassigned owner.
    #[serde(rename = "Owner", default = "unassigned_owner")]
    pub owner: String,
    #[serde(rename = "Price")]
    pub price: PriceInput,
}

/// Body of `PUT /assets/:id`.
#[derive(Debug, Deserialize)]
pub struct UpdateAssetRequest {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Category", default)]
    pub category: String,
    #[serde(rename = "Owner")]
    pub owner: String,
    #[serde(rename = "Price")]
    pub price: PriceInput,
}

/// Body of `POST /assets/:id/transfer`.
#[derive(Debug, Deserialize)]
pub struct TransferRequest {
    #[serde(rename = "NewOwner")]
    pub new_owner: String,
}

/// Response payload for `GET /status`.
#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    /// Node software version.
    pub version: String,
    /// Tag carried by asset records.
    pub doc_type: String,
    /// Keys currently in the world state, of any record kind.
    pub records: usize,
    /// ISO-8601 timestamp of the response.
    pub timestamp: String,
}

/// Response payload for `GET /assets/:id/exists`.
#[derive(Debug, Serialize, Deserialize)]
pub struct ExistsResponse {
    pub id: String,
    pub exists: bool,
}

/// Generic error body returned by REST endpoints on failure.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

// ---------------------------------------------------------------------------
// Error Mapping
// ---------------------------------------------------------------------------

fn status_for(err: &LedgerError) -> StatusCode {
    match err {
        LedgerError::NotFound(_) => StatusCode::NOT_FOUND,
        LedgerError::Validation(_) => StatusCode::BAD_REQUEST,
        LedgerError::Decode { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        LedgerError::Serialization { .. } | LedgerError::Store(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

fn error_response(err: LedgerError) -> Response {
    let status = status_for(&err);
    if status.is_server_error() {
        tracing::error!(error = %err, "ledger operation failed");
    }
    let body = ErrorResponse {
        error: err.to_string(),
    };
    (status, Json(body)).into_response()
}

fn rpc_error(err: LedgerError) -> JsonRpcError {
    let code = match &err {
        LedgerError::NotFound(_) => ASSET_NOT_FOUND,
        LedgerError::Validation(_) => INVALID_PARAMS,
        LedgerError::Decode { .. } => UNDECODABLE_RECORD,
        LedgerError::Serialization { .. } | LedgerError::Store(_) => {
            tracing::error!(error = %err, "ledger operation failed");
            INTERNAL_ERROR
        }
    };
    JsonRpcError {
        code,
        message: err.to_string(),
        data: None,
    }
}

fn invalid_params(message: impl Into<String>) -> JsonRpcError {
    JsonRpcError {
        code: INVALID_PARAMS,
        message: format!("Invalid params: {}", message.into()),
        data: None,
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// `GET /health`: returns 200 if the node is alive.
async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, Json(serde_json::json!({ "status": "ok" })))
}

/// `GET /status`: returns the node status summary.
async fn status_handler(State(state): State<AppState>) -> impl IntoResponse {
    let resp = StatusResponse {
        version: state.version.clone(),
        doc_type: DOC_TYPE.to_string(),
        records: state.ledger.store().len(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    };
    Json(resp)
}

/// `GET /assets`: every key in the world state with its decoded or raw
/// record.
async fn list_assets_handler(State(state): State<AppState>) -> Response {
    match state.list_all().await {
        Ok(entries) => Json(entries).into_response(),
        Err(e) => error_response(e),
    }
}

/// `POST /assets`: creates (or silently replaces) an asset and returns the
/// stored record.
async fn create_asset_handler(
    State(state): State<AppState>,
    Json(req): Json<CreateAssetRequest>,
) -> Response {
    let result = state
        .call("create", move |ledger| {
            let price = req.price.resolve()?;
            ledger.create(&req.id, &req.name, &req.category, &req.owner, price)
        })
        .await;

    match result {
        Ok(record) => (
            StatusCode::CREATED,
            [(header::CONTENT_TYPE, "application/json")],
            record,
        )
            .into_response(),
        Err(e) => error_response(e),
    }
}

/// `GET /assets/:id`: the stored record text, exactly as written.
async fn read_asset_handler(Path(id): Path<String>, State(state): State<AppState>) -> Response {
    match state.call("read", move |ledger| ledger.read(&id)).await {
        Ok(record) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "application/json")],
            record,
        )
            .into_response(),
        Err(e) => error_response(e),
    }
}

/// `GET /assets/:id/exists`
async fn asset_exists_handler(Path(id): Path<String>, State(state): State<AppState>) -> Response {
    let key = id.clone();
    match state.call("exists", move |ledger| ledger.exists(&key)).await {
        Ok(exists) => Json(ExistsResponse { id, exists }).into_response(),
        Err(e) => error_response(e),
    }
}

/// `PUT /assets/:id`: replaces every field of an existing asset.
async fn update_asset_handler(
    Path(id): Path<String>,
    State(state): State<AppState>,
    Json(req): Json<UpdateAssetRequest>,
) -> Response {
    let result = state
        .call("update", move |ledger| {
            let price = req.price.resolve()?;
            ledger.update(&id, &req.name, &req.category, &req.owner, price)
        })
        .await;

    match result {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => error_response(e),
    }
}

/// `DELETE /assets/:id`
async fn delete_asset_handler(Path(id): Path<String>, State(state): State<AppState>) -> Response {
    match state.call("delete", move |ledger| ledger.delete(&id)).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => error_response(e),
    }
}

/// `POST /assets/:id/transfer`: changes the owner, leaving every other
/// stored field untouched.
async fn transfer_asset_handler(
    Path(id): Path<String>,
    State(state): State<AppState>,
    Json(req): Json<TransferRequest>,
) -> Response {
    let result = state
        .call("transfer", move |ledger| ledger.transfer(&id, &req.new_owner))
        .await;
    match result {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => error_response(e),
    }
}

/// `POST /rpc`: JSON-RPC 2.0 gateway.
///
/// Method names and positional parameters follow the bike contract's
/// invocation surface (`CreateBike`, `ReadBike`, `GetAllBikes`, ...). The
/// `*Asset` spellings (`CreateAsset`, `GetAllAssets`, ...) are accepted as
/// aliases. Parameters are strings; numbers are accepted wherever a string is
/// expected and are used in their decimal form. Unknown methods return
/// -32601.
async fn rpc_handler(
    State(state): State<AppState>,
    Json(req): Json<JsonRpcRequest>,
) -> impl IntoResponse {
    if req.jsonrpc != "2.0" {
        return Json(JsonRpcResponse {
            jsonrpc: "2.0".into(),
            result: None,
            error: Some(JsonRpcError {
                code: INVALID_REQUEST,
                message: "Invalid Request: jsonrpc must be \"2.0\"".into(),
                data: None,
            }),
            id: req.id,
        });
    }

    let outcome = match req.params {
        None | Some(Value::Null) => dispatch(&state, &req.method, &[]).await,
        Some(Value::Array(params)) => dispatch(&state, &req.method, &params).await,
        Some(_) => Err(invalid_params("expected a positional array")),
    };

    let (result, error) = match outcome {
        Ok(value) => (Some(value), None),
        Err(e) => (None, Some(e)),
    };

    Json(JsonRpcResponse {
        jsonrpc: "2.0".into(),
        result,
        error,
        id: req.id,
    })
}

async fn dispatch(
    state: &AppState,
    method: &str,
    params: &[Value],
) -> Result<Value, JsonRpcError> {
    match method {
        "InitLedger" => {
            expect_arity(params, 0)?;
            let count = state
                .call("init_ledger", |ledger| init_ledger(ledger))
                .await
                .map_err(rpc_error)?;
            Ok(Value::from(count))
        }
        "CreateBike" | "CreateAsset" => {
            expect_arity(params, 5)?;
            let id = text_param(params, 0, "id")?;
            let name = text_param(params, 1, "name")?;
            let category = text_param(params, 2, "category")?;
            let owner = text_param(params, 3, "owner")?;
            let price = price_param(params, 4)?;
            let record = state
                .call("create", move |ledger| {
                    ledger.create(&id, &name, &category, &owner, price)
                })
                .await
                .map_err(rpc_error)?;
            serde_json::from_str(&record).map_err(internal_error)
        }
        "ReadBike" | "ReadAsset" => {
            expect_arity(params, 1)?;
            let id = text_param(params, 0, "id")?;
            let record = state
                .call("read", move |ledger| ledger.read(&id))
                .await
                .map_err(rpc_error)?;
            Ok(Value::String(record))
        }
        "UpdateBike" | "UpdateAsset" => {
            expect_arity(params, 5)?;
            let id = text_param(params, 0, "id")?;
            let name = text_param(params, 1, "name")?;
            let category = text_param(params, 2, "category")?;
            let owner = text_param(params, 3, "owner")?;
            let price = price_param(params, 4)?;
            state
                .call("update", move |ledger| {
                    ledger.update(&id, &name, &category, &owner, price)
                })
                .await
                .map_err(rpc_error)?;
            Ok(Value::Null)
        }
        "DeleteBike" | "DeleteAsset" => {
            expect_arity(params, 1)?;
            let id = text_param(params, 0, "id")?;
            state
                .call("delete", move |ledger| ledger.delete(&id))
                .await
                .map_err(rpc_error)?;
            Ok(Value::Null)
        }
        "BikeExists" | "AssetExists" => {
            expect_arity(params, 1)?;
            let id = text_param(params, 0, "id")?;
            let exists = state
                .call("exists", move |ledger| ledger.exists(&id))
                .await
                .map_err(rpc_error)?;
            Ok(Value::Bool(exists))
        }
        "TransferBike" | "TransferAsset" => {
            expect_arity(params, 2)?;
            let id = text_param(params, 0, "id")?;
            let new_owner = text_param(params, 1, "newOwner")?;
            state
                .call("transfer", move |ledger| ledger.transfer(&id, &new_owner))
                .await
                .map_err(rpc_error)?;
            Ok(Value::Null)
        }
        "GetAllBikes" | "GetAllAssets" => {
            expect_arity(params, 0)?;
            let entries = state.list_all().await.map_err(rpc_error)?;
            serde_json::to_value(entries).map_err(internal_error)
        }
        _ => Err(JsonRpcError {
            code: METHOD_NOT_FOUND,
            message: format!("Method not found: {}", method),
            data: None,
        }),
    }
}

fn expect_arity(params: &[Value], expected: usize) -> Result<(), JsonRpcError> {
    if params.len() != expected {
        return Err(invalid_params(format!(
            "expected {} arguments, got {}",
            expected,
            params.len()
        )));
    }
    Ok(())
}

fn text_param(params: &[Value], index: usize, name: &str) -> Result<String, JsonRpcError> {
    match params.get(index) {
        Some(Value::String(s)) => Ok(s.clone()),
        Some(Value::Number(n)) => Ok(n.to_string()),
        _ => Err(invalid_params(format!(
            "expected {} as a string at position {}",
            name, index
        ))),
    }
}

fn price_param(params: &[Value], index: usize) -> Result<u64, JsonRpcError> {
    match params.get(index) {
        Some(Value::Number(n)) => n
            .as_u64()
            .ok_or_else(|| invalid_params(format!("invalid price {}", n))),
        Some(Value::String(s)) => parse_price(s).map_err(|e| invalid_params(e.to_string())),
        _ => Err(invalid_params(format!(
            "expected price at position {}",
            index
        ))),
    }
}

fn internal_error(err: serde_json::Error) -> JsonRpcError {
    tracing::error!(error = %err, "failed to encode rpc result");
    JsonRpcError {
        code: INTERNAL_ERROR,
        message: format!("Internal error: {}", err),
        data: None,
    }
}

// ---------------------------------------------------------------------------
// Ledger Initialization
// ---------------------------------------------------------------------------

/// Seeds the sample bikes if the world state is empty.
///
/// Returns the number of records written. Any key at all, of any record
/// kind, counts as populated and makes this a no-op, so restarting a seeded
/// node never resets ownership.
pub fn initialize_ledger<S: StateStore>(ledger: &AssetLedger<S>) -> LedgerResult<usize> {
    let populated = ledger
        .store()
        .range_scan(OPEN_BOUND, OPEN_BOUND)?
        .next()
        .is_some();
    if populated {
        tracing::info!("world state already populated, skipping seed");
        return Ok(0);
    }

    let count = init_ledger(ledger)?;
    tracing::info!(count, "world state seeded");
    Ok(count)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
