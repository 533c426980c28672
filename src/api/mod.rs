//! HTTP triggers for UE provisioning
//!
//! Form-style triggers (`/add_pod`, `/remove_all`, ...) answer with a 303 back
//! to the index page. The JSON webhooks answer with the [`StepReport`] of the
//! run, or a 400 with an `{"error": ...}` body when the input is unusable.
//! Bad input never reaches the lifecycle manager.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::lifecycle::{LifecycleManager, StepReport};
use crate::metrics::{self, Gauges};
use crate::ue::UeId;
use crate::Error;

/// HTTP-facing errors
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request could not be turned into a UE id
    #[error("{0}")]
    BadRequest(String),

    /// The operation failed outside the per-step model
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<Error> for ApiError {
    fn from(e: Error) -> Self {
        match e {
            Error::Validation(msg) => ApiError::BadRequest(msg),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Internal(msg) => {
                warn!(error = %msg, "request failed");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        (status, Json(serde_json::json!({"error": self.to_string()}))).into_response()
    }
}

/// Shared state behind every handler
pub struct ApiState {
    /// Runs provision/decommission
    pub manager: Arc<LifecycleManager>,
    /// Gauges rendered by `/metrics`
    pub gauges: Arc<Gauges>,
    /// Size of the bulk triggers' id range
    pub bulk_count: u32,
}

impl ApiState {
    /// Bundle the handler state
    pub fn new(manager: Arc<LifecycleManager>, gauges: Arc<Gauges>, bulk_count: u32) -> Self {
        Self {
            manager,
            gauges,
            bulk_count,
        }
    }
}

/// Build the router with every trigger and query route
pub fn router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/healthz", get(|| async { "ok" }))
        .route("/add_all", post(add_all))
        .route("/add_pod", post(add_pod))
        .route("/remove_all", post(remove_all))
        .route("/remove_pod/{ue_id}", post(remove_pod))
        .route("/webhook/connect", post(webhook_connect))
        .route("/webhook/disconnect", post(webhook_disconnect))
        .route("/api/ue-count", get(ue_count))
        .route("/api/ue-list", get(ue_list))
        .route("/metrics", get(metrics_text))
        .with_state(state)
}

/// Response of `/api/ue-count`
#[derive(Debug, Serialize)]
pub struct CountResponse {
    /// Number of provisioned UEs
    pub count: usize,
}

/// Response of `/api/ue-list`
#[derive(Debug, Serialize)]
pub struct ListResponse {
    /// Provisioned UE ids, ascending
    pub ues: Vec<UeId>,
}

async fn index(State(state): State<Arc<ApiState>>) -> Result<String, ApiError> {
    let ues = state.manager.active_ues()?;
    let ids: Vec<String> = ues.iter().map(ToString::to_string).collect();
    Ok(format!(
        "nexslice: {} active UE(s) in namespace {}\nUEs: [{}]\nUPFs: {}\n",
        ues.len(),
        state.manager.namespace(),
        ids.join(", "),
        state.gauges.active_upfs(),
    ))
}

async fn add_all(State(state): State<Arc<ApiState>>) -> Redirect {
    state.manager.bulk_provision(state.bulk_count).await;
    Redirect::to("/")
}

async fn add_pod(State(state): State<Arc<ApiState>>) -> Result<Redirect, ApiError> {
    let report = state.manager.provision_next().await?;
    info!(ue_id = %report.ue_id, "provisioned next UE");
    Ok(Redirect::to("/"))
}

async fn remove_all(State(state): State<Arc<ApiState>>) -> Redirect {
    state
        .manager
        .bulk_decommission(1..=state.bulk_count)
        .await;
    Redirect::to("/")
}

async fn remove_pod(
    State(state): State<Arc<ApiState>>,
    Path(raw): Path<String>,
) -> Result<Redirect, ApiError> {
    let id: UeId = raw.parse()?;
    state.manager.decommission(id).await;
    Ok(Redirect::to("/"))
}

async fn webhook_connect(
    State(state): State<Arc<ApiState>>,
    body: Bytes,
) -> Result<Json<StepReport>, ApiError> {
    let id = parse_webhook_body(&body)?;
    let report = state
        .manager
        .provision(id, state.manager.default_upf())
        .await;
    Ok(Json(report))
}

async fn webhook_disconnect(
    State(state): State<Arc<ApiState>>,
    body: Bytes,
) -> Result<Json<StepReport>, ApiError> {
    let id = parse_webhook_body(&body)?;
    Ok(Json(state.manager.decommission(id).await))
}

async fn ue_count(State(state): State<Arc<ApiState>>) -> Result<Json<CountResponse>, ApiError> {
    let count = state.manager.active_ues()?.len();
    Ok(Json(CountResponse { count }))
}

async fn ue_list(State(state): State<Arc<ApiState>>) -> Result<Json<ListResponse>, ApiError> {
    let ues = state.manager.active_ues()?;
    Ok(Json(ListResponse { ues }))
}

async fn metrics_text(State(state): State<Arc<ApiState>>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, metrics::CONTENT_TYPE)],
        state.gauges.render(),
    )
}

/// Extract a positive `ue_id` from a webhook body
///
/// Anything other than a JSON object with an integer `ue_id` in `1..=u32::MAX`
/// is rejected.
fn parse_webhook_body(body: &[u8]) -> Result<UeId, ApiError> {
    let value: serde_json::Value = serde_json::from_slice(body)
        .map_err(|e| ApiError::BadRequest(format!("invalid JSON body: {e}")))?;
    let raw = value
        .get("ue_id")
        .ok_or_else(|| ApiError::BadRequest("missing field ue_id".to_string()))?;
    let n = raw
        .as_i64()
        .ok_or_else(|| ApiError::BadRequest(format!("ue_id must be an integer, got {raw}")))?;
    Ok(UeId::try_from(n)?)
}
