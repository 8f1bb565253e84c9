//! REST API handlers for the endor server
//!
//! This module defines the API routes, the wire DTOs, and the mapping from
//! domain errors to HTTP responses.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::error::{EndorErrorTrait, Error};
use crate::fleet::{FleetError, StatusReport};
use crate::metrics;
use crate::models::{AttackReport, Coordinate, Enemy, EnemyType, Radar, Scan};
use crate::protocol::ProtocolType;

use super::server::AppState;

// ============================================================================
// Request Types
// ============================================================================

/// Body of `POST /attack`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttackRequest {
    pub protocols: Vec<String>,
    pub scan: Vec<ScanRecord>,
}

/// One scan entry as sent by callers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanRecord {
    #[serde(alias = "coordinate")]
    pub coordinates: CoordinateRecord,

    #[serde(alias = "enemy")]
    pub enemies: EnemyRecord,

    #[serde(default)]
    pub allies: u32,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CoordinateRecord {
    pub x: u32,
    pub y: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnemyRecord {
    #[serde(rename = "type")]
    pub kind: String,

    #[serde(alias = "count")]
    pub number: u32,
}

impl AttackRequest {
    /// Resolve protocol tags and enemy types into a [`Radar`]
    pub fn into_radar(self) -> Result<Radar, Error> {
        let protocols = self
            .protocols
            .iter()
            .map(|tag| {
                if tag.trim().is_empty() {
                    Err(Error::invalid_request("protocol tags must not be empty"))
                } else {
                    tag.parse::<ProtocolType>()
                }
            })
            .collect::<Result<Vec<_>, _>>()?;

        let scan = self
            .scan
            .into_iter()
            .map(|record| -> Result<Scan, Error> {
                let kind = EnemyType::parse(&record.enemies.kind)
                    .ok_or_else(|| Error::InvalidEnemyType(record.enemies.kind.clone()))?;
                Ok(Scan::new(
                    Coordinate::new(record.coordinates.x, record.coordinates.y),
                    Enemy::new(kind, record.enemies.number),
                    record.allies,
                ))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Radar::new(protocols, scan))
    }
}

// ============================================================================
// Response Types
// ============================================================================

/// Error payload returned for every failed request
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub status: String,
    pub error: String,
    pub kind: String,
}

impl ErrorResponse {
    pub fn new(status: StatusCode, error: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            status: status.canonical_reason().unwrap_or("Unknown").to_string(),
            error: error.into(),
            kind: kind.into(),
        }
    }
}

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
    pub cannons: usize,
}

/// One cannon's answer in a status round
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CannonStatusEntry {
    pub index: usize,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub available: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generation: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<&StatusReport> for CannonStatusEntry {
    fn from(report: &StatusReport) -> Self {
        let (available, generation, error) = match &report.outcome {
            Ok(status) => (Some(status.available), Some(status.generation), None),
            Err(e) => (None, None, Some(e.to_string())),
        };

        Self {
            index: report.index,
            name: report.cannon.clone(),
            available,
            generation,
            error,
        }
    }
}

/// Response of `GET /api/cannons`
#[derive(Debug, Serialize, Deserialize)]
pub struct CannonsResponse {
    pub cannons: Vec<CannonStatusEntry>,
    pub available: usize,
    pub checked_at: DateTime<Utc>,
}

impl CannonsResponse {
    pub fn from_reports(reports: &[StatusReport]) -> Self {
        Self {
            cannons: reports.iter().map(CannonStatusEntry::from).collect(),
            available: reports
                .iter()
                .filter(|r| r.available_generation().is_some())
                .count(),
            checked_at: Utc::now(),
        }
    }
}

// ============================================================================
// Error Mapping
// ============================================================================

/// HTTP status for a domain error
pub fn status_for(error: &Error) -> StatusCode {
    match error {
        Error::InvalidProtocolTag(_)
        | Error::InvalidEnemyType(_)
        | Error::InvalidRequest(_)
        | Error::Json(_) => StatusCode::BAD_REQUEST,
        Error::EmptyTargetSet => StatusCode::UNPROCESSABLE_ENTITY,
        Error::Fleet(
            FleetError::NoBackendAvailable { .. } | FleetError::Cancelled | FleetError::PoolClosed,
        ) => StatusCode::SERVICE_UNAVAILABLE,
        Error::Fleet(FleetError::FireCommandFailed { .. }) => StatusCode::BAD_GATEWAY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// A domain error rendered as an HTTP response
#[derive(Debug)]
pub struct ApiError(pub Error);

impl From<Error> for ApiError {
    fn from(error: Error) -> Self {
        Self(error)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = status_for(&self.0);
        if status.is_server_error() {
            tracing::error!(error = %self.0, kind = self.0.kind(), "Request failed");
        } else {
            tracing::debug!(error = %self.0, kind = self.0.kind(), "Request rejected");
        }

        (
            status,
            Json(ErrorResponse::new(status, self.0.to_string(), self.0.kind())),
        )
            .into_response()
    }
}

// ============================================================================
// API Routes
// ============================================================================

/// Routes that fire cannons
///
/// These must never sit under a request timeout: a sent fire command cannot
/// be recalled, so the response has to wait for it. The fleet deadlines
/// bound how long that takes.
pub fn attack_routes(state: AppState) -> Router {
    Router::new()
        .route("/attack", post(attack))
        .with_state(state)
}

/// Read-only routes
pub fn query_routes(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health_check))
        .route("/api/cannons", get(list_cannons))
        .route("/metrics", get(metrics_handler))
        .with_state(state)
}

// ============================================================================
// Handlers
// ============================================================================

/// Run one attack
///
/// The attack runs on its own task. If the client goes away the request
/// token is cancelled, which stops the attack unless the fire command has
/// already been sent.
async fn attack(
    State(state): State<AppState>,
    payload: Result<Json<AttackRequest>, JsonRejection>,
) -> Result<Json<AttackReport>, ApiError> {
    let Json(request) = payload.map_err(|rejection| {
        metrics::record_attack("invalid_request");
        ApiError(Error::invalid_request(rejection.body_text()))
    })?;

    let radar = request.into_radar().inspect_err(|e| {
        metrics::record_attack(e.kind());
    })?;

    let cancel = CancellationToken::new();
    let _guard = cancel.clone().drop_guard();
    let service = state.service.clone();

    let report = tokio::spawn(async move { service.attack_with_cancel(&radar, &cancel).await })
        .await
        .map_err(|e| Error::with_source("attack task failed", e))??;

    Ok(Json(report))
}

/// Health check endpoint
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.start_time.elapsed().as_secs(),
        cannons: state.service.cannon_count(),
    })
}

/// Run one status round and list every cannon's answer
async fn list_cannons(State(state): State<AppState>) -> impl IntoResponse {
    let reports = state.service.fleet_status().await;
    Json(CannonsResponse::from_reports(&reports))
}

/// Prometheus text exposition
async fn metrics_handler() -> Response {
    match metrics::encode_metrics() {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            body,
        )
            .into_response(),
        Err(e) => ApiError(Error::other(format!("failed to encode metrics: {e}"))).into_response(),
    }
}

// ============================================================================
// Tests
// ============================================================================
