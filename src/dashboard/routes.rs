//! Dashboard API route handlers.
//!
//! All endpoints return JSON and are read-only. State is shared via
//! `Arc<DashboardState>`; every request filters a cached evaluation and
//! never recomputes scores or ranks.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::analytics::summary::SlateSummary;
use crate::engine::board::{SlateBoard, SlateInfo};
use crate::strategy::Evaluation;
use crate::types::{
    Diagnostic, FilterCriteria, GroupBy, LegBucket, ParlayRow, PropRow, PropSort, SlateRef, ViewRequest,
};

// ---------------------------------------------------------------------------
// Shared state
// ---------------------------------------------------------------------------

/// Shared state accessible by all route handlers.
pub struct DashboardState {
    pub board: Arc<SlateBoard>,
    pub default_sport: String,
    pub default_slate: String,
    pub refresh_log: RwLock<Vec<RefreshLogEntry>>,
}

impl DashboardState {
    pub fn new(board: Arc<SlateBoard>, default_sport: &str, default_slate: &str) -> Self {
        Self {
            board,
            default_sport: default_sport.to_string(),
            default_slate: default_slate.to_string(),
            refresh_log: RwLock::new(Vec::new()),
        }
    }

    /// Record a refresh cycle, keeping the most recent 100.
    pub async fn record_refresh(&self, entry: RefreshLogEntry) {
        let mut log = self.refresh_log.write().await;
        log.push(entry);
        let excess = log.len().saturating_sub(100);
        log.drain(..excess);
    }

    async fn evaluation(&self, query: &SlateQuery) -> Result<Arc<Evaluation>, ApiError> {
        let sport = pick(&query.sport, &self.default_sport);
        let slate = pick(&query.slate, &self.default_slate);
        self.board
            .evaluation(sport, slate)
            .await
            .ok_or_else(|| ApiError::NotFound(format!("No snapshot for {sport}/{slate}")))
    }
}

/// Query value, else the configured default.
fn pick<'a>(value: &'a Option<String>, default: &'a str) -> &'a str {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .unwrap_or(default)
}

pub type AppState = Arc<DashboardState>;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    BadRequest(String),
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
        };
        (status, Json(ErrorBody { error: self.to_string() })).into_response()
    }
}

fn parse_opt<T: std::str::FromStr<Err = anyhow::Error>>(value: &Option<String>) -> Result<Option<T>, ApiError> {
    value
        .as_deref()
        .map(|v| v.parse::<T>().map_err(|e| ApiError::BadRequest(e.to_string())))
        .transpose()
}

// ---------------------------------------------------------------------------
// Queries and responses
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SlateQuery {
    pub sport: Option<String>,
    pub slate: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PropsQuery {
    pub sport: Option<String>,
    pub slate: Option<String>,
    pub position: Option<String>,
    pub team: Option<String>,
    pub category: Option<String>,
    pub sort: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ParlaysQuery {
    pub sport: Option<String>,
    pub slate: Option<String>,
    pub group: Option<String>,
    pub legs: Option<String>,
    pub position: Option<String>,
    pub team: Option<String>,
    pub category: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PropsResponse {
    pub source: SlateRef,
    pub sort: PropSort,
    pub props: Vec<PropRow>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ParlaysResponse {
    pub source: SlateRef,
    pub group_by: GroupBy,
    pub legs: LegBucket,
    pub parlays: Vec<ParlayRow>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DiagnosticsResponse {
    pub source: SlateRef,
    pub diagnostics: Vec<Diagnostic>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RefreshLogEntry {
    pub timestamp: String,
    pub batches: usize,
    pub props_received: usize,
    pub slates: Vec<String>,
    pub status: String,
}

// ---------------------------------------------------------------------------
// Route handlers
// ---------------------------------------------------------------------------

/// GET /api/slates
pub async fn get_slates(State(state): State<AppState>) -> Json<Vec<SlateInfo>> {
    Json(state.board.slates().await)
}

/// GET /api/props
pub async fn get_props(
    State(state): State<AppState>,
    Query(q): Query<PropsQuery>,
) -> Result<Json<PropsResponse>, ApiError> {
    let sort: PropSort = parse_opt(&q.sort)?.unwrap_or_default();
    let slate_query = SlateQuery {
        sport: q.sport.clone(),
        slate: q.slate.clone(),
    };
    let evaluation = state.evaluation(&slate_query).await?;

    let request = ViewRequest {
        criteria: FilterCriteria {
            position: q.position,
            team: q.team,
            category: q.category,
            ..FilterCriteria::default()
        },
        group_by: None,
        sort,
    };
    Ok(Json(PropsResponse {
        source: evaluation.source.clone(),
        sort,
        props: evaluation.prop_rows(&request),
    }))
}

/// GET /api/parlays
pub async fn get_parlays(
    State(state): State<AppState>,
    Query(q): Query<ParlaysQuery>,
) -> Result<Json<ParlaysResponse>, ApiError> {
    let group_by: GroupBy = parse_opt(&q.group)?.unwrap_or(GroupBy::Position);
    let legs: LegBucket = parse_opt(&q.legs)?.unwrap_or_default();
    let slate_query = SlateQuery {
        sport: q.sport.clone(),
        slate: q.slate.clone(),
    };
    let evaluation = state.evaluation(&slate_query).await?;

    let criteria = FilterCriteria {
        position: q.position,
        team: q.team,
        category: q.category,
        legs,
        ..FilterCriteria::default()
    };
    Ok(Json(ParlaysResponse {
        source: evaluation.source.clone(),
        group_by,
        legs,
        parlays: evaluation.parlay_rows(group_by, &criteria),
    }))
}

/// GET /api/summary
pub async fn get_summary(
    State(state): State<AppState>,
    Query(q): Query<SlateQuery>,
) -> Result<Json<SlateSummary>, ApiError> {
    let evaluation = state.evaluation(&q).await?;
    Ok(Json(evaluation.summary.clone()))
}

/// GET /api/diagnostics
pub async fn get_diagnostics(
    State(state): State<AppState>,
    Query(q): Query<SlateQuery>,
) -> Result<Json<DiagnosticsResponse>, ApiError> {
    let evaluation = state.evaluation(&q).await?;
    Ok(Json(DiagnosticsResponse {
        source: evaluation.source.clone(),
        diagnostics: evaluation.diagnostics.clone(),
    }))
}

/// GET /api/refreshes
pub async fn get_refreshes(State(state): State<AppState>) -> Json<Vec<RefreshLogEntry>> {
    Json(state.refresh_log.read().await.clone())
}

/// GET /health
pub async fn health() -> StatusCode {
    StatusCode::OK
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
