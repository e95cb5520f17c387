// HTTP request handlers
use crate::application::indexed_dataset::Filter;
use crate::domain::dashboard::DashboardSnapshot;
use crate::domain::key::{Key, KeyKind};
use crate::domain::record::Record;
use crate::domain::stats::ParticipantStats;
use crate::error::DashboardError;
use crate::presentation::app_state::AppState;
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use std::sync::Arc;

/// Filter as sent by a client; keys are parsed against the widget's key kind.
#[derive(Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FilterRequest {
    All,
    Exact { key: String },
    Range { from: String, to: String },
    In { keys: Vec<String> },
}

impl FilterRequest {
    pub fn into_filter(self, kind: KeyKind) -> Result<Filter, DashboardError> {
        Ok(match self {
            FilterRequest::All => Filter::All,
            FilterRequest::Exact { key } => Filter::Exact {
                key: Key::parse(kind, &key)?,
            },
            FilterRequest::Range { from, to } => Filter::Range {
                from: Key::parse(kind, &from)?,
                to: Key::parse(kind, &to)?,
            },
            FilterRequest::In { keys } => Filter::In {
                keys: keys
                    .iter()
                    .map(|k| Key::parse(kind, k))
                    .collect::<Result<_, _>>()?,
            },
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct LayerRequest {
    pub visible: bool,
}

pub struct ApiError(DashboardError);

impl From<DashboardError> for ApiError {
    fn from(e: DashboardError) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self.0 {
            DashboardError::UnknownWidget(_)
            | DashboardError::UnknownLayer(_)
            | DashboardError::UnknownParticipant(_) => StatusCode::NOT_FOUND,
            DashboardError::InvalidKey { .. } => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        tracing::warn!("Request failed: {}", self.0);
        let body = serde_json::json!({ "error": self.0.to_string() });
        (status, Json(body)).into_response()
    }
}

/// Health check endpoint
pub async fn health_check() -> &'static str {
    "ok"
}

/// The normalized dataset
pub async fn get_data(State(state): State<Arc<AppState>>) -> Json<Vec<Record>> {
    let dashboard = state.dashboard.lock().await;
    Json(dashboard.records().to_vec())
}

/// Current state of every widget and overlay
pub async fn get_dashboard(State(state): State<Arc<AppState>>) -> Json<DashboardSnapshot> {
    Json(state.dashboard.lock().await.snapshot())
}

/// One participant's summary under the current filters
pub async fn get_participant(
    Path(participant): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Result<Json<ParticipantStats>, ApiError> {
    let dashboard = state.dashboard.lock().await;
    Ok(Json(dashboard.participant_stats(&participant)?.clone()))
}

pub async fn put_filter(
    Path(widget): Path<String>,
    State(state): State<Arc<AppState>>,
    Json(request): Json<FilterRequest>,
) -> Result<Json<DashboardSnapshot>, ApiError> {
    let mut dashboard = state.dashboard.lock().await;
    let filter = request.into_filter(dashboard.key_kind(&widget)?)?;
    dashboard.apply_filter(&widget, filter)?;
    Ok(Json(dashboard.snapshot()))
}

pub async fn delete_filter(
    Path(widget): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Result<Json<DashboardSnapshot>, ApiError> {
    let mut dashboard = state.dashboard.lock().await;
    dashboard.clear_filter(&widget)?;
    Ok(Json(dashboard.snapshot()))
}

pub async fn delete_filters(
    State(state): State<Arc<AppState>>,
) -> Result<Json<DashboardSnapshot>, ApiError> {
    let mut dashboard = state.dashboard.lock().await;
    dashboard.reset_filters()?;
    Ok(Json(dashboard.snapshot()))
}

pub async fn put_layer(
    Path(layer): Path<String>,
    State(state): State<Arc<AppState>>,
    Json(request): Json<LayerRequest>,
) -> Result<Json<DashboardSnapshot>, ApiError> {
    let mut dashboard = state.dashboard.lock().await;
    dashboard.set_layer_visible(&layer, request.visible)?;
    Ok(Json(dashboard.snapshot()))
}
