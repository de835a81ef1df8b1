//! Axum route handlers for scans and the saved scan session.

use axum::{extract::State, http::StatusCode, Json};
use serde::Deserialize;
use tracing::info;

use crate::errors::AppError;
use crate::scan::models::{HairMetrics, ScanSession, DEFAULT_FACE_SHAPE_LABEL, DEFAULT_HAIR_TYPE_LABEL};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveSessionRequest {
    pub uri: String,
    pub metrics: HairMetrics,
    pub face_shape_label: Option<String>,
    pub hair_type_label: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanRequest {
    pub image_uri: String,
}

/// GET /api/v1/session
///
/// Returns the last saved scan, or 404 when none has been saved yet.
pub async fn handle_get_session(
    State(state): State<AppState>,
) -> Result<Json<ScanSession>, AppError> {
    state
        .sessions
        .load()
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound("No saved scan session".to_string()))
}

/// PUT /api/v1/session
///
/// Replaces the saved scan. Metrics must already lie in range; the average
/// and timestamp are derived server-side.
pub async fn handle_save_session(
    State(state): State<AppState>,
    Json(request): Json<SaveSessionRequest>,
) -> Result<Json<ScanSession>, AppError> {
    if request.uri.trim().is_empty() {
        return Err(AppError::Validation("uri cannot be empty".to_string()));
    }

    let session = ScanSession::new(
        request.uri,
        request.metrics,
        request
            .face_shape_label
            .unwrap_or_else(|| DEFAULT_FACE_SHAPE_LABEL.to_string()),
        request
            .hair_type_label
            .unwrap_or_else(|| DEFAULT_HAIR_TYPE_LABEL.to_string()),
    )
    .map_err(AppError::Validation)?;

    state.sessions.save(&session).await?;
    Ok(Json(session))
}

/// DELETE /api/v1/session
pub async fn handle_clear_session(State(state): State<AppState>) -> Result<StatusCode, AppError> {
    state.sessions.clear().await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/scans
///
/// Analyzes the photo, then overwrites the saved session with the result.
/// A photo without a usable face/hair view yields 422 and keeps the old session.
pub async fn handle_scan(
    State(state): State<AppState>,
    Json(request): Json<ScanRequest>,
) -> Result<Json<ScanSession>, AppError> {
    if request.image_uri.trim().is_empty() {
        return Err(AppError::Validation("imageUri cannot be empty".to_string()));
    }

    let analysis = state.vision.analyze(&request.image_uri).await?;
    let session = analysis
        .into_session(request.image_uri)
        .map_err(AppError::Validation)?;

    state.sessions.save(&session).await?;
    info!("Scan saved with average {}", session.average);
    Ok(Json(session))
}
