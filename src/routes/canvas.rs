//! Canvas REST endpoints — save, load, and PNG export.
//!
//! None of these broadcast. `save` replaces the whole canvas and writes the
//! file immediately; connected clients pick the change up on their next load.

use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::http::header::CONTENT_TYPE;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use tracing::{error, info, warn};

use crate::pixel::Pixel;
use crate::services::canvas::DEFAULT_GRID_SIZE;
use crate::services::export::{self, ExportError};
use crate::services::persistence;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ExportParams {
    pub size: Option<String>,
}

/// `POST /api/save` — replace the canvas with the posted pixel array.
pub async fn save(State(state): State<AppState>, body: Bytes) -> StatusCode {
    let pixels: Vec<Pixel> = match serde_json::from_slice(&body) {
        Ok(pixels) => pixels,
        Err(e) => {
            warn!(error = %e, "api: save rejected malformed body");
            return StatusCode::BAD_REQUEST;
        }
    };

    let received = pixels.len();
    let valid: Vec<Pixel> = pixels.into_iter().filter(Pixel::has_valid_color).collect();
    state.canvas.replace(&valid);

    match persistence::save_now(&state.canvas, state.storage.as_ref()).await {
        Ok(count) => {
            info!(count, skipped = received - valid.len(), "api: canvas saved");
            StatusCode::OK
        }
        Err(e) => {
            error!(error = %e, "api: canvas save failed");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

/// `GET /api/load` — the full canvas as a pixel array.
pub async fn load(State(state): State<AppState>) -> Json<Vec<Pixel>> {
    Json(state.canvas.snapshot())
}

/// `GET /api/export?size=N` — the canvas rendered as PNG.
pub async fn export(State(state): State<AppState>, Query(params): Query<ExportParams>) -> Result<Response, StatusCode> {
    let grid_size = export_grid_size(params.size.as_deref());
    let pixels = state.canvas.snapshot();

    let png = tokio::task::spawn_blocking(move || export::export_png(&pixels, grid_size))
        .await
        .map_err(|e| {
            error!(error = %e, "api: export task failed");
            StatusCode::INTERNAL_SERVER_ERROR
        })?
        .map_err(export_error_to_status)?;

    Ok(([(CONTENT_TYPE, "image/png")], png).into_response())
}

/// Requested grid size, or the default when absent or not a positive integer.
pub(crate) fn export_grid_size(raw: Option<&str>) -> u32 {
    raw.and_then(|s| s.trim().parse::<u32>().ok())
        .filter(|n| *n > 0)
        .unwrap_or(DEFAULT_GRID_SIZE)
}

pub(crate) fn export_error_to_status(err: ExportError) -> StatusCode {
    match err {
        ExportError::OutOfRange { size } => {
            warn!(size, "api: export grid size out of range");
            StatusCode::BAD_REQUEST
        }
        ExportError::Encode(e) => {
            error!(error = %e, "api: png encode failed");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

#[cfg(test)]
#[path = "canvas_test.rs"]
mod tests;
