//! Upload API handlers
//!
//! Start/remove/retry/restore for per-step upload sessions. Starts return
//! 202 Accepted: state changes arrive asynchronously over SSE and through
//! the workflow read model.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};
use base64::{engine::general_purpose, Engine as _};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tradedoc_common::steps::Step;
use uuid::Uuid;

use crate::{
    error::{ApiError, ApiResult},
    AppState,
};

use super::parse_step;

/// POST /workflow/steps/{step}/upload request
#[derive(Debug, Deserialize)]
pub struct StartUploadRequest {
    /// Pre-assigned remote document identifier
    pub remote_id: Uuid,
    pub filename: String,
    /// File payload, base64-encoded
    pub content: String,
}

/// Upload action response
#[derive(Debug, Serialize)]
pub struct UploadActionResponse {
    pub step: Step,
    pub accepted: bool,
}

/// POST /workflow/steps/{step}/upload/retry response
#[derive(Debug, Serialize)]
pub struct RetryUploadResponse {
    pub step: Step,
    /// False when the step had no failed upload to retry (contract no-op)
    pub retried: bool,
}

/// POST /workflow/steps/{step}/upload/restore request
#[derive(Debug, Deserialize)]
pub struct RestoreUploadRequest {
    pub filename: String,
    pub primary_url: String,
    #[serde(default)]
    pub converted_url: Option<String>,
}

/// POST /workflow/steps/{step}/upload
///
/// Begin an upload session for a step. Returns 202 Accepted immediately;
/// callers must not assume synchronous completion.
pub async fn start_upload(
    State(state): State<AppState>,
    Path(step): Path<u8>,
    Json(request): Json<StartUploadRequest>,
) -> ApiResult<(StatusCode, Json<UploadActionResponse>)> {
    let step = parse_step(step)?;

    if request.filename.trim().is_empty() {
        return Err(ApiError::BadRequest("filename must not be empty".to_string()));
    }

    let file: Bytes = general_purpose::STANDARD
        .decode(&request.content)
        .map_err(|e| ApiError::BadRequest(format!("content is not valid base64: {}", e)))?
        .into();
    if file.is_empty() {
        return Err(ApiError::BadRequest("file content must not be empty".to_string()));
    }

    state
        .controller
        .start_upload(step, request.remote_id, request.filename, file)
        .await?;

    Ok((
        StatusCode::ACCEPTED,
        Json(UploadActionResponse {
            step,
            accepted: true,
        }),
    ))
}

/// DELETE /workflow/steps/{step}/upload
///
/// Remove a step's upload. The local change is provisional until the remote
/// delete is confirmed; a failure rolls the record back.
pub async fn remove_upload(
    State(state): State<AppState>,
    Path(step): Path<u8>,
) -> ApiResult<(StatusCode, Json<UploadActionResponse>)> {
    let step = parse_step(step)?;
    state.controller.remove_upload(step).await?;

    Ok((
        StatusCode::ACCEPTED,
        Json(UploadActionResponse {
            step,
            accepted: true,
        }),
    ))
}

/// POST /workflow/steps/{step}/upload/retry
///
/// Re-issue a failed session with the previously held file and remote id.
pub async fn retry_upload(
    State(state): State<AppState>,
    Path(step): Path<u8>,
) -> ApiResult<Json<RetryUploadResponse>> {
    let step = parse_step(step)?;
    let retried = state.controller.retry_upload(step).await?;

    Ok(Json(RetryUploadResponse { step, retried }))
}

/// POST /workflow/steps/{step}/upload/restore
///
/// Re-seed a step's upload state from a historical version: ready status,
/// produced artifacts, no held file reference.
pub async fn restore_upload(
    State(state): State<AppState>,
    Path(step): Path<u8>,
    Json(request): Json<RestoreUploadRequest>,
) -> ApiResult<Json<UploadActionResponse>> {
    let step = parse_step(step)?;
    state
        .controller
        .restore_upload(
            step,
            request.filename,
            request.primary_url,
            request.converted_url,
        )
        .await?;

    Ok(Json(UploadActionResponse {
        step,
        accepted: true,
    }))
}

/// Build upload routes
pub fn upload_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/workflow/steps/:step/upload",
            post(start_upload).delete(remove_upload),
        )
        .route("/workflow/steps/:step/upload/retry", post(retry_upload))
        .route("/workflow/steps/:step/upload/restore", post(restore_upload))
}
