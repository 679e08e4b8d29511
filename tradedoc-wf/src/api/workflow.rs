//! Workflow API handlers
//!
//! POST /workflow/open, GET /workflow, step mode/content and variant
//! endpoints.

use axum::{
    extract::{Path, State},
    routing::{get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tradedoc_common::steps::{DocKey, ShippingDocVariant, StepMode};

use crate::models::WorkflowSnapshot;
use crate::workflow::WorkflowReadModel;
use crate::{error::ApiResult, AppState};

use super::parse_step;

/// PUT /workflow/steps/{step}/mode request
#[derive(Debug, Deserialize)]
pub struct SetModeRequest {
    pub mode: StepMode,
}

/// PUT /workflow/steps/{step}/content request
#[derive(Debug, Deserialize)]
pub struct SetContentRequest {
    pub content: serde_json::Value,
}

/// PUT /workflow/steps/{step}/content response
#[derive(Debug, Serialize)]
pub struct SetContentResponse {
    pub doc_key: DocKey,
}

/// PUT /workflow/variant request
#[derive(Debug, Deserialize)]
pub struct SetVariantRequest {
    pub variant: ShippingDocVariant,
    /// Explicit ordering once both shipping documents exist
    #[serde(default)]
    pub order: Option<Vec<ShippingDocVariant>>,
}

/// POST /workflow/open
///
/// Seed the engine from externally supplied initial document data.
/// Replaces any previously open workflow.
pub async fn open_workflow(
    State(state): State<AppState>,
    Json(snapshot): Json<WorkflowSnapshot>,
) -> ApiResult<Json<WorkflowReadModel>> {
    state.controller.open(snapshot).await;
    Ok(Json(state.controller.read_model().await?))
}

/// GET /workflow
///
/// Combined read model for step navigation and save/download modals.
pub async fn get_workflow(State(state): State<AppState>) -> ApiResult<Json<WorkflowReadModel>> {
    Ok(Json(state.controller.read_model().await?))
}

/// PUT /workflow/steps/{step}/mode
pub async fn set_step_mode(
    State(state): State<AppState>,
    Path(step): Path<u8>,
    Json(request): Json<SetModeRequest>,
) -> ApiResult<Json<WorkflowReadModel>> {
    let step = parse_step(step)?;
    state.controller.set_mode(step, request.mode).await?;
    Ok(Json(state.controller.read_model().await?))
}

/// PUT /workflow/steps/{step}/content
///
/// Manual editing path: replaces the content stored under the step's
/// resolved document key and marks the step modified.
pub async fn set_step_content(
    State(state): State<AppState>,
    Path(step): Path<u8>,
    Json(request): Json<SetContentRequest>,
) -> ApiResult<Json<SetContentResponse>> {
    let step = parse_step(step)?;
    let doc_key = state.controller.set_content(step, request.content).await?;
    Ok(Json(SetContentResponse { doc_key }))
}

/// PUT /workflow/variant
///
/// Switch which concrete document step 4 resolves to. Existing data under
/// either key is preserved.
pub async fn set_variant(
    State(state): State<AppState>,
    Json(request): Json<SetVariantRequest>,
) -> ApiResult<Json<WorkflowReadModel>> {
    state
        .controller
        .set_variant(request.variant, request.order)
        .await?;
    Ok(Json(state.controller.read_model().await?))
}

/// Build workflow routes
pub fn workflow_routes() -> Router<AppState> {
    Router::new()
        .route("/workflow/open", post(open_workflow))
        .route("/workflow", get(get_workflow))
        .route("/workflow/steps/:step/mode", put(set_step_mode))
        .route("/workflow/steps/:step/content", put(set_step_content))
        .route("/workflow/variant", put(set_variant))
}
