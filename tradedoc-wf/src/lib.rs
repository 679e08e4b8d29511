//! tradedoc-wf library interface
//!
//! Exposes the workflow engine and API surface for integration testing.

pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod upload;
pub mod workflow;

pub use crate::error::{ApiError, ApiResult};

use axum::Router;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::trace::TraceLayer;
use tradedoc_common::events::EventBus;

use crate::workflow::WorkflowController;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Workflow engine for the current document set
    pub controller: Arc<WorkflowController>,
    /// Event bus for SSE broadcasting
    pub event_bus: EventBus,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
    /// Last error for diagnostic purposes
    pub last_error: Arc<RwLock<Option<String>>>,
}

impl AppState {
    pub fn new(controller: Arc<WorkflowController>, event_bus: EventBus) -> Self {
        Self {
            controller,
            event_bus,
            startup_time: Utc::now(),
            last_error: Arc::new(RwLock::new(None)),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::routing::get;

    Router::new()
        .merge(api::workflow_routes())
        .merge(api::upload_routes())
        .route("/events", get(api::event_stream))
        .merge(api::health_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
