//! tradedoc-wf - Document Workflow Service
//!
//! Tracks the four-step trade document workflow (Offer Sheet, Proforma
//! Invoice, Sales Contract, Commercial Invoice / Packing List): per-step
//! mode selection, modified-step tracking, the active shipping-document
//! variant, and the asynchronous upload/processing pipeline that feeds
//! extracted data back into a step.
//!
//! Integrates with UI collaborators via HTTP REST + SSE.

use anyhow::Result;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};
use tradedoc_common::events::EventBus;

use tradedoc_wf::config::Settings;
use tradedoc_wf::upload::UploadChannel;
use tradedoc_wf::workflow::{LoggingPopulator, WorkflowController};
use tradedoc_wf::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Resolve settings first so the log level can come from config
    let settings = Settings::resolve()?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(settings.log_level.clone()));
    fmt().with_env_filter(filter).init();

    info!("Starting tradedoc-wf (Document Workflow) service");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));
    info!("Processing backend: {}", settings.processing_base_url);
    match settings.processing_timeout {
        Some(timeout) => info!("Processing stall timeout: {:?}", timeout),
        None => info!("Processing stall timeout: none (user retry/removal only)"),
    }

    // Event bus for SSE broadcasting
    let event_bus = EventBus::new(256);

    // Upload channel against the processing backend
    let channel = UploadChannel::new(
        settings.processing_base_url.clone(),
        settings.poll_interval,
        settings.processing_timeout,
    )?;

    // Workflow engine with its signal loop
    let controller = Arc::new(WorkflowController::new(
        channel,
        event_bus.clone(),
        Arc::new(LoggingPopulator),
        settings.sse_throttle_ms,
    ));

    let state = AppState::new(controller, event_bus);
    let app = tradedoc_wf::build_router(state);

    let bind_addr = format!("127.0.0.1:{}", settings.bind_port);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("Listening on http://{}", bind_addr);
    info!("Health check: http://{}/health", bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}
