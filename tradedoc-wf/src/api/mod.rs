//! HTTP API handlers for tradedoc-wf
//!
//! UI collaborators drive the workflow through REST and observe lifecycle
//! changes through SSE.

pub mod health;
pub mod sse;
pub mod uploads;
pub mod workflow;

pub use health::health_routes;
pub use sse::event_stream;
pub use uploads::upload_routes;
pub use workflow::workflow_routes;

use crate::error::ApiError;
use tradedoc_common::steps::Step;

/// Validate a path step number
pub(crate) fn parse_step(raw: u8) -> Result<Step, ApiError> {
    Step::new(raw).ok_or_else(|| ApiError::BadRequest(format!("step out of range 1..=4: {}", raw)))
}
