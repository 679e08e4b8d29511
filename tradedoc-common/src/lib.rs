//! # TradeDoc Common Library
//!
//! Shared code for the TradeDoc services including:
//! - Event types (DocEvent enum) and EventBus
//! - Configuration loading
//! - Common error types
//! - SSE stream utilities

pub mod config;
pub mod error;
pub mod events;
pub mod sse;
pub mod steps;

pub use error::{Error, Result};
pub use steps::{resolve_doc_key, DocKey, ShippingDocVariant, Step, StepMode, STEP_COUNT};
