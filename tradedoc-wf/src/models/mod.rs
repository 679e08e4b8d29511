//! Data models for tradedoc-wf

pub mod document;
pub mod step_state;

pub use document::{DocumentSet, WorkflowSnapshot};
pub use step_state::StepStateStore;
