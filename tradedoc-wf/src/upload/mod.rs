//! Upload and remote-processing pipeline
//!
//! One upload session takes a file for a single step through the remote
//! service: session establishment, transfer, processing, and exactly one
//! terminal completion or failure. The channel drives the remote side and
//! emits tagged lifecycle signals; the tracker owns per-step state and is
//! the only place those signals mutate anything.

pub mod channel;
pub mod classify;
pub mod events;
pub mod tracker;

pub use channel::UploadChannel;
pub use events::{SessionEvent, WorkflowSignal};
pub use tracker::{UploadRecord, UploadStatus, UploadTracker};
