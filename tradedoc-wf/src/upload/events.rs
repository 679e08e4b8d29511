//! Upload lifecycle signal types
//!
//! Channel tasks never touch workflow state directly: they emit tagged
//! messages into a single mpsc consumer owned by the workflow controller.
//! Every signal carries the session generation it belongs to so events from
//! a cancelled or replaced session are discarded instead of applied.

use serde::Serialize;
use tradedoc_common::steps::Step;
use uuid::Uuid;

/// Ordered lifecycle events of one upload+processing session
///
/// Delivery order for a live session: `SessionReady`, `TransferComplete`,
/// `ProcessingStarted`, zero or more `StatusUpdate`s, then exactly one of
/// `Completed` or `Failed`.
#[derive(Debug, Clone, Serialize)]
pub enum SessionEvent {
    /// Remote side confirmed the session and assigned the document id
    SessionReady { remote_id: Uuid },

    /// File bytes fully transferred to the remote target
    TransferComplete,

    /// Remote processing has begun
    ProcessingStarted,

    /// Opaque progress payload from the remote service
    StatusUpdate { stage: String },

    /// Terminal success with produced artifacts
    Completed {
        primary_url: String,
        converted_url: Option<String>,
        /// Structured data extracted from the file, when the remote service
        /// could parse it into the document shape
        extracted: Option<serde_json::Value>,
    },

    /// Terminal failure; `reason` is raw remote/transport text and must be
    /// classified before it reaches a user
    Failed { reason: String },
}

/// Message consumed by the workflow controller's signal loop
#[derive(Debug)]
pub enum WorkflowSignal {
    /// Lifecycle event from an upload session
    Upload {
        step: Step,
        generation: u64,
        event: SessionEvent,
    },

    /// Reconciliation result for a provisional upload removal
    RemoveResolved {
        step: Step,
        /// Generation captured when the provisional removal was applied
        ticket: u64,
        /// `Err` carries the user-facing message for the rollback
        result: Result<(), String>,
    },
}
