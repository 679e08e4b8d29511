//! Event types for the TradeDoc event system
//!
//! Provides the shared event definitions and EventBus used to push workflow
//! and upload lifecycle changes to connected UIs over SSE.

use crate::steps::{DocKey, ShippingDocVariant, Step, StepMode};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// TradeDoc event types
///
/// Events are broadcast via [`EventBus`] and can be serialized for SSE
/// transmission. All events use this central enum for type safety and
/// exhaustive matching.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DocEvent {
    /// A workflow was (re)opened from an initial document snapshot
    WorkflowOpened {
        title: Option<String>,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A step's production mode was set
    ///
    /// Triggers:
    /// - SSE: update step navigation chrome
    StepModeSet {
        step: Step,
        mode: StepMode,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A step was marked as modified (content worth saving)
    StepModified {
        step: Step,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A document's stored content was replaced
    DocumentContentUpdated {
        doc_key: DocKey,
        step: Step,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// The active shipping-document variant changed
    ///
    /// Switching never clears data stored under either step-4 key.
    VariantChanged {
        variant: ShippingDocVariant,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// An upload session was started for a step
    UploadStarted {
        step: Step,
        filename: String,
        remote_id: Uuid,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// The remote side confirmed the upload session
    UploadSessionEstablished {
        step: Step,
        remote_id: Uuid,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// The file transfer finished; remote processing is underway
    UploadProcessing {
        step: Step,
        /// Opaque progress payload from the remote service, if any
        stage: Option<String>,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Remote processing completed and artifacts are available
    UploadReady {
        step: Step,
        primary_url: String,
        converted_url: Option<String>,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// The upload failed; `message` is the classified user-facing text
    UploadFailed {
        step: Step,
        message: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A step's upload was removed (locally confirmed)
    UploadRemoved {
        step: Step,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A provisional removal was rolled back after the remote delete failed
    UploadRemoveRolledBack {
        step: Step,
        message: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A step's upload state was re-seeded from a historical version
    UploadRestored {
        step: Step,
        filename: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },
}

impl DocEvent {
    /// Event type name as used for the SSE `event:` field
    pub fn event_type(&self) -> &'static str {
        match self {
            DocEvent::WorkflowOpened { .. } => "WorkflowOpened",
            DocEvent::StepModeSet { .. } => "StepModeSet",
            DocEvent::StepModified { .. } => "StepModified",
            DocEvent::DocumentContentUpdated { .. } => "DocumentContentUpdated",
            DocEvent::VariantChanged { .. } => "VariantChanged",
            DocEvent::UploadStarted { .. } => "UploadStarted",
            DocEvent::UploadSessionEstablished { .. } => "UploadSessionEstablished",
            DocEvent::UploadProcessing { .. } => "UploadProcessing",
            DocEvent::UploadReady { .. } => "UploadReady",
            DocEvent::UploadFailed { .. } => "UploadFailed",
            DocEvent::UploadRemoved { .. } => "UploadRemoved",
            DocEvent::UploadRemoveRolledBack { .. } => "UploadRemoveRolledBack",
            DocEvent::UploadRestored { .. } => "UploadRestored",
        }
    }
}

/// Broadcast bus for [`DocEvent`]
///
/// Thin wrapper over `tokio::sync::broadcast`: multiple producers, multiple
/// consumers, events dropped for lagging receivers once capacity is reached.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<DocEvent>,
    capacity: usize,
}

impl EventBus {
    /// Create a new EventBus with the specified channel capacity
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    ///
    /// Events emitted before subscription are not received.
    pub fn subscribe(&self) -> broadcast::Receiver<DocEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns the number of receivers the event reached. Zero receivers is
    /// not an error: UIs connect and disconnect freely.
    pub fn emit(&self, event: DocEvent) -> usize {
        match self.tx.send(event) {
            Ok(count) => count,
            Err(_) => 0,
        }
    }

    /// Configured channel capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
