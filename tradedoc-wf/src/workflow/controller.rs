//! Workflow controller
//!
//! Composition root for one document workflow session. Owns the document
//! set, the step state store and the upload tracker behind a single lock,
//! and consumes every upload lifecycle signal through one mpsc loop so all
//! state mutation happens on one logical thread. The stale-session discard
//! in the tracker is the concurrency discipline; no lock is held across a
//! suspension point.

use bytes::Bytes;
use std::sync::Arc;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::sync::RwLock;
use serde::Serialize;
use tradedoc_common::events::{DocEvent, EventBus};
use tradedoc_common::steps::{resolve_doc_key, DocKey, ShippingDocVariant, Step, StepMode};
use tradedoc_common::{Error, Result};
use uuid::Uuid;

use crate::models::{DocumentSet, StepStateStore, WorkflowSnapshot};
use crate::upload::tracker::{Applied, RemoveOutcome, RemoveStart, UploadRecord, UploadStatus};
use crate::upload::{UploadChannel, UploadTracker, WorkflowSignal};

use super::throttle::EventBroadcaster;

/// User-facing message when a remote delete cannot be confirmed
const MSG_REMOVE_FAILED: &str = "Could not remove the uploaded file. Please try again.";

/// External template-population collaborator
///
/// Receives structured data extracted from an uploaded file so the document
/// template for the resolved key can be filled in. Template rendering is
/// outside this service; implementations forward to wherever that lives.
pub trait TemplatePopulator: Send + Sync {
    fn populate(&self, key: DocKey, extracted: &serde_json::Value);
}

/// Default populator: records the hand-off and drops the payload
pub struct LoggingPopulator;

impl TemplatePopulator for LoggingPopulator {
    fn populate(&self, key: DocKey, extracted: &serde_json::Value) {
        let field_count = extracted.as_object().map(|o| o.len()).unwrap_or(0);
        tracing::info!(doc_key = %key, field_count = field_count, "Extracted data forwarded to template population");
    }
}

#[derive(Default)]
struct WorkflowState {
    opened: bool,
    docs: DocumentSet,
    steps: StepStateStore,
    uploads: UploadTracker,
}

/// Composition root for the document step workflow
pub struct WorkflowController {
    inner: Arc<RwLock<WorkflowState>>,
    signal_tx: UnboundedSender<WorkflowSignal>,
    channel: UploadChannel,
    bus: EventBus,
}

impl WorkflowController {
    /// Create the controller and spawn its signal loop
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(
        channel: UploadChannel,
        bus: EventBus,
        populator: Arc<dyn TemplatePopulator>,
        sse_throttle_ms: u64,
    ) -> Self {
        let (signal_tx, signal_rx) = mpsc::unbounded_channel();
        let inner = Arc::new(RwLock::new(WorkflowState::default()));

        let broadcaster = EventBroadcaster::new(bus.clone(), sse_throttle_ms);
        tokio::spawn(signal_loop(
            signal_rx,
            Arc::clone(&inner),
            broadcaster,
            populator,
        ));

        Self {
            inner,
            signal_tx,
            channel,
            bus,
        }
    }

    /// Open a workflow from externally supplied initial document data
    ///
    /// Replaces any previously open workflow; live upload sessions are
    /// released. Seeding never marks the workflow dirty.
    pub async fn open(&self, snapshot: WorkflowSnapshot) {
        let mut state = self.inner.write().await;
        state.docs = DocumentSet::from_snapshot(&snapshot);
        state.steps = StepStateStore::from_snapshot(&snapshot);
        state.uploads.reset();
        state.opened = true;

        tracing::info!(
            title = snapshot.title.as_deref().unwrap_or("(untitled)"),
            seeded_keys = snapshot.contents.len(),
            "Workflow opened"
        );
        drop(state);

        self.bus.emit(DocEvent::WorkflowOpened {
            title: snapshot.title,
            timestamp: chrono::Utc::now(),
        });
    }

    /// Set a step's production mode (user action)
    pub async fn set_mode(&self, step: Step, mode: StepMode) -> Result<()> {
        let mut state = self.write_open().await?;
        state.steps.set_mode(step, mode);
        state.steps.set_dirty(true);
        drop(state);

        self.bus.emit(DocEvent::StepModeSet {
            step,
            mode,
            timestamp: chrono::Utc::now(),
        });
        Ok(())
    }

    /// Replace the content of a step's resolved document (manual editing)
    pub async fn set_content(&self, step: Step, content: serde_json::Value) -> Result<DocKey> {
        let mut state = self.write_open().await?;
        let key = resolve_doc_key(step, state.steps.active_variant()).ok_or_else(|| {
            Error::InvalidInput(
                "step 4 has no active shipping document; choose a variant first".to_string(),
            )
        })?;

        state.docs.set_content(key, content);
        state.steps.mark_modified(step);
        state.steps.set_dirty(true);
        drop(state);

        let now = chrono::Utc::now();
        self.bus.emit(DocEvent::DocumentContentUpdated {
            doc_key: key,
            step,
            timestamp: now,
        });
        self.bus.emit(DocEvent::StepModified {
            step,
            timestamp: now,
        });
        Ok(key)
    }

    /// Switch the active shipping-document variant (user action)
    ///
    /// Data stored under either step-4 key is left untouched.
    pub async fn set_variant(
        &self,
        variant: ShippingDocVariant,
        order: Option<Vec<ShippingDocVariant>>,
    ) -> Result<()> {
        let mut state = self.write_open().await?;
        state.steps.set_active_variant(variant);
        if let Some(order) = order {
            state.steps.set_variant_order(order);
        }
        state.steps.set_dirty(true);
        drop(state);

        self.bus.emit(DocEvent::VariantChanged {
            variant,
            timestamp: chrono::Utc::now(),
        });
        Ok(())
    }

    /// Start an upload session for a step
    ///
    /// Returns immediately after issuing the request; lifecycle changes
    /// arrive asynchronously through the signal loop. Starting commits the
    /// step to the upload approach.
    pub async fn start_upload(
        &self,
        step: Step,
        remote_id: Uuid,
        filename: String,
        file: Bytes,
    ) -> Result<()> {
        let media_type = infer::get(&file).map(|kind| kind.mime_type().to_string());

        let mut state = self.write_open().await?;
        state.steps.set_mode(step, StepMode::Upload);
        state.steps.set_dirty(true);
        let started =
            state
                .uploads
                .begin_upload(step, filename.clone(), media_type, file, remote_id);
        drop(state);

        self.bus.emit(DocEvent::UploadStarted {
            step,
            filename,
            remote_id,
            timestamp: chrono::Utc::now(),
        });

        self.channel.open(
            step,
            started.generation,
            started.filename,
            started.media_type,
            started.file,
            started.remote_id,
            self.signal_tx.clone(),
            started.cancel,
        );
        Ok(())
    }

    /// Remove a step's upload
    ///
    /// The local state change is provisional while the remote delete is in
    /// flight; a failed delete rolls back to the exact prior record.
    pub async fn remove_upload(&self, step: Step) -> Result<()> {
        let mut state = self.write_open().await?;
        state.steps.set_dirty(true);
        let start = state.uploads.begin_remove(step);
        drop(state);

        match start {
            RemoveStart::Local => {
                self.bus.emit(DocEvent::UploadRemoved {
                    step,
                    timestamp: chrono::Utc::now(),
                });
            }
            RemoveStart::Remote { ticket, remote_id } => {
                self.channel
                    .delete_document(step, ticket, remote_id, self.signal_tx.clone());
            }
        }
        Ok(())
    }

    /// Retry a failed upload with the previously held file and remote id
    ///
    /// Returns false (a contract no-op) when the step is not retriable.
    pub async fn retry_upload(&self, step: Step) -> Result<bool> {
        let mut state = self.write_open().await?;
        let Some(started) = state.uploads.retry(step) else {
            return Ok(false);
        };
        drop(state);

        self.bus.emit(DocEvent::UploadStarted {
            step,
            filename: started.filename.clone(),
            remote_id: started.remote_id,
            timestamp: chrono::Utc::now(),
        });

        self.channel.open(
            step,
            started.generation,
            started.filename,
            started.media_type,
            started.file,
            started.remote_id,
            self.signal_tx.clone(),
            started.cancel,
        );
        Ok(true)
    }

    /// Re-seed a step's upload state from a historical version
    ///
    /// Programmatic restore: yields `ready` with no held file reference and
    /// does not mark the workflow dirty.
    pub async fn restore_upload(
        &self,
        step: Step,
        filename: String,
        primary_url: String,
        converted_url: Option<String>,
    ) -> Result<()> {
        let mut state = self.write_open().await?;
        state
            .uploads
            .restore(step, filename.clone(), primary_url, converted_url);
        drop(state);

        self.bus.emit(DocEvent::UploadRestored {
            step,
            filename,
            timestamp: chrono::Utc::now(),
        });
        Ok(())
    }

    /// Concrete document key a step currently resolves to
    pub async fn current_doc_key_for(&self, step: Step) -> Result<Option<DocKey>> {
        let state = self.read_open().await?;
        Ok(resolve_doc_key(step, state.steps.active_variant()))
    }

    /// Whether a step counts as complete for navigation/save purposes
    pub async fn is_step_complete(&self, step: Step) -> Result<bool> {
        let state = self.read_open().await?;
        Ok(step_complete(&state, step))
    }

    /// Combined read model for UI consumers
    pub async fn read_model(&self) -> Result<WorkflowReadModel> {
        let state = self.read_open().await?;

        let steps = Step::all()
            .map(|step| StepReadModel {
                step,
                mode: state.steps.mode(step),
                doc_key: resolve_doc_key(step, state.steps.active_variant()),
                complete: step_complete(&state, step),
                upload: UploadReadModel::from(state.uploads.record(step)),
            })
            .collect();

        Ok(WorkflowReadModel {
            title: state.docs.title().map(String::from),
            active_variant: state.steps.active_variant(),
            variant_order: state.steps.variant_order().map(|o| o.to_vec()),
            modified_steps: state.steps.modified_steps().iter().copied().collect(),
            dirty: state.steps.is_dirty(),
            steps,
        })
    }

    /// Whether a workflow has been opened
    pub async fn is_open(&self) -> bool {
        self.inner.read().await.opened
    }

    async fn write_open(&self) -> Result<tokio::sync::RwLockWriteGuard<'_, WorkflowState>> {
        let state = self.inner.write().await;
        if !state.opened {
            return Err(Error::NotFound("no workflow is open".to_string()));
        }
        Ok(state)
    }

    async fn read_open(&self) -> Result<tokio::sync::RwLockReadGuard<'_, WorkflowState>> {
        let state = self.inner.read().await;
        if !state.opened {
            return Err(Error::NotFound("no workflow is open".to_string()));
        }
        Ok(state)
    }
}

fn step_complete(state: &WorkflowState, step: Step) -> bool {
    match state.steps.mode(step) {
        StepMode::Skip => true,
        StepMode::Upload => state.uploads.record(step).status == UploadStatus::Ready,
        StepMode::Manual => {
            state.steps.is_modified(step)
                && resolve_doc_key(step, state.steps.active_variant())
                    .map(|key| state.docs.has_content(key))
                    .unwrap_or(false)
        }
        StepMode::Unset => false,
    }
}

/// Signal loop: the single consumer of upload lifecycle messages
async fn signal_loop(
    mut rx: UnboundedReceiver<WorkflowSignal>,
    inner: Arc<RwLock<WorkflowState>>,
    mut broadcaster: EventBroadcaster,
    populator: Arc<dyn TemplatePopulator>,
) {
    while let Some(signal) = rx.recv().await {
        match signal {
            WorkflowSignal::Upload {
                step,
                generation,
                event,
            } => {
                let mut state = inner.write().await;
                let Some(applied) = state.uploads.apply_event(step, generation, event) else {
                    continue;
                };

                let now = chrono::Utc::now();
                match applied {
                    Applied::SessionEstablished { remote_id } => {
                        drop(state);
                        broadcaster.emit(DocEvent::UploadSessionEstablished {
                            step,
                            remote_id,
                            timestamp: now,
                        });
                    }
                    Applied::TransferComplete => {
                        drop(state);
                        broadcaster.emit(DocEvent::UploadProcessing {
                            step,
                            stage: None,
                            timestamp: now,
                        });
                    }
                    Applied::Processing { stage } => {
                        drop(state);
                        broadcaster.emit(DocEvent::UploadProcessing {
                            step,
                            stage,
                            timestamp: now,
                        });
                    }
                    Applied::Ready {
                        primary_url,
                        converted_url,
                        extracted,
                    } => {
                        let mut modified = false;
                        if let Some(extracted) = extracted {
                            match resolve_doc_key(step, state.steps.active_variant()) {
                                Some(key) => {
                                    populator.populate(key, &extracted);
                                    state.steps.mark_modified(step);
                                    modified = true;
                                }
                                None => {
                                    tracing::warn!(
                                        step = %step,
                                        "Extracted data has no concrete document while the shipping variant is undecided; dropping"
                                    );
                                }
                            }
                        }
                        drop(state);

                        if modified {
                            broadcaster.emit(DocEvent::StepModified {
                                step,
                                timestamp: now,
                            });
                        }
                        broadcaster.emit(DocEvent::UploadReady {
                            step,
                            primary_url,
                            converted_url,
                            timestamp: now,
                        });
                    }
                    Applied::Failed { message } => {
                        drop(state);
                        broadcaster.emit(DocEvent::UploadFailed {
                            step,
                            message,
                            timestamp: now,
                        });
                    }
                }
            }
            WorkflowSignal::RemoveResolved {
                step,
                ticket,
                result,
            } => {
                let mut state = inner.write().await;
                let result = result.map_err(|raw| {
                    tracing::warn!(step = %step, raw_reason = %raw, "Remote delete failed");
                    MSG_REMOVE_FAILED.to_string()
                });

                let outcome = state.uploads.resolve_remove(step, ticket, result);
                drop(state);

                match outcome {
                    RemoveOutcome::Committed => {
                        broadcaster.emit(DocEvent::UploadRemoved {
                            step,
                            timestamp: chrono::Utc::now(),
                        });
                    }
                    RemoveOutcome::RolledBack { message } => {
                        broadcaster.emit(DocEvent::UploadRemoveRolledBack {
                            step,
                            message,
                            timestamp: chrono::Utc::now(),
                        });
                    }
                    RemoveOutcome::Stale => {}
                }
            }
        }
    }
}

/// Per-step upload fields exposed to UI consumers
#[derive(Debug, Serialize)]
pub struct UploadReadModel {
    pub status: UploadStatus,
    pub filename: Option<String>,
    pub media_type: Option<String>,
    pub remote_id: Option<Uuid>,
    pub primary_url: Option<String>,
    pub converted_url: Option<String>,
    pub error: Option<String>,
    pub removing: bool,
}

impl From<&UploadRecord> for UploadReadModel {
    fn from(record: &UploadRecord) -> Self {
        Self {
            status: record.status,
            filename: record.filename.clone(),
            media_type: record.media_type.clone(),
            remote_id: record.remote_id,
            primary_url: record.primary_url.clone(),
            converted_url: record.converted_url.clone(),
            error: record.error.clone(),
            removing: record.removing,
        }
    }
}

/// Per-step read model
#[derive(Debug, Serialize)]
pub struct StepReadModel {
    pub step: Step,
    pub mode: StepMode,
    /// Concrete document key under the active variant; absent for step 4
    /// while the variant is undecided (dashboard, not editor)
    pub doc_key: Option<DocKey>,
    pub complete: bool,
    pub upload: UploadReadModel,
}

/// Combined workflow read model
#[derive(Debug, Serialize)]
pub struct WorkflowReadModel {
    pub title: Option<String>,
    pub active_variant: ShippingDocVariant,
    pub variant_order: Option<Vec<ShippingDocVariant>>,
    pub modified_steps: Vec<Step>,
    pub dirty: bool,
    pub steps: Vec<StepReadModel>,
}
