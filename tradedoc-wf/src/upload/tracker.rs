//! Per-step upload state tracking
//!
//! Owns one upload record per step and guarantees that stale or cancelled
//! sessions cannot corrupt a newer session's state: every session carries a
//! monotonically increasing generation, and events are applied only when
//! their generation matches the step's current one. At most one live channel
//! session exists per step; starting a replacement or removing an upload
//! releases the previous session's token before any state changes.

use bytes::Bytes;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tradedoc_common::steps::{Step, STEP_COUNT};
use uuid::Uuid;

use super::classify::classify_failure;
use super::events::SessionEvent;

/// Upload lifecycle status for one step
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UploadStatus {
    /// No upload tracked (initial state, and the state after removal)
    #[default]
    Idle,
    /// Session requested or transfer in flight
    Uploading,
    /// Transfer finished, remote processing underway
    Processing,
    /// Terminal success; artifacts available
    Ready,
    /// Terminal failure until retried
    Error,
}

/// Upload state for one step
///
/// `file` is the held payload used for retry; it is intentionally absent
/// after a history restore, which re-seeds only the produced artifacts.
#[derive(Debug, Clone, Default)]
pub struct UploadRecord {
    pub status: UploadStatus,
    pub filename: Option<String>,
    /// Sniffed media type of the held payload
    pub media_type: Option<String>,
    pub file: Option<Bytes>,
    /// Remote document identifier; the pre-assigned id at start, replaced
    /// by the confirmed id once the session is established
    pub remote_id: Option<Uuid>,
    pub primary_url: Option<String>,
    /// Normalized preview artifact, when the remote service produces one
    pub converted_url: Option<String>,
    /// Classified user-facing message for the last failure
    pub error: Option<String>,
    /// Set while a removal is provisional (awaiting remote confirmation)
    pub removing: bool,
}

/// A state change produced by applying a live session event
#[derive(Debug)]
pub enum Applied {
    SessionEstablished {
        remote_id: Uuid,
    },
    TransferComplete,
    Processing {
        stage: Option<String>,
    },
    Ready {
        primary_url: String,
        converted_url: Option<String>,
        extracted: Option<serde_json::Value>,
    },
    Failed {
        message: String,
    },
}

/// Handle for a session the caller must now drive through the channel
#[derive(Debug)]
pub struct StartedSession {
    pub generation: u64,
    pub cancel: CancellationToken,
    pub filename: String,
    pub media_type: Option<String>,
    pub file: Bytes,
    pub remote_id: Uuid,
}

/// How a removal begins: remote reconciliation needed, or local-only
#[derive(Debug)]
pub enum RemoveStart {
    /// A remote document exists; the caller must issue the delete and feed
    /// the result back through [`UploadTracker::resolve_remove`]
    Remote { ticket: u64, remote_id: Uuid },
    /// Nothing remote to reconcile; the removal is already committed
    Local,
}

/// Outcome of reconciling a provisional removal
#[derive(Debug, PartialEq, Eq)]
pub enum RemoveOutcome {
    Committed,
    RolledBack { message: String },
    /// A newer action superseded this removal; nothing was changed
    Stale,
}

#[derive(Debug, Default)]
struct StepUpload {
    record: UploadRecord,
    /// Session generation; incremented on every start/retry/remove/restore
    generation: u64,
    /// Cancellation handle for the active channel subscription
    cancel: Option<CancellationToken>,
    pending_remove: Option<PendingRemove>,
}

#[derive(Debug)]
struct PendingRemove {
    /// Exact record to restore on rollback
    snapshot: UploadRecord,
    ticket: u64,
}

impl StepUpload {
    /// Release the live channel subscription, if any
    fn release_session(&mut self) {
        if let Some(token) = self.cancel.take() {
            token.cancel();
        }
    }
}

/// Tracks upload state for every workflow step
///
/// Every step has an explicit entry from construction; there is no
/// "absent means idle" state.
#[derive(Debug, Default)]
pub struct UploadTracker {
    steps: [StepUpload; STEP_COUNT as usize],
}

impl UploadTracker {
    pub fn new() -> Self {
        Self::default()
    }

    fn entry(&self, step: Step) -> &StepUpload {
        &self.steps[step.index()]
    }

    fn entry_mut(&mut self, step: Step) -> &mut StepUpload {
        &mut self.steps[step.index()]
    }

    /// Current record for a step
    pub fn record(&self, step: Step) -> &UploadRecord {
        &self.entry(step).record
    }

    /// Current session generation for a step
    pub fn generation(&self, step: Step) -> u64 {
        self.entry(step).generation
    }

    /// Begin a new upload session for a step
    ///
    /// Any previous session for the step is released first so two sessions
    /// can never race to write the same step's state. A pending provisional
    /// removal is superseded: its snapshot is dropped and its eventual
    /// resolution will be discarded as stale.
    pub fn begin_upload(
        &mut self,
        step: Step,
        filename: String,
        media_type: Option<String>,
        file: Bytes,
        remote_id: Uuid,
    ) -> StartedSession {
        let entry = self.entry_mut(step);
        entry.release_session();
        entry.pending_remove = None;
        entry.generation += 1;

        entry.record = UploadRecord {
            status: UploadStatus::Uploading,
            filename: Some(filename.clone()),
            media_type: media_type.clone(),
            file: Some(file.clone()),
            remote_id: Some(remote_id),
            primary_url: None,
            converted_url: None,
            error: None,
            removing: false,
        };

        let cancel = CancellationToken::new();
        entry.cancel = Some(cancel.clone());

        tracing::info!(
            step = %step,
            generation = entry.generation,
            filename = %filename,
            "Upload session started"
        );

        StartedSession {
            generation: entry.generation,
            cancel,
            filename,
            media_type,
            file,
            remote_id,
        }
    }

    /// Apply a session event, discarding it if the generation is stale
    ///
    /// Returns `None` for discarded events (stale generation, or an event
    /// that does not fit the step's current status).
    pub fn apply_event(
        &mut self,
        step: Step,
        generation: u64,
        event: SessionEvent,
    ) -> Option<Applied> {
        let entry = self.entry_mut(step);

        if generation != entry.generation {
            tracing::debug!(
                step = %step,
                event_generation = generation,
                current_generation = entry.generation,
                "Discarding event from stale upload session"
            );
            return None;
        }

        let status = entry.record.status;
        match event {
            SessionEvent::SessionReady { remote_id } => {
                if status != UploadStatus::Uploading {
                    return Self::out_of_order(step, "SessionReady", status);
                }
                entry.record.remote_id = Some(remote_id);
                Some(Applied::SessionEstablished { remote_id })
            }
            SessionEvent::TransferComplete => {
                if status != UploadStatus::Uploading {
                    return Self::out_of_order(step, "TransferComplete", status);
                }
                entry.record.status = UploadStatus::Processing;
                Some(Applied::TransferComplete)
            }
            SessionEvent::ProcessingStarted => {
                if status != UploadStatus::Processing {
                    return Self::out_of_order(step, "ProcessingStarted", status);
                }
                Some(Applied::Processing { stage: None })
            }
            SessionEvent::StatusUpdate { stage } => {
                if status != UploadStatus::Processing {
                    return Self::out_of_order(step, "StatusUpdate", status);
                }
                Some(Applied::Processing { stage: Some(stage) })
            }
            SessionEvent::Completed {
                primary_url,
                converted_url,
                extracted,
            } => {
                if !matches!(status, UploadStatus::Uploading | UploadStatus::Processing) {
                    return Self::out_of_order(step, "Completed", status);
                }
                entry.record.status = UploadStatus::Ready;
                entry.record.primary_url = Some(primary_url.clone());
                entry.record.converted_url = converted_url.clone();
                entry.record.error = None;
                entry.cancel = None;

                tracing::info!(step = %step, primary_url = %primary_url, "Upload ready");
                Some(Applied::Ready {
                    primary_url,
                    converted_url,
                    extracted,
                })
            }
            SessionEvent::Failed { reason } => {
                if !matches!(status, UploadStatus::Uploading | UploadStatus::Processing) {
                    return Self::out_of_order(step, "Failed", status);
                }
                let message = classify_failure(&reason).to_string();
                entry.record.status = UploadStatus::Error;
                entry.record.error = Some(message.clone());
                entry.cancel = None;

                tracing::warn!(step = %step, raw_reason = %reason, "Upload failed");
                Some(Applied::Failed { message })
            }
        }
    }

    fn out_of_order(step: Step, event: &str, status: UploadStatus) -> Option<Applied> {
        tracing::debug!(
            step = %step,
            event = event,
            status = ?status,
            "Discarding out-of-order session event"
        );
        None
    }

    /// Begin removing a step's upload
    ///
    /// The live session is released first, then the record is provisionally
    /// cleared. When a remote document exists the caller must confirm or
    /// fail the remote delete via [`resolve_remove`]; rollback restores the
    /// exact prior record.
    ///
    /// [`resolve_remove`]: UploadTracker::resolve_remove
    pub fn begin_remove(&mut self, step: Step) -> RemoveStart {
        let entry = self.entry_mut(step);
        entry.release_session();
        entry.generation += 1;

        let snapshot = std::mem::take(&mut entry.record);

        // Only a completed upload has a remote document worth reconciling;
        // an interrupted session is abandoned to remote-side cleanup.
        match (snapshot.status, snapshot.remote_id) {
            (UploadStatus::Ready, Some(remote_id)) => {
                let ticket = entry.generation;
                entry.record.removing = true;
                entry.pending_remove = Some(PendingRemove { snapshot, ticket });

                tracing::info!(step = %step, remote_id = %remote_id, "Upload removal pending remote confirmation");
                RemoveStart::Remote { ticket, remote_id }
            }
            _ => {
                entry.pending_remove = None;
                tracing::info!(step = %step, "Upload removed (local only)");
                RemoveStart::Local
            }
        }
    }

    /// Reconcile a provisional removal with the remote delete result
    pub fn resolve_remove(
        &mut self,
        step: Step,
        ticket: u64,
        result: Result<(), String>,
    ) -> RemoveOutcome {
        let entry = self.entry_mut(step);

        let pending_matches = entry
            .pending_remove
            .as_ref()
            .map(|p| p.ticket == ticket && entry.generation == ticket)
            .unwrap_or(false);
        if !pending_matches {
            tracing::debug!(step = %step, ticket = ticket, "Discarding stale removal resolution");
            return RemoveOutcome::Stale;
        }

        let pending = entry.pending_remove.take().expect("checked above");
        match result {
            Ok(()) => {
                entry.record.removing = false;
                tracing::info!(step = %step, "Upload removal committed");
                RemoveOutcome::Committed
            }
            Err(message) => {
                entry.record = pending.snapshot;
                tracing::warn!(step = %step, message = %message, "Upload removal rolled back");
                RemoveOutcome::RolledBack { message }
            }
        }
    }

    /// Re-enter `uploading` with the previously held file and remote id
    ///
    /// A contract no-op when the step is not in `error`, or when the file or
    /// remote id is missing (e.g. after a history restore).
    pub fn retry(&mut self, step: Step) -> Option<StartedSession> {
        let entry = self.entry_mut(step);

        if entry.record.status != UploadStatus::Error {
            tracing::warn!(step = %step, status = ?entry.record.status, "Retry ignored: step is not in error");
            return None;
        }
        let (Some(file), Some(remote_id), Some(filename)) = (
            entry.record.file.clone(),
            entry.record.remote_id,
            entry.record.filename.clone(),
        ) else {
            tracing::warn!(step = %step, "Retry ignored: no held file or remote id on record");
            return None;
        };

        entry.release_session();
        entry.generation += 1;
        entry.record.status = UploadStatus::Uploading;
        entry.record.error = None;
        entry.record.primary_url = None;
        entry.record.converted_url = None;

        let cancel = CancellationToken::new();
        entry.cancel = Some(cancel.clone());

        tracing::info!(step = %step, generation = entry.generation, "Upload retry started");

        Some(StartedSession {
            generation: entry.generation,
            cancel,
            filename,
            media_type: entry.record.media_type.clone(),
            file,
            remote_id,
        })
    }

    /// Re-seed a step's upload state from a historical version
    ///
    /// Yields `ready` with the produced artifacts and no held file
    /// reference; any live session is released first.
    pub fn restore(
        &mut self,
        step: Step,
        filename: String,
        primary_url: String,
        converted_url: Option<String>,
    ) {
        let entry = self.entry_mut(step);
        entry.release_session();
        entry.pending_remove = None;
        entry.generation += 1;

        entry.record = UploadRecord {
            status: UploadStatus::Ready,
            filename: Some(filename),
            media_type: None,
            file: None,
            remote_id: None,
            primary_url: Some(primary_url),
            converted_url,
            error: None,
            removing: false,
        };

        tracing::info!(step = %step, "Upload state restored from history");
    }

    /// Drop all tracked state (workflow re-open)
    pub fn reset(&mut self) {
        for step in Step::all() {
            let entry = self.entry_mut(step);
            entry.release_session();
            entry.pending_remove = None;
            entry.generation += 1;
            entry.record = UploadRecord::default();
        }
    }
}
