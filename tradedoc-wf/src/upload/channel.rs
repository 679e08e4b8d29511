//! Remote upload + processing session driver
//!
//! Opens a per-file session against the document processing backend and
//! drives it through remote processing, emitting the ordered lifecycle
//! events into the workflow signal channel: session-ready, transfer
//! complete, processing started, zero or more status updates, and exactly
//! one terminal completion or failure.
//!
//! The channel performs no retries; retry is a caller-level decision.
//! Cancelling stops local event delivery only, it does not guarantee a
//! remote-side abort of an in-flight transfer.

use bytes::Bytes;
use serde::Deserialize;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tradedoc_common::steps::Step;
use tradedoc_common::{Error, Result};
use uuid::Uuid;

use super::events::{SessionEvent, WorkflowSignal};

const USER_AGENT: &str = concat!("tradedoc-wf/", env!("CARGO_PKG_VERSION"));
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Session creation response from the processing backend
#[derive(Debug, Deserialize)]
struct SessionCreated {
    session_id: Uuid,
    /// Confirmed remote document identifier
    remote_id: Uuid,
    /// Presigned target for the file transfer
    upload_url: String,
}

/// Processing status response from the processing backend
#[derive(Debug, Deserialize)]
struct SessionStatus {
    state: SessionState,
    /// Opaque progress payload while processing
    stage: Option<String>,
    primary_url: Option<String>,
    converted_url: Option<String>,
    extracted: Option<serde_json::Value>,
    reason: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
enum SessionState {
    Pending,
    Processing,
    Completed,
    Failed,
}

/// Client for the document processing backend
#[derive(Debug, Clone)]
pub struct UploadChannel {
    client: reqwest::Client,
    base_url: String,
    poll_interval: Duration,
    /// Optional stall policy; `None` means a stuck session is resolved only
    /// by user retry or removal
    processing_timeout: Option<Duration>,
}

impl UploadChannel {
    pub fn new(
        base_url: String,
        poll_interval: Duration,
        processing_timeout: Option<Duration>,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| Error::Internal(format!("HTTP client init failed: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            poll_interval,
            processing_timeout,
        })
    }

    /// Open an upload session and drive it to its terminal event
    ///
    /// Returns immediately; lifecycle events arrive asynchronously through
    /// `tx` tagged with `step` and `generation`. The caller keeps the other
    /// half of `cancel` and may stop event delivery at any time.
    #[allow(clippy::too_many_arguments)]
    pub fn open(
        &self,
        step: Step,
        generation: u64,
        filename: String,
        media_type: Option<String>,
        file: Bytes,
        remote_id: Uuid,
        tx: UnboundedSender<WorkflowSignal>,
        cancel: CancellationToken,
    ) {
        let channel = self.clone();
        tokio::spawn(async move {
            let send = |event: SessionEvent| {
                let _ = tx.send(WorkflowSignal::Upload {
                    step,
                    generation,
                    event,
                });
            };

            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::debug!(step = %step, generation = generation, "Upload session cancelled");
                }
                () = channel.drive_session(step, filename, media_type, file, remote_id, &send) => {}
            }
        });
    }

    /// Best-effort remote delete of a document, feeding the result back as a
    /// removal reconciliation signal
    pub fn delete_document(
        &self,
        step: Step,
        ticket: u64,
        remote_id: Uuid,
        tx: UnboundedSender<WorkflowSignal>,
    ) {
        let channel = self.clone();
        tokio::spawn(async move {
            let url = format!("{}/documents/{}", channel.base_url, remote_id);
            let result = match channel.client.delete(&url).send().await {
                // A document the remote side no longer knows about is gone
                // either way; treat 404 as success.
                Ok(response)
                    if response.status().is_success()
                        || response.status() == reqwest::StatusCode::NOT_FOUND =>
                {
                    Ok(())
                }
                Ok(response) => Err(format!("delete failed with status {}", response.status())),
                Err(e) => Err(format!("delete request failed: {}", e)),
            };

            let _ = tx.send(WorkflowSignal::RemoveResolved {
                step,
                ticket,
                result,
            });
        });
    }

    async fn drive_session(
        &self,
        step: Step,
        filename: String,
        media_type: Option<String>,
        file: Bytes,
        remote_id: Uuid,
        send: &impl Fn(SessionEvent),
    ) {
        // Phase 1: establish the session
        let created = match self.create_session(remote_id, &filename, media_type.as_deref()).await
        {
            Ok(created) => created,
            Err(reason) => {
                send(SessionEvent::Failed { reason });
                return;
            }
        };
        send(SessionEvent::SessionReady {
            remote_id: created.remote_id,
        });

        // Phase 2: transfer the file bytes
        if let Err(reason) = self.transfer(&created.upload_url, file).await {
            send(SessionEvent::Failed { reason });
            return;
        }
        send(SessionEvent::TransferComplete);
        send(SessionEvent::ProcessingStarted);

        // Phase 3: poll until the single terminal state
        let deadline = self.processing_timeout.map(|t| Instant::now() + t);
        loop {
            tokio::time::sleep(self.poll_interval).await;

            if let Some(deadline) = deadline {
                if Instant::now() >= deadline {
                    tracing::warn!(step = %step, session_id = %created.session_id, "Processing stalled past configured timeout");
                    send(SessionEvent::Failed {
                        reason: "processing stalled".to_string(),
                    });
                    return;
                }
            }

            let status = match self.session_status(created.session_id).await {
                Ok(status) => status,
                Err(reason) => {
                    send(SessionEvent::Failed { reason });
                    return;
                }
            };

            match status.state {
                SessionState::Pending => {}
                SessionState::Processing => {
                    if let Some(stage) = status.stage {
                        send(SessionEvent::StatusUpdate { stage });
                    }
                }
                SessionState::Completed => {
                    let Some(primary_url) = status.primary_url else {
                        send(SessionEvent::Failed {
                            reason: "request failed: completion without artifact".to_string(),
                        });
                        return;
                    };
                    send(SessionEvent::Completed {
                        primary_url,
                        converted_url: status.converted_url,
                        extracted: status.extracted,
                    });
                    return;
                }
                SessionState::Failed => {
                    send(SessionEvent::Failed {
                        reason: status
                            .reason
                            .unwrap_or_else(|| "request failed: no reason given".to_string()),
                    });
                    return;
                }
            }
        }
    }

    async fn create_session(
        &self,
        remote_id: Uuid,
        filename: &str,
        media_type: Option<&str>,
    ) -> std::result::Result<SessionCreated, String> {
        let url = format!("{}/documents/{}/sessions", self.base_url, remote_id);
        let body = serde_json::json!({
            "filename": filename,
            "media_type": media_type,
        });

        tracing::debug!(remote_id = %remote_id, filename = %filename, "Requesting upload session");

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(transport_reason)?;

        if !response.status().is_success() {
            return Err(format!("request failed with status {}", response.status()));
        }

        response
            .json::<SessionCreated>()
            .await
            .map_err(|e| format!("request failed: malformed response: {}", e))
    }

    async fn transfer(&self, upload_url: &str, file: Bytes) -> std::result::Result<(), String> {
        let response = self
            .client
            .put(upload_url)
            .body(file)
            .send()
            .await
            .map_err(transport_reason)?;

        if !response.status().is_success() {
            return Err(format!("transfer failed with status {}", response.status()));
        }
        Ok(())
    }

    async fn session_status(
        &self,
        session_id: Uuid,
    ) -> std::result::Result<SessionStatus, String> {
        let url = format!("{}/sessions/{}", self.base_url, session_id);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(transport_reason)?;

        if !response.status().is_success() {
            return Err(format!("request failed with status {}", response.status()));
        }

        response
            .json::<SessionStatus>()
            .await
            .map_err(|e| format!("request failed: malformed response: {}", e))
    }
}

/// Shape a transport error so the classifier can tell connectivity apart
/// from request/transfer failures
///
/// reqwest's Display for connect errors mentions the word "request", which
/// would match the transfer bucket first; connectivity reasons therefore
/// carry a fixed string and the raw error goes to the log only.
fn transport_reason(e: reqwest::Error) -> String {
    if e.is_connect() || e.is_timeout() {
        tracing::debug!(error = %e, "Transport-level connectivity failure");
        "network error: could not reach the processing service".to_string()
    } else {
        format!("request failed: {}", e)
    }
}
