//! Progress events
//!
//! The engine reports to an injected [`ProgressSink`]. Emission is
//! fire-and-forget: `emit` must not block, and a sink that cannot deliver
//! drops the event with a warning. Events serialize as
//! `{"type": "...", "data": ...}`.

use amend_document::DocumentId;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::outcome::ChangeOutcome;
use crate::report::ProcessingReport;

/// Something the engine tells its observer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum ProgressEvent {
    /// One change finished, successfully or not
    OperationCompleted(ChangeOutcome),
    /// Share of the plan processed so far
    Progress(ProgressUpdate),
    /// The run finished; carries the full report
    Completed(ProcessingReport),
    /// The run stopped before executing any change
    Error(RunFailure),
}

impl ProgressEvent {
    /// Wire `type` tag
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::OperationCompleted(_) => "operation_completed",
            Self::Progress(_) => "progress",
            Self::Completed(_) => "completed",
            Self::Error(_) => "error",
        }
    }
}

/// Counts behind a `progress` event
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProgressUpdate {
    /// Changes finished so far
    pub done: usize,
    /// Changes in the plan
    pub total: usize,
    /// `done / total` as a percentage, one decimal; 100 for an empty plan
    pub percent: f64,
}

impl ProgressUpdate {
    /// Counts for `done` of `total` finished changes
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn new(done: usize, total: usize) -> Self {
        let percent = if total == 0 {
            100.0
        } else {
            (done as f64 / total as f64 * 1000.0).round() / 10.0
        };
        Self {
            done,
            total,
            percent,
        }
    }
}

/// Payload of an `error` event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunFailure {
    /// Document the run was started on
    pub document_id: DocumentId,
    /// Human-readable cause
    pub message: String,
}

/// Observer of run progress
pub trait ProgressSink: Send + Sync {
    /// Deliver one event without blocking
    fn emit(&self, event: ProgressEvent);
}

impl<F> ProgressSink for F
where
    F: Fn(ProgressEvent) + Send + Sync,
{
    fn emit(&self, event: ProgressEvent) {
        self(event);
    }
}

/// Sink that discards everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSink;

impl ProgressSink for NoopSink {
    fn emit(&self, _event: ProgressEvent) {}
}

/// Sink forwarding into a bounded tokio channel
///
/// A full or closed channel drops the event.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::Sender<ProgressEvent>,
}

impl ChannelSink {
    /// Sink and receiver over a channel holding `capacity` events
    #[must_use]
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<ProgressEvent>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx }, rx)
    }
}

impl ProgressSink for ChannelSink {
    fn emit(&self, event: ProgressEvent) {
        if let Err(err) = self.tx.try_send(event) {
            let kind = match &err {
                mpsc::error::TrySendError::Full(e) | mpsc::error::TrySendError::Closed(e) => {
                    e.kind()
                }
            };
            tracing::warn!(event = kind, error = %err, "progress event dropped");
        }
    }
}

/// Sink writing each event to the log
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl ProgressSink for TracingSink {
    fn emit(&self, event: ProgressEvent) {
        match event {
            ProgressEvent::OperationCompleted(outcome) => tracing::info!(
                change_id = %outcome.change_id,
                operation = %outcome.operation,
                status = %outcome.status,
                matches = outcome.details.matches_found,
                replacements = outcome.details.replacements_made,
                error = outcome.details.error.map(|c| c.as_str()),
                "{}",
                outcome.description
            ),
            ProgressEvent::Progress(update) => {
                tracing::debug!(done = update.done, total = update.total, percent = update.percent, "progress");
            }
            ProgressEvent::Completed(report) => tracing::info!("{}", report.summary()),
            ProgressEvent::Error(failure) => {
                tracing::error!(document = %failure.document_id, "{}", failure.message);
            }
        }
    }
}
