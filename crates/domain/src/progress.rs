//! Progress records for running exports.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::export::ExportFormat;

/// Lifecycle state of an export operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ExportStatus {
    /// Waiting for a concurrency slot.
    #[default]
    Pending,
    /// Holding a slot and transforming.
    Processing,
    /// Finished successfully.
    Completed,
    /// Finished with an error, a timeout or a cancellation.
    Failed,
}

impl ExportStatus {
    /// Whether no further transition can happen.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

/// Snapshot of one export operation, as seen by polling clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportProgress {
    /// Progress identifier.
    pub id: String,
    /// Collection being exported.
    pub collection_id: String,
    /// Target format.
    pub format: ExportFormat,
    /// Current state.
    pub status: ExportStatus,
    /// Completion fraction in `[0, 1]`.
    pub progress: f64,
    /// Human-readable label of the current step.
    pub current_step: String,
    /// When the operation was dispatched.
    pub started_at: DateTime<Utc>,
    /// When the operation reached a terminal state.
    pub completed_at: Option<DateTime<Utc>>,
    /// Failure description.
    pub error: Option<String>,
    /// Estimated milliseconds until completion.
    pub estimated_remaining_ms: Option<u64>,
}

impl ExportProgress {
    /// Creates a pending record.
    #[must_use]
    pub fn new(id: impl Into<String>, collection_id: impl Into<String>, format: ExportFormat) -> Self {
        Self {
            id: id.into(),
            collection_id: collection_id.into(),
            format,
            status: ExportStatus::Pending,
            progress: 0.0,
            current_step: "waiting for slot".to_string(),
            started_at: Utc::now(),
            completed_at: None,
            error: None,
            estimated_remaining_ms: None,
        }
    }

    /// Moves to `processing` at `fraction`.
    ///
    /// The fraction never goes backwards and is clamped to `[0, 1]`.
    /// Terminal records are left untouched.
    pub fn advance(&mut self, fraction: f64, step: impl Into<String>) {
        if self.status.is_terminal() {
            return;
        }
        self.status = ExportStatus::Processing;
        self.progress = fraction.clamp(0.0, 1.0).max(self.progress);
        self.current_step = step.into();
        self.estimated_remaining_ms = self.estimate_remaining(Utc::now());
    }

    /// Marks the operation completed.
    pub fn complete(&mut self) {
        if self.status.is_terminal() {
            return;
        }
        self.status = ExportStatus::Completed;
        self.progress = 1.0;
        self.current_step = "completed".to_string();
        self.completed_at = Some(Utc::now());
        self.estimated_remaining_ms = Some(0);
    }

    /// Marks the operation failed with `message`.
    pub fn fail(&mut self, message: impl Into<String>) {
        if self.status.is_terminal() {
            return;
        }
        self.status = ExportStatus::Failed;
        self.current_step = "failed".to_string();
        self.error = Some(message.into());
        self.completed_at = Some(Utc::now());
        self.estimated_remaining_ms = None;
    }

    /// Wall-clock duration of a finished operation.
    #[must_use]
    pub fn duration(&self) -> Option<chrono::Duration> {
        self.completed_at.map(|end| end - self.started_at)
    }

    /// Linear extrapolation from elapsed time and progress so far.
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    fn estimate_remaining(&self, now: DateTime<Utc>) -> Option<u64> {
        if self.progress <= 0.0 {
            return None;
        }
        let elapsed = (now - self.started_at).num_milliseconds().max(0) as f64;
        let remaining = elapsed * (1.0 - self.progress) / self.progress;
        Some(remaining.round() as u64)
    }
}
