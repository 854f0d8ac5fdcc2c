//! Concurrency controller
//!
//! Bounds how many exports run at once, tracks per-operation progress and
//! enforces cancellation and the export deadline.
//!
//! Every dispatched export gets an [`ExportProgress`] record that moves
//! `pending → processing → completed | failed`. Terminal records stay
//! queryable for the configured retention window and are then reaped by
//! [`ConcurrencyController::sweep`] or the background sweeper.

use std::collections::HashMap;
use std::sync::Arc;

use apidock_domain::{Document, ExportOptions, ExportProgress, ExportResult, ExportStatus, generate_id};
use chrono::Utc;
use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::ConcurrencyConfig;
use crate::error::{ExportError, PipelineResult};
use crate::ports::Exporter;

type ProgressTable = Arc<Mutex<HashMap<String, ExportProgress>>>;

/// Start of the progress range covered by the batch loop.
const BATCH_PROGRESS_START: f64 = 0.1;
/// End of the progress range covered by the batch loop.
const BATCH_PROGRESS_END: f64 = 0.9;

/// Aggregated view over tracked operations.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PerformanceStats {
    /// Tracked operations, terminal ones included until reaped.
    pub total_operations: usize,
    /// Operations waiting for a slot.
    pub pending: usize,
    /// Operations holding a slot.
    pub processing: usize,
    /// Operations that succeeded.
    pub completed: usize,
    /// Operations that failed, timed out or were cancelled.
    pub failed: usize,
    /// Slots currently taken.
    pub active_slots: usize,
    /// Slot capacity.
    pub max_concurrent_exports: usize,
    /// Mean wall-clock duration of completed operations, in milliseconds.
    pub average_duration_ms: f64,
}

/// Gatekeeper for export execution.
#[derive(Debug, Clone)]
pub struct ConcurrencyController {
    config: ConcurrencyConfig,
    capacity: usize,
    semaphore: Arc<Semaphore>,
    progress: ProgressTable,
}

impl ConcurrencyController {
    /// Creates a controller. A capacity of zero is raised to one.
    #[must_use]
    pub fn new(config: ConcurrencyConfig) -> Self {
        let capacity = config.max_concurrent_exports.max(1);
        Self {
            config,
            capacity,
            semaphore: Arc::new(Semaphore::new(capacity)),
            progress: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// The active configuration.
    #[must_use]
    pub const fn config(&self) -> &ConcurrencyConfig {
        &self.config
    }

    /// Runs `exporter` under the slot limit and the export deadline.
    ///
    /// Documents with more active endpoints than the streaming threshold
    /// go through the batched path, which reports progress per batch and
    /// checks for cancellation between batches. Both paths produce the
    /// same content.
    ///
    /// # Errors
    /// Returns `ExportError::Cancelled` if `cancel` fires before the
    /// transform starts, `ExportError::Timeout` if the deadline passes, or
    /// whatever the exporter returns.
    pub async fn run(
        &self,
        exporter: Arc<dyn Exporter>,
        document: Arc<Document>,
        options: ExportOptions,
        cancel: &CancellationToken,
    ) -> PipelineResult<ExportResult> {
        let progress_id = generate_id();
        let collection_id = document.collection.id.clone();
        self.progress.lock().insert(
            progress_id.clone(),
            ExportProgress::new(&progress_id, &collection_id, options.format),
        );
        debug!(%progress_id, %collection_id, format = %options.format, "export dispatched");

        let deadline = self.config.export_timeout();
        let outcome = match tokio::time::timeout(
            deadline,
            self.execute(&progress_id, exporter, document, options, cancel),
        )
        .await
        {
            Ok(outcome) => outcome,
            Err(_) => Err(ExportError::Timeout(deadline)),
        };

        match &outcome {
            Ok(result) => {
                self.update(&progress_id, ExportProgress::complete);
                info!(%progress_id, %collection_id, size = result.size, "export completed");
            }
            Err(error) => {
                let message = error.to_string();
                warn!(%progress_id, %collection_id, error = %message, "export failed");
                self.update(&progress_id, |p| p.fail(message));
            }
        }

        outcome
    }

    async fn execute(
        &self,
        progress_id: &str,
        exporter: Arc<dyn Exporter>,
        document: Arc<Document>,
        options: ExportOptions,
        cancel: &CancellationToken,
    ) -> PipelineResult<ExportResult> {
        let permit = self.acquire_slot(cancel).await?;
        self.update(progress_id, |p| p.advance(0.0, "slot acquired"));

        let endpoint_count = document.active_endpoint_count();
        if endpoint_count > self.config.streaming_threshold {
            debug!(progress_id, endpoint_count, "using batched dispatch");
            self.run_batches(progress_id, endpoint_count, cancel).await?;
            self.update(progress_id, |p| p.advance(BATCH_PROGRESS_END, "generating export"));
        } else {
            self.update(progress_id, |p| p.advance(0.5, "generating export"));
        }

        Self::transform(exporter, document, options, permit).await
    }

    /// Waits for a slot, giving up as soon as `cancel` fires.
    async fn acquire_slot(&self, cancel: &CancellationToken) -> PipelineResult<OwnedSemaphorePermit> {
        if cancel.is_cancelled() {
            return Err(ExportError::Cancelled);
        }

        tokio::select! {
            biased;
            () = cancel.cancelled() => Err(ExportError::Cancelled),
            permit = Arc::clone(&self.semaphore).acquire_owned() => {
                permit.map_err(|_| ExportError::Internal("export slots closed".into()))
            }
        }
    }

    /// Walks the endpoints in fixed-size batches, advancing progress from
    /// 10% to 90% and pausing between batches so cancellation is observed.
    #[allow(clippy::cast_precision_loss)]
    async fn run_batches(
        &self,
        progress_id: &str,
        endpoint_count: usize,
        cancel: &CancellationToken,
    ) -> PipelineResult<()> {
        let batch_size = self.config.streaming_batch_size.max(1);
        let batches = endpoint_count.div_ceil(batch_size);
        let pause = self.config.batch_pause();

        self.update(progress_id, |p| p.advance(BATCH_PROGRESS_START, "preparing batches"));

        for batch in 0..batches {
            if cancel.is_cancelled() {
                return Err(ExportError::Cancelled);
            }

            let done = ((batch + 1) * batch_size).min(endpoint_count);
            let fraction = BATCH_PROGRESS_START
                + (BATCH_PROGRESS_END - BATCH_PROGRESS_START) * (batch + 1) as f64 / batches as f64;
            self.update(progress_id, |p| {
                p.advance(fraction, format!("processed {done} of {endpoint_count} endpoints"));
            });

            tokio::select! {
                biased;
                () = cancel.cancelled() => return Err(ExportError::Cancelled),
                () = tokio::time::sleep(pause) => {}
            }
        }

        Ok(())
    }

    /// Runs the exporter on the blocking pool. The slot is released when
    /// the exporter returns, even if the caller stopped waiting.
    async fn transform(
        exporter: Arc<dyn Exporter>,
        document: Arc<Document>,
        options: ExportOptions,
        permit: OwnedSemaphorePermit,
    ) -> PipelineResult<ExportResult> {
        tokio::task::spawn_blocking(move || {
            let _permit = permit;
            exporter.export(&document, &options)
        })
        .await
        .map_err(|e| ExportError::Internal(format!("export worker failed: {e}")))?
    }

    fn update(&self, progress_id: &str, apply: impl FnOnce(&mut ExportProgress)) {
        if let Some(entry) = self.progress.lock().get_mut(progress_id) {
            apply(entry);
        }
    }

    /// Copy of one progress record.
    #[must_use]
    pub fn get_progress(&self, progress_id: &str) -> Option<ExportProgress> {
        self.progress.lock().get(progress_id).cloned()
    }

    /// Copy of every tracked progress record.
    #[must_use]
    pub fn get_all_progress(&self) -> HashMap<String, ExportProgress> {
        self.progress.lock().clone()
    }

    /// Slots free right now.
    #[must_use]
    pub fn available_slots(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// Removes terminal records older than the retention window.
    pub fn sweep(&self) -> usize {
        sweep_table(&self.progress, self.config.progress_retention())
    }

    /// Starts a task that calls [`sweep`](Self::sweep) on every interval
    /// tick until `shutdown` fires.
    #[must_use]
    pub fn spawn_sweeper(&self, shutdown: CancellationToken) -> JoinHandle<()> {
        let table = Arc::clone(&self.progress);
        let retention = self.config.progress_retention();
        let mut interval = tokio::time::interval(self.config.sweep_interval());

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    () = shutdown.cancelled() => break,
                    _ = interval.tick() => {
                        let reaped = sweep_table(&table, retention);
                        if reaped > 0 {
                            debug!(reaped, "reaped finished export progress");
                        }
                    }
                }
            }
        })
    }

    /// Counts by status and the mean duration of completed operations.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn stats(&self) -> PerformanceStats {
        let table = self.progress.lock();

        let count = |status: ExportStatus| table.values().filter(|p| p.status == status).count();
        let durations: Vec<i64> = table
            .values()
            .filter(|p| p.status == ExportStatus::Completed)
            .filter_map(ExportProgress::duration)
            .map(|d| d.num_milliseconds())
            .collect();
        let average_duration_ms = if durations.is_empty() {
            0.0
        } else {
            durations.iter().sum::<i64>() as f64 / durations.len() as f64
        };

        PerformanceStats {
            total_operations: table.len(),
            pending: count(ExportStatus::Pending),
            processing: count(ExportStatus::Processing),
            completed: count(ExportStatus::Completed),
            failed: count(ExportStatus::Failed),
            active_slots: self.capacity - self.semaphore.available_permits(),
            max_concurrent_exports: self.capacity,
            average_duration_ms,
        }
    }
}

fn sweep_table(table: &Mutex<HashMap<String, ExportProgress>>, retention: std::time::Duration) -> usize {
    let retention = chrono::Duration::from_std(retention).unwrap_or(chrono::Duration::MAX);
    let now = Utc::now();

    let mut table = table.lock();
    let before = table.len();
    table.retain(|_, p| match p.completed_at {
        Some(done) if p.status.is_terminal() => now - done < retention,
        _ => true,
    });
    before - table.len()
}
