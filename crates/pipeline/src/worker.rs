//! The single worker loop driving queued bulk-translation jobs.
//!
//! One long-lived Tokio task polls the queue at a fixed interval and
//! performs at most one claim + chunk-execute cycle per tick. A start
//! guard makes repeated `start` calls no-ops, so the process can never run
//! two loops against the same queue.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use lexiport_db::models::job::Job;
use lexiport_db::repositories::{JobRepo, RunRepo};
use lexiport_db::DbPool;
use lexiport_events::{names, ProgressBus, ProgressEvent};

use crate::chunk::ChunkRequest;
use crate::executor::ChunkExecutor;

/// Default polling interval for the worker loop.
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Reason stored on jobs whose payload cannot be decoded.
const MALFORMED_PAYLOAD: &str = "Malformed job payload";

/// The queue-polling worker. Construct once at bootstrap and share via
/// `Arc`; the start guard is per-instance, not ambient global state, so
/// tests can build independent workers.
pub struct WorkerRunner {
    pool: DbPool,
    executor: Arc<ChunkExecutor>,
    bus: Arc<ProgressBus>,
    poll_interval: Duration,
    started: AtomicBool,
}

impl WorkerRunner {
    pub fn new(pool: DbPool, executor: Arc<ChunkExecutor>, bus: Arc<ProgressBus>) -> Self {
        Self {
            pool,
            executor,
            bus,
            poll_interval: DEFAULT_POLL_INTERVAL,
            started: AtomicBool::new(false),
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Spawn the polling loop. Returns `None` if this instance was already
    /// started — only the first caller gets the task handle.
    pub fn start(self: &Arc<Self>, cancel: CancellationToken) -> Option<JoinHandle<()>> {
        if self.started.swap(true, Ordering::SeqCst) {
            tracing::warn!("Worker loop already started, ignoring");
            return None;
        }

        let runner = Arc::clone(self);
        Some(tokio::spawn(async move { runner.run(cancel).await }))
    }

    async fn run(&self, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(self.poll_interval);
        tracing::info!(
            poll_interval_ms = self.poll_interval.as_millis() as u64,
            "Worker loop started",
        );

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("Worker loop shutting down");
                    break;
                }
                _ = ticker.tick() => {
                    self.tick().await;
                }
            }
        }
    }

    /// One cycle: claim at most one job and process its next chunk.
    ///
    /// Queue unavailability is never fatal: a claim failure degrades to a
    /// no-op tick and the next tick retries.
    pub async fn tick(&self) {
        let job = match JobRepo::claim_next(&self.pool).await {
            Ok(job) => job,
            Err(e) => {
                tracing::warn!(error = %e, "Job claim failed, skipping tick");
                return;
            }
        };
        let Some(job) = job else {
            return;
        };

        if let Err(e) = self.process_job(&job).await {
            tracing::error!(job_id = job.id, error = %e, "Chunk cycle failed");
            if let Err(e) = JobRepo::record_failure(&self.pool, job.id, &e.to_string()).await {
                tracing::error!(job_id = job.id, error = %e, "Failed to record job failure");
            }
        }
    }

    async fn process_job(
        &self,
        job: &Job,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let run_id = match job.run_id {
            Some(run_id) => run_id,
            None => {
                // A job without a run cannot make progress; park it as failed.
                JobRepo::fail(&self.pool, job.id, "Job has no run").await?;
                return Ok(());
            }
        };

        let mut payload = match job.payload() {
            Ok(payload) => payload,
            Err(e) => {
                tracing::error!(job_id = job.id, error = %e, "{MALFORMED_PAYLOAD}");
                JobRepo::fail(&self.pool, job.id, MALFORMED_PAYLOAD).await?;
                RunRepo::mark_failed(&self.pool, run_id).await?;
                return Ok(());
            }
        };

        let slice = payload.next_slice().to_vec();
        if slice.is_empty() {
            return self.finalize(job.id, run_id).await;
        }

        tracing::info!(
            job_id = job.id,
            run_id,
            cursor = payload.cursor_index,
            chunk_len = slice.len(),
            "Processing chunk",
        );

        let request = ChunkRequest::from_payload(run_id, &payload, &slice);
        self.executor.execute(&request).await?;

        // Advance only after the whole chunk succeeded; a failure above
        // leaves the cursor where it was so the next tick retries the same
        // slice.
        payload.advance(slice.len());
        JobRepo::store_payload(&self.pool, job.id, &payload).await?;
        Ok(())
    }

    /// The cursor reached the end of the product list: mark the job done
    /// and complete the run, exactly once.
    async fn finalize(
        &self,
        job_id: i64,
        run_id: i64,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        JobRepo::mark_done(&self.pool, job_id).await?;
        let transitioned = RunRepo::mark_done(&self.pool, run_id).await?;
        if transitioned {
            tracing::info!(job_id, run_id, "Run completed");
            if let Some(run) = RunRepo::find_by_id(&self.pool, run_id).await? {
                self.bus.publish(
                    run_id,
                    ProgressEvent::new(names::TOTALS_UPDATE).with_payload(serde_json::json!({
                        "requested": run.requested,
                        "done": run.done,
                        "updated": run.updated,
                        "skipped": run.skipped,
                        "errors": run.errors,
                        "finished": true,
                    })),
                );
            }
        }
        Ok(())
    }
}
