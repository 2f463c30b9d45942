use tokio_util::sync::CancellationToken;

use crate::error::{Error, Result};
use crate::job::JobStatus;
use crate::queue::JobQueue;

/// What a queue-processing pass accomplished.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassSummary {
    /// Jobs that ran and exited zero
    pub completed: usize,
    /// Jobs that exited non-zero, had an empty command, or failed to spawn
    pub failed: usize,
    /// True when the pass was skipped because the queue was already locked
    pub skipped: bool,
}

impl PassSummary {
    fn skipped() -> Self {
        Self {
            skipped: true,
            ..Default::default()
        }
    }
}

/// Drives queue-processing passes: lock, drain due jobs in priority order,
/// unlock.
///
/// The runner owns the status transitions the queue itself does not perform:
/// each job is marked running before execution and retired to inactive after,
/// whatever its exit code. Retry policy is deliberately the operator's.
#[derive(Debug, Clone)]
pub struct Runner {
    queue: JobQueue,
}

impl Runner {
    pub fn new(queue: JobQueue) -> Self {
        Self { queue }
    }

    pub fn queue(&self) -> &JobQueue {
        &self.queue
    }

    /// Run one queue-processing pass.
    ///
    /// An ordinarily locked queue is routine contention: the pass is skipped
    /// and the summary says so. A lock past the extended threshold propagates
    /// as `QueueLockedExtended` so the invoking process exits loudly.
    pub async fn pass(&self) -> Result<PassSummary> {
        match self.queue.lock() {
            Ok(_) => {}
            Err(Error::QueueLocked { path, age_seconds }) => {
                tracing::info!(
                    lock = %path.display(),
                    age_seconds,
                    "Queue already locked, skipping pass"
                );
                return Ok(PassSummary::skipped());
            }
            Err(err) => return Err(err),
        }

        let outcome = self.drain().await;
        self.queue.unlock()?;
        outcome
    }

    async fn drain(&self) -> Result<PassSummary> {
        let mut summary = PassSummary::default();

        loop {
            let job = match self.queue.top_job().await {
                Ok(job) => job,
                Err(Error::QueueEmpty) => break,
                Err(err) => return Err(err),
            };

            let store = self.queue.store();
            store.update_status(job.id, JobStatus::Running).await?;

            match job.run(&self.queue.config().interpreter).await {
                Ok(Some(status)) if status.success() => summary.completed += 1,
                Ok(Some(status)) => {
                    tracing::warn!(
                        job_id = job.id,
                        exit_code = ?status.code(),
                        "Job exited non-zero"
                    );
                    summary.failed += 1;
                }
                Ok(None) => {
                    tracing::warn!(job_id = job.id, "Job has an empty command, nothing run");
                    summary.failed += 1;
                }
                Err(err) => {
                    tracing::error!(job_id = job.id, error = %err, "Job could not be executed");
                    summary.failed += 1;
                }
            }

            // Retired regardless of outcome; a failed job is not re-queued.
            store.update_status(job.id, JobStatus::Inactive).await?;
        }

        tracing::info!(
            completed = summary.completed,
            failed = summary.failed,
            "Queue pass finished"
        );
        Ok(summary)
    }

    /// Repeat passes at the configured interval until `cancel` fires.
    ///
    /// Pass failures (including an extended lock) are logged and do not stop
    /// the loop; the next interval gets a fresh attempt.
    pub async fn watch(&self, cancel: CancellationToken) -> Result<()> {
        let interval = self.queue.config().poll_interval;
        tracing::info!(interval_secs = interval.as_secs(), "Watching queue");

        loop {
            if let Err(err) = self.pass().await {
                tracing::error!(error = %err, "Queue pass failed");
            }

            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("Shutdown requested, watch loop stopping");
                    return Ok(());
                }
                _ = tokio::time::sleep(interval) => {}
            }
        }
    }
}
