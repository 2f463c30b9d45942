use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::{Local, NaiveDateTime};

use crate::config::QueueConfig;
use crate::error::{Error, Result};
use crate::job::{Job, JobStatus};
use crate::store::{JobStore, LimitBy, OrderBy, SortField};

/// Selects eligible jobs in priority order and serializes queue-processing
/// passes with an advisory lock file.
///
/// The lock is cooperative: it only protects against other callers that also
/// check it. Selection and execution are not transactional with respect to
/// the job table.
#[derive(Debug, Clone)]
pub struct JobQueue {
    store: JobStore,
    config: QueueConfig,
}

impl JobQueue {
    pub fn new(store: JobStore, config: QueueConfig) -> Self {
        Self { store, config }
    }

    pub fn store(&self) -> &JobStore {
        &self.store
    }

    pub fn config(&self) -> &QueueConfig {
        &self.config
    }

    /// Return the active jobs in the queue.
    ///
    /// With `maximum_start` set, only jobs due at or before that time are
    /// returned; pass the current time and jobs scheduled in the future are
    /// excluded. Ordering defaults to the store's insertion order; descending
    /// must be requested explicitly via `orderby`.
    pub async fn jobs(
        &self,
        maximum_start: Option<NaiveDateTime>,
        orderby: Option<OrderBy>,
        limitby: Option<LimitBy>,
    ) -> Result<Vec<Job>> {
        self.store
            .select(JobStatus::Active, maximum_start, orderby, limitby)
            .await
    }

    /// Return the highest-priority job that is due now.
    ///
    /// Equal priorities resolve to the oldest id. Fails with
    /// `Error::QueueEmpty` when no job is eligible.
    pub async fn top_job(&self) -> Result<Job> {
        let now = Local::now().naive_local();
        let mut jobs = self
            .jobs(
                Some(now),
                Some(OrderBy::desc(SortField::Priority)),
                Some(LimitBy::First(1)),
            )
            .await?;
        jobs.pop().ok_or(Error::QueueEmpty)
    }

    /// Lock the queue using the configured lock file and extended threshold.
    pub fn lock(&self) -> Result<PathBuf> {
        self.lock_at(&self.config.lock_file, self.config.extended_seconds)
    }

    /// Lock the queue by creating a marker file at `path` containing this
    /// process's id. Returns the path on success.
    ///
    /// If the file already exists the queue is considered locked: the age of
    /// the existing file (now minus its mtime) decides between the ordinary
    /// `QueueLocked` error and, when `extended_seconds` is non-zero and
    /// exceeded, `QueueLockedExtended`.
    pub fn lock_at(&self, path: &Path, extended_seconds: u64) -> Result<PathBuf> {
        if path.exists() {
            let age_seconds = lock_age_seconds(path);
            if extended_seconds > 0 && age_seconds > extended_seconds {
                return Err(Error::QueueLockedExtended {
                    path: path.to_path_buf(),
                    age_seconds,
                });
            }
            return Err(Error::QueueLocked {
                path: path.to_path_buf(),
                age_seconds,
            });
        }

        fs::write(path, std::process::id().to_string())?;
        tracing::debug!(lock = %path.display(), "Queue locked");
        Ok(path.to_path_buf())
    }

    /// Unlock the queue by removing the configured lock file.
    pub fn unlock(&self) -> Result<()> {
        self.unlock_at(&self.config.lock_file)
    }

    /// Remove the marker file at `path`. A missing file is not an error, so
    /// unlocking twice is safe.
    pub fn unlock_at(&self, path: &Path) -> Result<()> {
        if path.exists() {
            fs::remove_file(path)?;
            tracing::debug!(lock = %path.display(), "Queue unlocked");
        }
        Ok(())
    }
}

/// Age of the lock file in whole seconds, from its modification time.
/// An unreadable mtime counts as age zero, which errs toward the less severe
/// locked condition.
fn lock_age_seconds(path: &Path) -> u64 {
    fs::metadata(path)
        .and_then(|meta| meta.modified())
        .ok()
        .and_then(|mtime| SystemTime::now().duration_since(mtime).ok())
        .map(|age| age.as_secs())
        .unwrap_or(0)
}
