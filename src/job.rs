use std::process::ExitStatus;

use chrono::{Local, NaiveDateTime};
use serde::{Deserialize, Serialize};
use tokio::process::Command;

use crate::error::{Error, Result};

/// Lifecycle state of a job record.
///
/// Stored as a single-character code in the job table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    /// Queued and eligible for selection
    #[sqlx(rename = "a")]
    Active,
    /// Dispatched, execution in progress
    #[sqlx(rename = "r")]
    Running,
    /// Done or disabled, never selected
    #[sqlx(rename = "d")]
    Inactive,
}

impl JobStatus {
    pub fn code(&self) -> &'static str {
        match self {
            JobStatus::Active => "a",
            JobStatus::Running => "r",
            JobStatus::Inactive => "d",
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobStatus::Active => write!(f, "active"),
            JobStatus::Running => write!(f, "running"),
            JobStatus::Inactive => write!(f, "inactive"),
        }
    }
}

impl std::str::FromStr for JobStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "a" | "active" => Ok(JobStatus::Active),
            "r" | "running" => Ok(JobStatus::Running),
            "d" | "inactive" => Ok(JobStatus::Inactive),
            other => Err(format!("unknown job status: {}", other)),
        }
    }
}

/// A persisted unit of deferred work.
///
/// Timestamps are naive local datetimes: eligibility is decided against the
/// host's wall clock, the same clock cron and the lock file use.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Job {
    /// Assigned by the store on insert
    pub id: i64,
    /// The job is not eligible for selection before this time
    pub start: NaiveDateTime,
    /// Higher value runs first
    pub priority: i64,
    /// Interpreter arguments, run verbatim
    pub command: String,
    pub status: JobStatus,
    pub created_on: NaiveDateTime,
    pub updated_on: NaiveDateTime,
}

impl Job {
    /// Run the job command.
    ///
    /// The command is tokenized with shell quoting rules and executed as
    /// `<interpreter> <tokens...>`, inheriting this process's stdout and
    /// stderr. Blocks until the child exits; no timeout is enforced.
    ///
    /// Returns `Ok(None)` without spawning anything when the command is
    /// empty. Failure to spawn (missing interpreter, permissions) surfaces
    /// as `Error::Io`; a failing child is reported through the returned
    /// `ExitStatus`, not as an error.
    pub async fn run(&self, interpreter: &str) -> Result<Option<ExitStatus>> {
        if self.command.is_empty() {
            return Ok(None);
        }

        let args =
            shlex::split(&self.command).ok_or_else(|| Error::BadCommand(self.command.clone()))?;

        tracing::info!(job_id = self.id, command = %self.command, interpreter, "Running job");

        let status = Command::new(interpreter).args(&args).status().await?;

        tracing::info!(job_id = self.id, exit_code = ?status.code(), "Job finished");

        Ok(Some(status))
    }
}

/// Parameters for inserting a new job. The store assigns `id`, `created_on`
/// and `updated_on`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewJob {
    pub start: NaiveDateTime,
    pub priority: i64,
    pub command: String,
    pub status: JobStatus,
}

impl NewJob {
    /// A job due immediately, at default priority.
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            start: Local::now().naive_local(),
            priority: 0,
            command: command.into(),
            status: JobStatus::Active,
        }
    }

    pub fn with_start(mut self, start: NaiveDateTime) -> Self {
        self.start = start;
        self
    }

    pub fn with_priority(mut self, priority: i64) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_status(mut self, status: JobStatus) -> Self {
        self.status = status;
        self
    }
}
