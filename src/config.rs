use std::path::PathBuf;
use std::time::Duration;

/// Configuration for a job queue and its runner.
///
/// The lock file path is carried here rather than as a process-wide constant
/// so that independent queues (tests, multiple applications on one host) can
/// each own their own lock.
#[derive(Debug, Clone)]
pub struct QueueConfig {
    /// Database the job table lives in (sqlx URL, e.g. "sqlite:jobq.db")
    pub database_url: String,

    /// Advisory lock marker for queue-processing passes.
    /// Contains the pid of the holder while locked.
    pub lock_file: PathBuf,

    /// Interpreter prepended to every job command.
    /// Jobs are run as `<interpreter> <tokenized command>`.
    pub interpreter: String,

    /// If non-zero, a lock older than this many seconds raises the
    /// extended-lock error instead of the ordinary locked error.
    pub extended_seconds: u64,

    /// Delay between passes in watch mode.
    pub poll_interval: Duration,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            database_url: "sqlite:jobq.db".to_string(),
            lock_file: PathBuf::from("/var/run/jobq.pid"),
            interpreter: "python3".to_string(),
            extended_seconds: 0,
            poll_interval: Duration::from_secs(5),
        }
    }
}

impl QueueConfig {
    pub fn new(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            ..Default::default()
        }
    }

    pub fn with_lock_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.lock_file = path.into();
        self
    }

    pub fn with_interpreter(mut self, interpreter: impl Into<String>) -> Self {
        self.interpreter = interpreter.into();
        self
    }

    pub fn with_extended_seconds(mut self, seconds: u64) -> Self {
        self.extended_seconds = seconds;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn queue_config_default() {
        let cfg = QueueConfig::default();
        assert_eq!(cfg.database_url, "sqlite:jobq.db");
        assert_eq!(cfg.lock_file, PathBuf::from("/var/run/jobq.pid"));
        assert_eq!(cfg.interpreter, "python3");
        assert_eq!(cfg.extended_seconds, 0);
        assert_eq!(cfg.poll_interval, Duration::from_secs(5));
    }

    #[test]
    fn queue_config_new() {
        let cfg = QueueConfig::new("sqlite::memory:");
        assert_eq!(cfg.database_url, "sqlite::memory:");
        assert_eq!(cfg.interpreter, "python3");
    }

    #[test]
    fn queue_config_builders() {
        let cfg = QueueConfig::new("sqlite::memory:")
            .with_lock_file("/tmp/queue.pid")
            .with_interpreter("python")
            .with_extended_seconds(3600)
            .with_poll_interval(Duration::from_secs(1));
        assert_eq!(cfg.lock_file, PathBuf::from("/tmp/queue.pid"));
        assert_eq!(cfg.interpreter, "python");
        assert_eq!(cfg.extended_seconds, 3600);
        assert_eq!(cfg.poll_interval, Duration::from_secs(1));
    }
}
