use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("there are no jobs in the queue")]
    QueueEmpty,

    #[error("queue is locked: {path} (held {age_seconds}s)")]
    QueueLocked { path: PathBuf, age_seconds: u64 },

    #[error("queue is locked past the extended threshold: {path} (held {age_seconds}s)")]
    QueueLockedExtended { path: PathBuf, age_seconds: u64 },

    #[error("command could not be tokenized: {0:?}")]
    BadCommand(String),

    #[error("store error: {0}")]
    Store(#[from] sqlx::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
