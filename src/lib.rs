pub mod config;
pub mod error;
pub mod job;
pub mod queue;
pub mod runner;
pub mod shutdown;
pub mod store;

pub use config::QueueConfig;
pub use error::{Error, Result};
pub use job::{Job, JobStatus, NewJob};
pub use queue::JobQueue;
pub use runner::{PassSummary, Runner};
pub use store::{JobStore, LimitBy, OrderBy, SortField};
