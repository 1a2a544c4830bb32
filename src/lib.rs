pub mod app;
pub mod config;
pub mod dispatch;
pub mod job;
pub mod links;
pub mod preflight;
pub mod scheduler;

// Re-export commonly used types for easier access in tests
pub use config::{ArchiveMode, ConfigError, ListMode, RunConfig, Settings};
pub use dispatch::{Cycle, CycleReport, Dispatcher};
pub use job::{DownloadJob, JobError, JobOutcome, JobRunner, ProgressMode};
pub use links::{Link, LinkList, LoadError};
pub use preflight::PreflightError;
pub use scheduler::Scheduler;
