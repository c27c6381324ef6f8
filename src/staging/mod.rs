//! Parallel transcode-and-stage pipeline.
//!
//! - [`classifier`]: format kind → action
//! - [`budget`]: disc size check before any work
//! - [`worker`]: one track, transcode pipe or copy
//! - [`orchestrator`]: directories, work list, bounded pool, drain
//! - [`report`]: per-track outcomes

pub mod budget;
pub mod classifier;
pub mod orchestrator;
pub mod report;
pub mod worker;

pub use budget::{check_budget, BudgetExceeded, RunBudget};
pub use classifier::classify;
pub use orchestrator::{StageState, StagingOrchestrator, DEFAULT_POOL_SIZE};
pub use report::{CompletionReport, FailureReason, TrackKey, TrackOutcome};
pub use worker::{ConversionWorker, FatalWorkerError, TrackWorker, WorkItem};

use std::path::PathBuf;

/// Errors that end a staging pass.
#[derive(Debug, thiserror::Error)]
pub enum StageError {
    /// A collection directory could not be created; nothing was dispatched.
    #[error("failed to create staging directory {}: {source}", path.display())]
    StagingAborted {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The pool was torn down with work still in flight.
    #[error("run terminated mid-pool: {0}")]
    PoolTerminated(String),
}
