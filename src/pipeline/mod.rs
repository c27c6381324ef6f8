//! Run sequencing: resolve → budget → stage → policy → image.

mod driver;

pub use driver::{FailurePolicy, ImageRequest, PipelineDriver, RunRequest, RunSummary};

use crate::staging::{BudgetExceeded, StageError};

/// Errors that abort a run. None of them produce an image.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("no playlists found")]
    NoPlaylistsFound,

    #[error(transparent)]
    Budget(#[from] BudgetExceeded),

    #[error(transparent)]
    Stage(#[from] StageError),

    #[error("{failed} of {total} tracks failed to stage")]
    TrackFailures { failed: usize, total: usize },

    #[error("library error: {0}")]
    Library(#[from] mixburn_common::Error),

    #[error("image creation failed: {0}")]
    Image(#[from] mixburn_av::Error),
}
