use mixburn_common::{Collection, Quality};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use super::PipelineError;
use crate::image::ImageWriter;
use crate::library::MediaLibrary;
use crate::staging::{
    check_budget, CompletionReport, RunBudget, StageState, StagingOrchestrator, TrackWorker,
    DEFAULT_POOL_SIZE,
};

/// What to do when some tracks failed but the pool drained normally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Go on to image creation and report the failures.
    #[default]
    Proceed,
    /// Stop before image creation.
    Abort,
}

impl FailurePolicy {
    /// Decide whether a drained run may continue to image creation.
    pub fn evaluate(&self, report: &CompletionReport) -> Result<(), PipelineError> {
        let failed = report.failures();
        if failed == 0 {
            return Ok(());
        }

        for (key, reason) in report.failed() {
            tracing::warn!(
                collection = %key.collection,
                path = %key.path.display(),
                reason = %reason,
                "Track not staged"
            );
        }

        match self {
            FailurePolicy::Proceed => {
                tracing::warn!(failed, total = report.len(), "Continuing with failed tracks");
                Ok(())
            }
            FailurePolicy::Abort => Err(PipelineError::TrackFailures {
                failed,
                total: report.len(),
            }),
        }
    }
}

/// Image step of a run.
#[derive(Debug, Clone)]
pub struct ImageRequest {
    pub volume_name: String,
    pub output_dir: PathBuf,
}

/// Parameters of one run.
#[derive(Debug, Clone)]
pub struct RunRequest {
    pub playlists: Vec<String>,
    pub quality: Quality,
    pub capacity_bytes: u64,
    pub inflation_factor: f64,
    pub failure_policy: FailurePolicy,
    /// `None` stops after staging.
    pub image: Option<ImageRequest>,
}

/// Result of a successful run.
#[derive(Debug)]
pub struct RunSummary {
    pub collections: Vec<String>,
    pub budget: RunBudget,
    pub staging_root: PathBuf,
    pub report: CompletionReport,
    pub image: Option<PathBuf>,
}

/// Top-level sequencing of a run.
pub struct PipelineDriver {
    library: Arc<dyn MediaLibrary>,
    worker: Arc<dyn TrackWorker>,
    image_writer: Option<Arc<dyn ImageWriter>>,
    staging_root: PathBuf,
    pool_size: usize,
    cancellation: CancellationToken,
    state: Mutex<StageState>,
}

impl PipelineDriver {
    pub fn new(
        library: Arc<dyn MediaLibrary>,
        worker: Arc<dyn TrackWorker>,
        staging_root: impl Into<PathBuf>,
    ) -> Self {
        Self {
            library,
            worker,
            image_writer: None,
            staging_root: staging_root.into(),
            pool_size: DEFAULT_POOL_SIZE,
            cancellation: CancellationToken::new(),
            state: Mutex::new(StageState::Idle),
        }
    }

    pub fn with_pool_size(mut self, pool_size: usize) -> Self {
        self.pool_size = pool_size;
        self
    }

    pub fn with_image_writer(mut self, writer: Arc<dyn ImageWriter>) -> Self {
        self.image_writer = Some(writer);
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    /// Staging state reached by the most recent run. A run rejected before
    /// staging (no playlists, over budget) ends `Aborted` from `Idle`.
    pub fn state(&self) -> StageState {
        *self.state.lock()
    }

    /// Look up requested playlists. Unknown names are logged and skipped;
    /// repeated names (ignoring case) are staged once.
    ///
    /// # Errors
    ///
    /// [`PipelineError::NoPlaylistsFound`] if nothing resolves.
    pub fn resolve_collections(&self, names: &[String]) -> Result<Vec<Collection>, PipelineError> {
        tracing::info!("Gathering information...");

        let mut collections = Vec::new();
        let mut seen = HashSet::new();

        for name in names {
            let Some(canonical) = self.library.find_collection(name)? else {
                tracing::error!(playlist = %name, "Playlist not found");
                continue;
            };

            if !seen.insert(canonical.clone()) {
                tracing::warn!(playlist = %name, "Playlist requested more than once");
                continue;
            }

            match self.library.tracks(&canonical)? {
                Some(tracks) => collections.push(Collection::new(canonical, tracks)),
                None => tracing::error!(playlist = %name, "Playlist not found"),
            }
        }

        if collections.is_empty() {
            return Err(PipelineError::NoPlaylistsFound);
        }
        Ok(collections)
    }

    /// Run the whole pipeline.
    ///
    /// Fatal errors return before image creation, so a failed run never
    /// produces an image.
    pub async fn run(&self, request: &RunRequest) -> Result<RunSummary, PipelineError> {
        *self.state.lock() = StageState::Idle;

        let collections = match self.resolve_collections(&request.playlists) {
            Ok(collections) => collections,
            Err(e) => {
                *self.state.lock() = StageState::Aborted;
                return Err(e);
            }
        };

        let budget = match check_budget(
            &collections,
            request.capacity_bytes,
            request.inflation_factor,
        ) {
            Ok(budget) => budget,
            Err(e) => {
                tracing::error!(error = %e, "Selected tracks will not fit onto a single disc");
                *self.state.lock() = StageState::Aborted;
                return Err(e.into());
            }
        };

        let mut orchestrator = StagingOrchestrator::new(&self.staging_root, Arc::clone(&self.worker))
            .with_pool_size(self.pool_size)
            .with_cancellation(self.cancellation.clone());
        let staged = orchestrator.stage(&collections, request.quality).await;
        *self.state.lock() = orchestrator.state();
        let report = staged?;
        request.failure_policy.evaluate(&report)?;

        let image = match (&request.image, &self.image_writer) {
            (Some(image), Some(writer)) => Some(
                writer
                    .create_image(&self.staging_root, &image.volume_name, &image.output_dir)
                    .await?,
            ),
            (Some(_), None) => {
                tracing::warn!("No image writer configured; stopping after staging");
                None
            }
            (None, _) => None,
        };

        Ok(RunSummary {
            collections: collections.into_iter().map(|c| c.name).collect(),
            budget,
            staging_root: self.staging_root.clone(),
            report,
            image,
        })
    }
}
