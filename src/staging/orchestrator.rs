//! Staging orchestrator.
//!
//! Creates one directory per collection, turns tracks into work items, and
//! runs them on a bounded pool until every item has reported back.
//!
//! ## Run states
//!
//! `Idle → DirectoriesCreated → Dispatching → Draining → Complete`
//!
//! `Aborted` is terminal and is entered on a directory creation failure or
//! pool termination. A run rejected before staging (no playlists, over
//! budget) never builds an orchestrator; the pipeline driver records that
//! run as `Aborted` from `Idle`.

use mixburn_common::paths::sanitize_component;
use mixburn_common::{Collection, Quality, TrackAction};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::{JoinError, JoinSet};
use tokio_util::sync::CancellationToken;

use super::classifier::classify;
use super::report::CompletionReport;
use super::worker::{FatalWorkerError, TrackWorker, WorkItem};
use super::StageError;

/// Default number of tracks processed at once.
pub const DEFAULT_POOL_SIZE: usize = 5;

/// Where a staging run is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageState {
    Idle,
    DirectoriesCreated,
    Dispatching,
    Draining,
    Complete,
    Aborted,
}

/// Runs one staging pass into `staging_root`.
pub struct StagingOrchestrator {
    staging_root: PathBuf,
    pool_size: usize,
    worker: Arc<dyn TrackWorker>,
    cancellation: CancellationToken,
    state: StageState,
}

impl StagingOrchestrator {
    pub fn new(staging_root: impl Into<PathBuf>, worker: Arc<dyn TrackWorker>) -> Self {
        Self {
            staging_root: staging_root.into(),
            pool_size: DEFAULT_POOL_SIZE,
            worker,
            cancellation: CancellationToken::new(),
            state: StageState::Idle,
        }
    }

    /// Set the pool size. Zero is treated as one.
    pub fn with_pool_size(mut self, pool_size: usize) -> Self {
        self.pool_size = pool_size.max(1);
        self
    }

    /// Terminate the pool when `token` is cancelled.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    pub fn state(&self) -> StageState {
        self.state
    }

    /// Directory each collection is staged into, in collection order.
    ///
    /// Names that sanitize to the same component (ignoring case, for
    /// case-insensitive filesystems) get a ` (2)`, ` (3)`, ... suffix.
    pub fn collection_dirs(&self, collections: &[Collection]) -> Vec<PathBuf> {
        let mut taken = HashSet::new();

        collections
            .iter()
            .map(|collection| {
                let base = sanitize_component(&collection.name);
                let mut name = base.clone();
                let mut n = 1;
                while !taken.insert(name.to_lowercase()) {
                    n += 1;
                    name = format!("{base} ({n})");
                }
                if n > 1 {
                    tracing::warn!(
                        collection = %collection.name,
                        dir = %name,
                        "Collection name clashes with another; using a suffixed directory"
                    );
                }
                self.staging_root.join(name)
            })
            .collect()
    }

    /// Stage every supported track of `collections`.
    ///
    /// Waits for all items; individual track failures are recorded in the
    /// report and never stop the others.
    ///
    /// # Errors
    ///
    /// - [`StageError::StagingAborted`] if a collection directory cannot be
    ///   created (no work is dispatched)
    /// - [`StageError::PoolTerminated`] if a worker fails fatally or panics,
    ///   or the run is cancelled; in-flight work is abandoned
    pub async fn stage(
        &mut self,
        collections: &[Collection],
        quality: Quality,
    ) -> Result<CompletionReport, StageError> {
        let dirs = self.collection_dirs(collections);
        if let Err(e) = create_directories(collections, &dirs) {
            self.state = StageState::Aborted;
            return Err(e);
        }
        self.state = StageState::DirectoriesCreated;

        let items = plan_items(collections, &dirs, quality);
        self.dispatch(items).await
    }

    /// Build work items in collection order, dropping unsupported tracks and
    /// any track whose destination is already claimed.
    pub fn plan(&self, collections: &[Collection], quality: Quality) -> Vec<WorkItem> {
        plan_items(collections, &self.collection_dirs(collections), quality)
    }

    async fn dispatch(&mut self, items: Vec<WorkItem>) -> Result<CompletionReport, StageError> {
        self.state = StageState::Dispatching;
        tracing::info!(
            items = items.len(),
            pool_size = self.pool_size,
            "Dispatching tracks"
        );

        let cancel = self.cancellation.clone();
        let semaphore = Arc::new(Semaphore::new(self.pool_size));
        let report = Arc::new(Mutex::new(CompletionReport::default()));
        let mut tasks: JoinSet<Result<(), FatalWorkerError>> = JoinSet::new();

        for item in items {
            // Wait for a free slot, reaping finished workers meanwhile so a
            // fatal error is noticed before more work is submitted.
            let permit = loop {
                tokio::select! {
                    biased;

                    _ = cancel.cancelled() => {
                        return Err(self.terminate(&mut tasks, "cancelled".to_string()).await);
                    }
                    Some(joined) = tasks.join_next() => {
                        if let Err(reason) = check_joined(joined) {
                            return Err(self.terminate(&mut tasks, reason).await);
                        }
                    }
                    permit = semaphore.clone().acquire_owned() => {
                        match permit {
                            Ok(permit) => break permit,
                            Err(_) => {
                                return Err(self.terminate(&mut tasks, "worker pool closed".to_string()).await);
                            }
                        }
                    }
                }
            };

            let worker = Arc::clone(&self.worker);
            let report = Arc::clone(&report);
            tasks.spawn(async move {
                let _permit = permit;
                let outcome = worker.process(&item).await?;
                report.lock().record(item.key(), outcome);
                Ok(())
            });
        }

        self.state = StageState::Draining;
        tracing::info!("Processing pool, please wait...");

        loop {
            tokio::select! {
                biased;

                _ = cancel.cancelled() => {
                    return Err(self.terminate(&mut tasks, "cancelled".to_string()).await);
                }
                joined = tasks.join_next() => match joined {
                    Some(joined) => {
                        if let Err(reason) = check_joined(joined) {
                            return Err(self.terminate(&mut tasks, reason).await);
                        }
                    }
                    None => break,
                },
            }
        }

        self.state = StageState::Complete;
        let report = std::mem::take(&mut *report.lock());
        tracing::info!(
            staged = report.successes(),
            failed = report.failures(),
            "Staging complete"
        );
        Ok(report)
    }

    /// Abort every in-flight worker and wait for them to be dropped, which
    /// kills their child processes and removes their temp files.
    async fn terminate(
        &mut self,
        tasks: &mut JoinSet<Result<(), FatalWorkerError>>,
        reason: String,
    ) -> StageError {
        tracing::error!(reason = %reason, in_flight = tasks.len(), "Terminating worker pool");
        tasks.abort_all();
        while tasks.join_next().await.is_some() {}
        self.state = StageState::Aborted;
        StageError::PoolTerminated(reason)
    }
}

fn plan_items(collections: &[Collection], dirs: &[PathBuf], quality: Quality) -> Vec<WorkItem> {
    let mut items = Vec::new();
    let mut claimed = HashSet::new();

    for (collection, destination_dir) in collections.iter().zip(dirs) {
        for track in &collection.tracks {
            let action = classify(&track.kind);
            if action == TrackAction::Unsupported {
                tracing::warn!(
                    collection = %collection.name,
                    kind = %track.kind,
                    path = %track.path.display(),
                    "Skipping track with unsupported format"
                );
                continue;
            }

            let item = WorkItem {
                collection: collection.name.clone(),
                track: track.clone(),
                action,
                destination_dir: destination_dir.clone(),
                quality,
            };

            if !claimed.insert(item.destination()) {
                tracing::warn!(
                    collection = %collection.name,
                    destination = %item.destination().display(),
                    "Skipping track with duplicate destination"
                );
                continue;
            }

            items.push(item);
        }
    }

    items
}

fn create_directories(collections: &[Collection], dirs: &[PathBuf]) -> Result<(), StageError> {
    for (collection, dir) in collections.iter().zip(dirs) {
        tracing::info!(
            collection = %collection.name,
            dir = %dir.display(),
            tracks = collection.tracks.len(),
            "Creating staging directory"
        );
        std::fs::create_dir(dir).map_err(|source| StageError::StagingAborted {
            path: dir.clone(),
            source,
        })?;
    }
    Ok(())
}

fn check_joined(joined: Result<Result<(), FatalWorkerError>, JoinError>) -> Result<(), String> {
    match joined {
        Ok(Ok(())) => Ok(()),
        Ok(Err(fatal)) => Err(fatal.to_string()),
        Err(e) if e.is_panic() => Err("worker panicked".to_string()),
        Err(e) => Err(format!("worker task failed: {e}")),
    }
}
