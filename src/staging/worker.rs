//! Conversion worker: stages one track.

use async_trait::async_trait;
use mixburn_av::{StagedFile, TranscodeTools};
use mixburn_common::paths::track_file_name;
use mixburn_common::{Quality, TrackAction, TrackDescriptor};
use std::path::PathBuf;

use super::report::{FailureReason, TrackKey, TrackOutcome};

/// One unit of work for the pool.
#[derive(Debug, Clone)]
pub struct WorkItem {
    pub collection: String,
    pub track: TrackDescriptor,
    pub action: TrackAction,
    pub destination_dir: PathBuf,
    pub quality: Quality,
}

impl WorkItem {
    pub fn key(&self) -> TrackKey {
        TrackKey::new(&self.collection, &self.track.path)
    }

    /// Final path of the staged file.
    pub fn destination(&self) -> PathBuf {
        self.destination_dir.join(track_file_name(&self.track))
    }
}

/// A worker hit a condition that invalidates the whole run.
///
/// Returning this from [`TrackWorker::process`] terminates the pool.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{0}")]
pub struct FatalWorkerError(pub String);

/// Processes work items. Implementations must be safe to call concurrently.
#[async_trait]
pub trait TrackWorker: Send + Sync {
    /// Stage one item. Per-track problems are reported as
    /// [`TrackOutcome::Failure`]; `Err` aborts the run.
    async fn process(&self, item: &WorkItem) -> Result<TrackOutcome, FatalWorkerError>;
}

/// Worker that transcodes through the external decoder and encoder, or copies.
pub struct ConversionWorker {
    tools: TranscodeTools,
}

impl ConversionWorker {
    pub fn new(tools: TranscodeTools) -> Self {
        Self { tools }
    }

    async fn stage(&self, item: &WorkItem, staged: &StagedFile) -> Result<(), FailureReason> {
        match item.action {
            TrackAction::Transcode => mixburn_av::transcode(
                &self.tools,
                &item.track.path,
                staged.path(),
                item.quality.bitrate_kbps(),
            )
            .await
            .map_err(transcode_failure),
            TrackAction::CopyVerbatim => mixburn_av::copy_verbatim(&item.track.path, staged)
                .await
                .map(|_| ())
                .map_err(|e| FailureReason::CopyFailed(e.to_string())),
            TrackAction::Unsupported => unreachable!("unsupported tracks are filtered before dispatch"),
        }
    }
}

#[async_trait]
impl TrackWorker for ConversionWorker {
    async fn process(&self, item: &WorkItem) -> Result<TrackOutcome, FatalWorkerError> {
        if item.action == TrackAction::Unsupported {
            return Err(FatalWorkerError(format!(
                "unsupported track dispatched: {}",
                item.track.path.display()
            )));
        }

        if !item.destination_dir.is_dir() {
            return Err(FatalWorkerError(format!(
                "staging directory disappeared: {}",
                item.destination_dir.display()
            )));
        }

        // The library listing may be stale by now.
        if !item.track.path.is_file() {
            tracing::warn!(path = %item.track.path.display(), "Source file does not exist");
            return Ok(TrackOutcome::Failure(FailureReason::SourceMissing(
                item.track.path.clone(),
            )));
        }

        tracing::info!(
            collection = %item.collection,
            action = %item.action,
            "Processing: {} - {} - {}",
            item.track.artist,
            item.track.title,
            item.track.track_number
        );

        let staged = match StagedFile::new(item.destination()) {
            Ok(staged) => staged,
            Err(e) => return Ok(TrackOutcome::Failure(FailureReason::OutputFailed(e.to_string()))),
        };

        if let Err(reason) = self.stage(item, &staged).await {
            tracing::warn!(
                collection = %item.collection,
                path = %item.track.path.display(),
                error = %reason,
                "Track failed"
            );
            return Ok(TrackOutcome::Failure(reason));
        }

        match staged.commit() {
            Ok(destination) => {
                tracing::info!(destination = %destination.display(), "Staged track");
                Ok(TrackOutcome::Success { destination })
            }
            Err(e) => Ok(TrackOutcome::Failure(FailureReason::OutputFailed(e.to_string()))),
        }
    }
}

fn transcode_failure(err: mixburn_av::Error) -> FailureReason {
    use mixburn_av::Error;

    match err {
        Error::FileNotFound { path } => FailureReason::SourceMissing(path),
        Error::BrokenPipe { tool, message } => {
            FailureReason::BrokenPipe(format!("{tool}: {message}"))
        }
        Error::ToolFailed { tool, message } => {
            FailureReason::TranscodeProcessFailed { tool, message }
        }
        Error::Spawn { tool, source } => FailureReason::TranscodeProcessFailed {
            tool,
            message: source.to_string(),
        },
        other => FailureReason::TranscodeProcessFailed {
            tool: "transcode".to_string(),
            message: other.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use tempfile::tempdir;

    fn item(dir: &Path, source: &Path, action: TrackAction) -> WorkItem {
        WorkItem {
            collection: "Mix".into(),
            track: TrackDescriptor::new("Song", "Band", 4, source, "MPEG audio file", 3),
            action,
            destination_dir: dir.to_path_buf(),
            quality: Quality::Med,
        }
    }

    fn worker() -> ConversionWorker {
        ConversionWorker::new(TranscodeTools::new("faad", "lame"))
    }

    #[test]
    fn test_destination_name() {
        let it = item(Path::new("/stage/Mix"), Path::new("/music/song.mp3"), TrackAction::CopyVerbatim);
        assert_eq!(it.destination(), PathBuf::from("/stage/Mix/Band - Song - 4.mp3"));
        assert_eq!(it.destination(), it.clone().destination());
        assert_eq!(it.key(), TrackKey::new("Mix", "/music/song.mp3"));
    }

    #[tokio::test]
    async fn test_copy_verbatim() {
        let src_dir = tempdir().unwrap();
        let out_dir = tempdir().unwrap();
        let source = src_dir.path().join("song.mp3");
        std::fs::write(&source, b"mp3").unwrap();

        let it = item(out_dir.path(), &source, TrackAction::CopyVerbatim);
        let outcome = worker().process(&it).await.unwrap();

        assert_eq!(
            outcome,
            TrackOutcome::Success {
                destination: it.destination()
            }
        );
        assert_eq!(std::fs::read(it.destination()).unwrap(), b"mp3");
        assert_eq!(std::fs::read_dir(out_dir.path()).unwrap().count(), 1);
    }

    #[tokio::test]
    async fn test_missing_source() {
        let out_dir = tempdir().unwrap();
        let source = out_dir.path().join("gone.mp3");

        let it = item(out_dir.path(), &source, TrackAction::CopyVerbatim);
        let outcome = worker().process(&it).await.unwrap();

        assert_eq!(outcome, TrackOutcome::Failure(FailureReason::SourceMissing(source)));
        assert!(!it.destination().exists());
    }

    #[tokio::test]
    async fn test_missing_destination_dir_is_fatal() {
        let src_dir = tempdir().unwrap();
        let source = src_dir.path().join("song.mp3");
        std::fs::write(&source, b"mp3").unwrap();

        let it = item(&src_dir.path().join("missing"), &source, TrackAction::CopyVerbatim);
        assert!(worker().process(&it).await.is_err());
    }

    #[tokio::test]
    async fn test_unsupported_is_fatal() {
        let dir = tempdir().unwrap();
        let it = item(dir.path(), Path::new("/music/x.wav"), TrackAction::Unsupported);
        assert!(worker().process(&it).await.is_err());
    }

    #[test]
    fn test_transcode_failure_mapping() {
        let reason = transcode_failure(mixburn_av::Error::tool_failed("lame", "exit status: 2"));
        assert_eq!(
            reason,
            FailureReason::TranscodeProcessFailed {
                tool: "lame".into(),
                message: "exit status: 2".into()
            }
        );

        let reason = transcode_failure(mixburn_av::Error::broken_pipe("faad", "lame exit status: 1"));
        assert!(matches!(reason, FailureReason::BrokenPipe(ref m) if m.starts_with("faad")));

        let reason = transcode_failure(mixburn_av::Error::file_not_found("/x.m4a"));
        assert_eq!(reason, FailureReason::SourceMissing(PathBuf::from("/x.m4a")));
    }
}
