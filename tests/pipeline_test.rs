//! Pipeline integration tests
//!
//! Whole runs through the driver: playlist lookup, budget, staging, failure
//! policy and the image step.

mod common;

use std::sync::Arc;

use assert_matches::assert_matches;
use async_trait::async_trait;
use common::{names, Fixture, RecordingImageWriter, MP3};
use mixburn::pipeline::{FailurePolicy, ImageRequest, PipelineDriver, PipelineError, RunRequest};
use mixburn::staging::{
    FailureReason, FatalWorkerError, StageError, StageState, TrackOutcome, TrackWorker, WorkItem,
};
use mixburn_common::{Collection, Quality};

/// Writes the destination file, or fails the item whose title is `fail`.
struct StubWorker {
    fail: Option<&'static str>,
    fatal: bool,
}

impl StubWorker {
    fn ok() -> Self {
        Self { fail: None, fatal: false }
    }

    fn failing(title: &'static str) -> Self {
        Self { fail: Some(title), fatal: false }
    }

    fn fatal(title: &'static str) -> Self {
        Self { fail: Some(title), fatal: true }
    }
}

#[async_trait]
impl TrackWorker for StubWorker {
    async fn process(&self, item: &WorkItem) -> Result<TrackOutcome, FatalWorkerError> {
        if self.fail == Some(item.track.title.as_str()) {
            if self.fatal {
                return Err(FatalWorkerError("staging volume unmounted".into()));
            }
            return Ok(TrackOutcome::Failure(FailureReason::TranscodeProcessFailed {
                tool: "faad".into(),
                message: "exit status: 1".into(),
            }));
        }

        let destination = item.destination();
        std::fs::write(&destination, b"mp3").map_err(|e| FatalWorkerError(e.to_string()))?;
        Ok(TrackOutcome::Success { destination })
    }
}

fn request(fixture: &Fixture, playlists: &[&str]) -> RunRequest {
    RunRequest {
        playlists: names(playlists),
        quality: Quality::Med,
        capacity_bytes: 734_000_000,
        inflation_factor: 1.5,
        failure_policy: FailurePolicy::Proceed,
        image: Some(ImageRequest {
            volume_name: "Music-20260101".into(),
            output_dir: fixture.dir.path().to_path_buf(),
        }),
    }
}

fn two_playlists(fixture: &Fixture) -> Vec<Collection> {
    vec![
        Collection::new(
            "Road Trip",
            vec![
                fixture.track("Alpha", "One", 1, MP3),
                fixture.track("Alpha", "Two", 2, MP3),
            ],
        ),
        Collection::new("Chill", vec![fixture.track("Beta", "Three", 1, MP3)]),
    ]
}

fn driver(
    fixture: &Fixture,
    collections: Vec<Collection>,
    worker: StubWorker,
    writer: &Arc<RecordingImageWriter>,
) -> PipelineDriver {
    PipelineDriver::new(
        common::library(collections),
        Arc::new(worker),
        fixture.staging_root(),
    )
    .with_pool_size(2)
    .with_image_writer(writer.clone())
}

#[tokio::test]
async fn test_clean_run_builds_image() {
    let fixture = Fixture::new();
    let writer = Arc::new(RecordingImageWriter::default());
    let driver = driver(&fixture, two_playlists(&fixture), StubWorker::ok(), &writer);

    let summary = driver
        .run(&request(&fixture, &["Road Trip", "Chill"]))
        .await
        .unwrap();

    assert_eq!(summary.collections, vec!["Road Trip", "Chill"]);
    assert_eq!(summary.report.successes(), 3);
    assert_eq!(summary.image, Some(fixture.dir.path().join("Music-20260101.iso")));
    assert_eq!(driver.state(), StageState::Complete);

    let created = writer.created.lock();
    assert_eq!(created.len(), 1);
    assert_eq!(created[0].0, fixture.staging_root());
    assert_eq!(created[0].1, "Music-20260101");
}

#[tokio::test]
async fn test_unknown_playlist_is_skipped() {
    let fixture = Fixture::new();
    let writer = Arc::new(RecordingImageWriter::default());
    let driver = driver(&fixture, two_playlists(&fixture), StubWorker::ok(), &writer);

    let summary = driver
        .run(&request(&fixture, &["Nope", "chill"]))
        .await
        .unwrap();

    assert_eq!(summary.collections, vec!["Chill"]);
    assert_eq!(fixture.staged_files(), vec![std::path::PathBuf::from("Chill/Beta - Three - 1.mp3")]);
    assert!(!fixture.staging_root().join("Road Trip").exists());
}

#[tokio::test]
async fn test_no_known_playlists_creates_nothing() {
    let fixture = Fixture::new();
    let writer = Arc::new(RecordingImageWriter::default());
    let driver = driver(&fixture, two_playlists(&fixture), StubWorker::ok(), &writer);

    let err = driver
        .run(&request(&fixture, &["Nope", "Also Nope"]))
        .await
        .unwrap_err();

    assert_matches!(err, PipelineError::NoPlaylistsFound);
    assert_eq!(std::fs::read_dir(fixture.staging_root()).unwrap().count(), 0);
    assert_eq!(writer.create_calls(), 0);
}

#[tokio::test]
async fn test_over_budget_creates_nothing() {
    let fixture = Fixture::new();
    let writer = Arc::new(RecordingImageWriter::default());
    let driver = driver(&fixture, two_playlists(&fixture), StubWorker::ok(), &writer);

    // 34 bytes raw, 51 estimated.
    let mut req = request(&fixture, &["Road Trip", "Chill"]);
    req.capacity_bytes = 50;

    let err = driver.run(&req).await.unwrap_err();
    assert_matches!(err, PipelineError::Budget(_));
    assert_eq!(driver.state(), StageState::Aborted);
    assert_eq!(std::fs::read_dir(fixture.staging_root()).unwrap().count(), 0);
    assert_eq!(writer.create_calls(), 0);
}

#[tokio::test]
async fn test_track_failure_proceeds_by_default() {
    let fixture = Fixture::new();
    let writer = Arc::new(RecordingImageWriter::default());
    let driver = driver(&fixture, two_playlists(&fixture), StubWorker::failing("Two"), &writer);

    let summary = driver
        .run(&request(&fixture, &["Road Trip", "Chill"]))
        .await
        .unwrap();

    assert_eq!(summary.report.successes(), 2);
    assert_eq!(summary.report.failures(), 1);
    assert_eq!(writer.create_calls(), 1);
}

#[tokio::test]
async fn test_abort_policy_blocks_image() {
    let fixture = Fixture::new();
    let writer = Arc::new(RecordingImageWriter::default());
    let driver = driver(&fixture, two_playlists(&fixture), StubWorker::failing("Two"), &writer);

    let mut req = request(&fixture, &["Road Trip", "Chill"]);
    req.failure_policy = FailurePolicy::Abort;

    let err = driver.run(&req).await.unwrap_err();
    assert_matches!(err, PipelineError::TrackFailures { failed: 1, total: 3 });
    assert_eq!(writer.create_calls(), 0);
}

#[tokio::test]
async fn test_fatal_failure_never_builds_image() {
    let fixture = Fixture::new();
    let writer = Arc::new(RecordingImageWriter::default());
    let driver = driver(&fixture, two_playlists(&fixture), StubWorker::fatal("One"), &writer);

    let err = driver
        .run(&request(&fixture, &["Road Trip", "Chill"]))
        .await
        .unwrap_err();

    assert_matches!(err, PipelineError::Stage(StageError::PoolTerminated(_)));
    assert_eq!(driver.state(), StageState::Aborted);
    assert_eq!(writer.create_calls(), 0);
}

#[tokio::test]
async fn test_cancelled_run_never_builds_image() {
    let fixture = Fixture::new();
    let writer = Arc::new(RecordingImageWriter::default());
    let cancel = tokio_util::sync::CancellationToken::new();
    let driver = driver(&fixture, two_playlists(&fixture), StubWorker::ok(), &writer)
        .with_cancellation(cancel.clone());

    cancel.cancel();
    let err = driver
        .run(&request(&fixture, &["Road Trip", "Chill"]))
        .await
        .unwrap_err();

    assert_matches!(err, PipelineError::Stage(StageError::PoolTerminated(ref r)) if r == "cancelled");
    assert_eq!(writer.create_calls(), 0);
}

#[tokio::test]
async fn test_no_image_request_stops_after_staging() {
    let fixture = Fixture::new();
    let writer = Arc::new(RecordingImageWriter::default());
    let driver = driver(&fixture, two_playlists(&fixture), StubWorker::ok(), &writer);

    let mut req = request(&fixture, &["Road Trip"]);
    req.image = None;

    let summary = driver.run(&req).await.unwrap();
    assert!(summary.image.is_none());
    assert_eq!(summary.report.successes(), 2);
    assert_eq!(writer.create_calls(), 0);
}
