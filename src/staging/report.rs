//! Per-track outcomes of a staging run.

use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Identity of a track within a run.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct TrackKey {
    pub collection: String,
    pub path: PathBuf,
}

impl TrackKey {
    pub fn new(collection: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            collection: collection.into(),
            path: path.into(),
        }
    }
}

/// Why a single track was not staged. None of these stop other tracks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
pub enum FailureReason {
    /// The source file vanished between listing and dispatch.
    #[error("source file missing: {}", .0.display())]
    SourceMissing(PathBuf),

    /// The decoder or encoder failed to start or exited non-zero.
    #[error("{tool} failed: {message}")]
    TranscodeProcessFailed { tool: String, message: String },

    /// The decoder was killed writing into a closed pipe.
    #[error("broken pipe: {0}")]
    BrokenPipe(String),

    /// Reading the source or writing the copy failed.
    #[error("copy failed: {0}")]
    CopyFailed(String),

    /// The staged output could not be created or moved into place.
    #[error("could not write output: {0}")]
    OutputFailed(String),
}

/// Result of processing one track.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum TrackOutcome {
    Success { destination: PathBuf },
    Failure(FailureReason),
}

impl TrackOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, TrackOutcome::Success { .. })
    }
}

/// Outcomes keyed by track, one entry per dispatched item.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CompletionReport {
    outcomes: BTreeMap<TrackKey, TrackOutcome>,
}

impl CompletionReport {
    /// Record an outcome. Entries are write-once: returns `false` and keeps
    /// the existing entry if `key` was already recorded.
    pub fn record(&mut self, key: TrackKey, outcome: TrackOutcome) -> bool {
        use std::collections::btree_map::Entry;

        match self.outcomes.entry(key) {
            Entry::Vacant(slot) => {
                slot.insert(outcome);
                true
            }
            Entry::Occupied(slot) => {
                tracing::warn!(
                    collection = %slot.key().collection,
                    path = %slot.key().path.display(),
                    "Ignoring second outcome for track"
                );
                false
            }
        }
    }

    pub fn get(&self, key: &TrackKey) -> Option<&TrackOutcome> {
        self.outcomes.get(key)
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    pub fn successes(&self) -> usize {
        self.outcomes.values().filter(|o| o.is_success()).count()
    }

    pub fn failures(&self) -> usize {
        self.len() - self.successes()
    }

    /// Failed tracks in key order.
    pub fn failed(&self) -> impl Iterator<Item = (&TrackKey, &FailureReason)> {
        self.outcomes.iter().filter_map(|(k, o)| match o {
            TrackOutcome::Failure(reason) => Some((k, reason)),
            TrackOutcome::Success { .. } => None,
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = (&TrackKey, &TrackOutcome)> {
        self.outcomes.iter()
    }
}
