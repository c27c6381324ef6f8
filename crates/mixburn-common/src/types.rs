//! Core types shared by the library, the staging pipeline, and the CLI.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// A single track as reported by the media library.
///
/// Descriptors are immutable once read. Within a run a track is identified by
/// its collection name together with [`TrackDescriptor::path`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackDescriptor {
    pub title: String,
    pub artist: String,
    pub track_number: u32,
    /// Absolute path of the source file.
    pub path: PathBuf,
    /// Format kind string as reported by the library, e.g. "AAC audio file".
    pub kind: String,
    /// Declared size in bytes.
    pub size_bytes: u64,
}

impl TrackDescriptor {
    pub fn new(
        title: impl Into<String>,
        artist: impl Into<String>,
        track_number: u32,
        path: impl Into<PathBuf>,
        kind: impl Into<String>,
        size_bytes: u64,
    ) -> Self {
        Self {
            title: title.into(),
            artist: artist.into(),
            track_number,
            path: path.into(),
            kind: kind.into(),
            size_bytes,
        }
    }
}

/// A named, ordered group of tracks (a playlist).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Collection {
    pub name: String,
    pub tracks: Vec<TrackDescriptor>,
}

impl Collection {
    pub fn new(name: impl Into<String>, tracks: Vec<TrackDescriptor>) -> Self {
        Self {
            name: name.into(),
            tracks,
        }
    }

    /// Sum of the declared sizes of every track.
    pub fn declared_bytes(&self) -> u64 {
        self.tracks
            .iter()
            .fold(0u64, |acc, t| acc.saturating_add(t.size_bytes))
    }
}

/// What the pipeline does with a track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackAction {
    /// Decode and re-encode into the delivery format.
    Transcode,
    /// Already in the delivery format; copied byte for byte.
    CopyVerbatim,
    /// Not handled; skipped with a warning.
    Unsupported,
}

impl fmt::Display for TrackAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrackAction::Transcode => write!(f, "transcode"),
            TrackAction::CopyVerbatim => write!(f, "copy"),
            TrackAction::Unsupported => write!(f, "unsupported"),
        }
    }
}

/// Output quality of transcoded tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Quality {
    Low,
    #[default]
    Med,
    High,
}

impl Quality {
    /// Constant bitrate handed to the encoder.
    pub fn bitrate_kbps(&self) -> u32 {
        match self {
            Quality::Low => 64,
            Quality::Med => 128,
            Quality::High => 192,
        }
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Quality::Low => write!(f, "low"),
            Quality::Med => write!(f, "med"),
            Quality::High => write!(f, "high"),
        }
    }
}
