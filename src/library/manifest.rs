//! JSON library manifest.
//!
//! ```json
//! {
//!   "playlists": [
//!     {
//!       "name": "Road Trip",
//!       "tracks": [
//!         {
//!           "title": "Song",
//!           "artist": "Band",
//!           "track_number": 1,
//!           "path": "/music/Band/Song.m4a",
//!           "kind": "AAC audio file",
//!           "size": 4200000
//!         }
//!       ]
//!     }
//!   ]
//! }
//! ```
//!
//! `size` may be omitted; it is then read from the file (0 if unreadable).

use mixburn_common::{Collection, Error, Result, TrackDescriptor};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use super::MediaLibrary;

#[derive(Debug, Deserialize)]
struct ManifestFile {
    #[serde(default)]
    playlists: Vec<ManifestPlaylist>,
}

#[derive(Debug, Deserialize)]
struct ManifestPlaylist {
    name: String,
    #[serde(default)]
    tracks: Vec<ManifestTrack>,
}

#[derive(Debug, Deserialize)]
struct ManifestTrack {
    title: String,
    #[serde(default)]
    artist: String,
    track_number: u32,
    path: PathBuf,
    kind: String,
    #[serde(default)]
    size: Option<u64>,
}

/// Library backed by an in-memory list of collections.
#[derive(Debug, Clone, Default)]
pub struct ManifestLibrary {
    collections: Vec<Collection>,
}

impl ManifestLibrary {
    /// Build a library from collections already in memory.
    pub fn from_collections(collections: Vec<Collection>) -> Self {
        Self { collections }
    }

    /// Load a manifest file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| Error::LibraryRead {
            path: path.to_path_buf(),
            source,
        })?;
        let library = Self::parse(&content, path)?;

        tracing::info!(
            path = %path.display(),
            playlists = library.collections.len(),
            "Loaded library manifest"
        );
        Ok(library)
    }

    /// Parse manifest JSON. Relative track paths resolve against the
    /// manifest's directory.
    pub fn parse(content: &str, manifest_path: &Path) -> Result<Self> {
        let file: ManifestFile =
            serde_json::from_str(content).map_err(|source| Error::LibraryParse {
                path: manifest_path.to_path_buf(),
                source,
            })?;
        let base = manifest_path.parent().unwrap_or_else(|| Path::new(""));

        let collections = file
            .playlists
            .into_iter()
            .map(|playlist| {
                let tracks = playlist
                    .tracks
                    .into_iter()
                    .map(|t| into_descriptor(t, base))
                    .collect::<Result<Vec<_>>>()?;
                Ok(Collection::new(playlist.name, tracks))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { collections })
    }
}

fn into_descriptor(track: ManifestTrack, base: &Path) -> Result<TrackDescriptor> {
    if track.track_number == 0 {
        return Err(Error::invalid_track(format!(
            "track number must be at least 1: {}",
            track.path.display()
        )));
    }

    let path = if track.path.is_absolute() {
        track.path
    } else {
        base.join(track.path)
    };

    let size_bytes = match track.size {
        Some(size) => size,
        None => std::fs::metadata(&path).map(|m| m.len()).unwrap_or(0),
    };

    Ok(TrackDescriptor {
        title: track.title,
        artist: track.artist,
        track_number: track.track_number,
        path,
        kind: track.kind,
        size_bytes,
    })
}

impl MediaLibrary for ManifestLibrary {
    fn collection_names(&self) -> Result<Vec<String>> {
        Ok(self.collections.iter().map(|c| c.name.clone()).collect())
    }

    fn tracks(&self, name: &str) -> Result<Option<Vec<TrackDescriptor>>> {
        Ok(self
            .collections
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.tracks.clone()))
    }
}
