//! Shared fixtures for integration tests.
//!
//! [`Fixture`] owns a temp dir with a `music/` source tree and a `stage/`
//! staging root. [`RecordingImageWriter`] stands in for the disc image tools.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tempfile::TempDir;

use mixburn::image::ImageWriter;
use mixburn::library::{ManifestLibrary, MediaLibrary};
use mixburn_common::{Collection, TrackDescriptor};

pub const AAC: &str = "AAC audio file";
pub const MP3: &str = "MPEG audio file";

pub struct Fixture {
    pub dir: TempDir,
}

impl Fixture {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        std::fs::create_dir(dir.path().join("music")).expect("failed to create music dir");
        std::fs::create_dir(dir.path().join("stage")).expect("failed to create stage dir");
        Self { dir }
    }

    pub fn music_dir(&self) -> PathBuf {
        self.dir.path().join("music")
    }

    pub fn staging_root(&self) -> PathBuf {
        self.dir.path().join("stage")
    }

    /// Write a source file and describe it as a track of `kind`.
    pub fn track(&self, artist: &str, title: &str, number: u32, kind: &str) -> TrackDescriptor {
        let path = self.music_dir().join(format!("{artist}-{title}-{number}.src"));
        let contents = format!("{artist}/{title}/{number}");
        std::fs::write(&path, &contents).expect("failed to write source file");
        TrackDescriptor::new(title, artist, number, path, kind, contents.len() as u64)
    }

    /// Describe a track whose source file does not exist.
    pub fn missing_track(&self, artist: &str, title: &str, number: u32, kind: &str) -> TrackDescriptor {
        let path = self.music_dir().join(format!("{artist}-{title}-{number}.gone"));
        TrackDescriptor::new(title, artist, number, path, kind, 100)
    }

    /// Paths under the staging root, relative and sorted.
    pub fn staged_files(&self) -> Vec<PathBuf> {
        let mut files = Vec::new();
        collect_files(&self.staging_root(), &self.staging_root(), &mut files);
        files.sort();
        files
    }
}

fn collect_files(root: &Path, dir: &Path, out: &mut Vec<PathBuf>) {
    for entry in std::fs::read_dir(dir).expect("failed to read dir") {
        let path = entry.expect("failed to read entry").path();
        if path.is_dir() {
            collect_files(root, &path, out);
        } else {
            out.push(path.strip_prefix(root).unwrap().to_path_buf());
        }
    }
}

pub fn library(collections: Vec<Collection>) -> Arc<dyn MediaLibrary> {
    Arc::new(ManifestLibrary::from_collections(collections))
}

pub fn names(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

/// Write an executable `/bin/sh` script.
#[cfg(unix)]
pub fn script(dir: &Path, name: &str, body: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join(name);
    std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).expect("failed to write script");
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755))
        .expect("failed to chmod script");
    path
}

/// Decoder and encoder stand-ins that pass the source bytes straight through.
#[cfg(unix)]
pub fn passthrough_tools(dir: &Path) -> mixburn_av::TranscodeTools {
    mixburn_av::TranscodeTools::new(
        script(dir, "decode", r#"cat "$4""#),
        script(dir, "encode", r#"cat > "$6""#),
    )
}

/// A decoder that always fails, paired with an encoder that rejects empty
/// input.
#[cfg(unix)]
pub fn failing_decoder_tools(dir: &Path) -> mixburn_av::TranscodeTools {
    mixburn_av::TranscodeTools::new(
        script(dir, "decode", "echo 'corrupt stream' >&2; exit 1"),
        script(
            dir,
            "encode",
            r#"cat > "$6"; if [ ! -s "$6" ]; then echo 'no input' >&2; exit 1; fi"#,
        ),
    )
}

/// An encoder that writes a few bytes and then hangs.
#[cfg(unix)]
pub fn stalling_encoder_tools(dir: &Path) -> mixburn_av::TranscodeTools {
    mixburn_av::TranscodeTools::new(
        script(dir, "decode", r#"cat "$4""#),
        script(dir, "encode", r#"printf 'ID3' > "$6"; exec sleep 30"#),
    )
}

/// Records image requests and writes an empty image file for each.
#[derive(Default)]
pub struct RecordingImageWriter {
    pub created: Mutex<Vec<(PathBuf, String)>>,
    pub burned: Mutex<Vec<PathBuf>>,
}

impl RecordingImageWriter {
    pub fn create_calls(&self) -> usize {
        self.created.lock().len()
    }
}

#[async_trait]
impl ImageWriter for RecordingImageWriter {
    async fn create_image(
        &self,
        tree: &Path,
        volume_name: &str,
        output_dir: &Path,
    ) -> mixburn_av::Result<PathBuf> {
        self.created
            .lock()
            .push((tree.to_path_buf(), volume_name.to_string()));
        let image = output_dir.join(format!("{volume_name}.iso"));
        std::fs::write(&image, b"")?;
        Ok(image)
    }

    async fn burn(&self, image: &Path) -> mixburn_av::Result<()> {
        self.burned.lock().push(image.to_path_buf());
        Ok(())
    }
}
