//! Disc image creation and burning.
//!
//! The staging tree is handed to an [`ImageWriter`] only after a run finished
//! cleanly. [`CommandImageWriter`] drives `hdiutil` on macOS or `genisoimage`
//! elsewhere.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mixburn_av::{resolve_tool, Error, Result};
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tokio::process::Command;

/// Consumes a finished staging tree.
#[async_trait]
pub trait ImageWriter: Send + Sync {
    /// Build an ISO of `tree` in `output_dir`, returning its path. No image
    /// file is left behind on failure.
    async fn create_image(&self, tree: &Path, volume_name: &str, output_dir: &Path)
        -> Result<PathBuf>;

    /// Burn a finished image.
    async fn burn(&self, image: &Path) -> Result<()>;
}

/// Tool family used to build and burn images.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageBackend {
    #[default]
    Hdiutil,
    Genisoimage,
}

impl ImageBackend {
    /// Image and burn tools this backend runs, with the argument that makes
    /// each print its version.
    pub fn tools(&self) -> [(&'static str, &'static str); 2] {
        match self {
            ImageBackend::Hdiutil => [("hdiutil", "help"), ("drutil", "help")],
            ImageBackend::Genisoimage => [("genisoimage", "--version"), ("wodim", "--version")],
        }
    }

    fn image_tool(&self) -> &'static str {
        match self {
            ImageBackend::Hdiutil => "hdiutil",
            ImageBackend::Genisoimage => "genisoimage",
        }
    }
}

/// Volume label for a disc created at `now`: `<prefix>-YYYYMMDD`.
pub fn volume_name(prefix: &str, now: DateTime<Utc>) -> String {
    format!("{}-{}", prefix, now.format("%Y%m%d"))
}

/// Arguments that build `image` from `tree`.
pub fn image_args(backend: ImageBackend, tree: &Path, volume_name: &str, image: &Path) -> Vec<OsString> {
    let mut args: Vec<OsString> = match backend {
        ImageBackend::Hdiutil => vec![
            "makehybrid".into(),
            "-iso".into(),
            "-joliet".into(),
            "-joliet-volume-name".into(),
            volume_name.into(),
        ],
        ImageBackend::Genisoimage => vec![
            "-quiet".into(),
            "-J".into(),
            "-r".into(),
            "-V".into(),
            volume_name.into(),
        ],
    };
    args.extend([
        "-o".into(),
        image.as_os_str().to_os_string(),
        tree.as_os_str().to_os_string(),
    ]);
    args
}

/// [`ImageWriter`] running external image tools.
#[derive(Debug, Clone)]
pub struct CommandImageWriter {
    backend: ImageBackend,
    tool: PathBuf,
}

impl CommandImageWriter {
    pub fn new(backend: ImageBackend, tool: impl Into<PathBuf>) -> Self {
        Self {
            backend,
            tool: tool.into(),
        }
    }

    /// Locate the image tool for `backend` on `PATH`.
    pub fn discover(backend: ImageBackend) -> Result<Self> {
        Ok(Self::new(backend, resolve_tool(backend.image_tool())?))
    }
}

#[async_trait]
impl ImageWriter for CommandImageWriter {
    async fn create_image(
        &self,
        tree: &Path,
        volume_name: &str,
        output_dir: &Path,
    ) -> Result<PathBuf> {
        let image = output_dir.join(format!("{volume_name}.iso"));

        // A stale image from an earlier run would make hdiutil refuse.
        match tokio::fs::remove_file(&image).await {
            Ok(()) => tracing::debug!(image = %image.display(), "Removed stale image"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }

        tracing::info!(
            tree = %tree.display(),
            image = %image.display(),
            volume = %volume_name,
            "Creating disc image"
        );

        let output = Command::new(&self.tool)
            .args(image_args(self.backend, tree, volume_name, &image))
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| Error::spawn(self.backend.image_tool(), e))?;

        if !output.status.success() {
            let _ = tokio::fs::remove_file(&image).await;
            return Err(Error::tool_failed(
                self.backend.image_tool(),
                format!(
                    "{}: {}",
                    output.status,
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
            ));
        }

        let size = tokio::fs::metadata(&image).await?.len();
        tracing::info!(image = %image.display(), bytes = size, "Actual burn size");
        Ok(image)
    }

    async fn burn(&self, image: &Path) -> Result<()> {
        let (tool, args): (PathBuf, Vec<OsString>) = match self.backend {
            ImageBackend::Hdiutil => (
                self.tool.clone(),
                vec!["burn".into(), image.as_os_str().to_os_string()],
            ),
            ImageBackend::Genisoimage => (
                resolve_tool("wodim")?,
                vec!["-eject".into(), image.as_os_str().to_os_string()],
            ),
        };

        tracing::info!(image = %image.display(), "Burning disc");
        let status = Command::new(&tool)
            .args(&args)
            .status()
            .await
            .map_err(|e| Error::spawn(tool.display().to_string(), e))?;
        if !status.success() {
            return Err(Error::tool_failed(tool.display().to_string(), status.to_string()));
        }

        if self.backend == ImageBackend::Hdiutil {
            match Command::new("drutil").arg("eject").status().await {
                Ok(s) if s.success() => {}
                Ok(s) => tracing::warn!(status = %s, "drutil eject failed"),
                Err(e) => tracing::warn!(error = %e, "Could not run drutil eject"),
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_volume_name() {
        let now = Utc.with_ymd_and_hms(2024, 3, 9, 23, 59, 0).unwrap();
        assert_eq!(volume_name("Music", now), "Music-20240309");
    }

    #[test]
    fn test_backend_tools() {
        let names = |backend: ImageBackend| backend.tools().map(|(name, _)| name);
        assert_eq!(names(ImageBackend::Hdiutil), ["hdiutil", "drutil"]);
        assert_eq!(names(ImageBackend::Genisoimage), ["genisoimage", "wodim"]);
    }

    #[test]
    fn test_hdiutil_args() {
        let args = image_args(
            ImageBackend::Hdiutil,
            Path::new("/tmp/EncodeAudio-x"),
            "Music-20240309",
            Path::new("/tmp/BurnAudio/Music-20240309.iso"),
        );
        assert_eq!(
            args,
            vec![
                "makehybrid",
                "-iso",
                "-joliet",
                "-joliet-volume-name",
                "Music-20240309",
                "-o",
                "/tmp/BurnAudio/Music-20240309.iso",
                "/tmp/EncodeAudio-x",
            ]
        );
    }

    #[test]
    fn test_genisoimage_args() {
        let args = image_args(
            ImageBackend::Genisoimage,
            Path::new("/stage"),
            "Music-20240309",
            Path::new("/out/Music-20240309.iso"),
        );
        assert_eq!(args[..5], ["-quiet", "-J", "-r", "-V", "Music-20240309"]);
        assert_eq!(args[5..], ["-o", "/out/Music-20240309.iso", "/stage"]);
    }

    #[test]
    fn test_backend_serde() {
        let backend: ImageBackend = serde_json::from_str("\"genisoimage\"").unwrap();
        assert_eq!(backend, ImageBackend::Genisoimage);
        assert_eq!(ImageBackend::default(), ImageBackend::Hdiutil);
    }

    #[cfg(unix)]
    mod command {
        use super::super::*;
        use std::os::unix::fs::PermissionsExt;

        fn script(dir: &Path, body: &str) -> PathBuf {
            let path = dir.join("imager");
            std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
            path
        }

        #[tokio::test]
        async fn test_create_image() {
            let bin = tempfile::tempdir().unwrap();
            let out = tempfile::tempdir().unwrap();
            let tree = tempfile::tempdir().unwrap();
            // genisoimage args: -quiet -J -r -V <name> -o <iso> <tree>
            let writer = CommandImageWriter::new(
                ImageBackend::Genisoimage,
                script(bin.path(), r#"printf 'iso' > "$7""#),
            );

            let image = writer
                .create_image(tree.path(), "Music-20240309", out.path())
                .await
                .unwrap();
            assert_eq!(image, out.path().join("Music-20240309.iso"));
            assert_eq!(std::fs::read(&image).unwrap(), b"iso");
        }

        #[tokio::test]
        async fn test_failed_image_is_removed() {
            let bin = tempfile::tempdir().unwrap();
            let out = tempfile::tempdir().unwrap();
            let tree = tempfile::tempdir().unwrap();
            let writer = CommandImageWriter::new(
                ImageBackend::Genisoimage,
                script(bin.path(), r#"printf 'half' > "$7"; exit 1"#),
            );

            let err = writer
                .create_image(tree.path(), "Music-20240309", out.path())
                .await
                .unwrap_err();
            assert!(matches!(err, Error::ToolFailed { .. }));
            assert!(!out.path().join("Music-20240309.iso").exists());
        }
    }
}
