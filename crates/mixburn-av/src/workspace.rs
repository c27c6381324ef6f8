//! Staged output with atomic finalization.

use crate::{Error, Result};
use std::path::{Path, PathBuf};
use tempfile::TempPath;

/// Output file under construction.
///
/// Writers target [`StagedFile::path`], a hidden temp file next to the final
/// destination. [`StagedFile::commit`] renames it onto the destination. If the
/// value is dropped without committing (failure, cancellation, an aborted
/// task) the temp file is deleted, so the destination never holds partial
/// output.
///
/// # Example
///
/// ```no_run
/// use mixburn_av::StagedFile;
///
/// let staged = StagedFile::new("/tmp/stage/Road Trip/Band - Song - 1.mp3")?;
/// std::fs::write(staged.path(), b"...")?;
/// staged.commit()?;
/// # Ok::<(), mixburn_av::Error>(())
/// ```
#[derive(Debug)]
pub struct StagedFile {
    temp: TempPath,
    destination: PathBuf,
}

impl StagedFile {
    /// Reserve a temp file in the destination's directory.
    pub fn new<P: AsRef<Path>>(destination: P) -> Result<Self> {
        let destination = destination.as_ref().to_path_buf();
        let dir = destination
            .parent()
            .ok_or_else(|| Error::Workspace(format!("no parent directory: {:?}", destination)))?;

        let temp = tempfile::Builder::new()
            .prefix(".mixburn-")
            .suffix(".part")
            .tempfile_in(dir)
            .map_err(|e| Error::Workspace(format!("failed to create temp file in {:?}: {}", dir, e)))?
            .into_temp_path();

        Ok(Self { temp, destination })
    }

    /// Path writers should write to.
    pub fn path(&self) -> &Path {
        &self.temp
    }

    /// Final destination path.
    pub fn destination(&self) -> &Path {
        &self.destination
    }

    /// Move the finished output onto its destination.
    pub fn commit(self) -> Result<PathBuf> {
        let destination = self.destination;
        self.temp.persist(&destination).map_err(|e| {
            Error::Workspace(format!("failed to move output to {:?}: {}", destination, e.error))
        })?;
        Ok(destination)
    }
}

/// Copy `source` byte for byte into a staged file.
pub async fn copy_verbatim(source: &Path, staged: &StagedFile) -> Result<u64> {
    let bytes = tokio::fs::copy(source, staged.path()).await?;

    #[cfg(feature = "tracing")]
    tracing::debug!(
        source = %source.display(),
        destination = %staged.destination().display(),
        bytes,
        "Copied track"
    );

    Ok(bytes)
}
