//! External tool detection.

use crate::{Error, Result};
use std::path::{Path, PathBuf};
use std::process::Command;

/// Information about an external tool.
#[derive(Debug, Clone)]
pub struct ToolInfo {
    /// Name of the tool as configured.
    pub name: String,
    /// Whether the tool is available.
    pub available: bool,
    /// Version string if the tool reports one.
    pub version: Option<String>,
    /// Path to the tool executable.
    pub path: Option<PathBuf>,
}

/// Check if a tool is available and get its information.
///
/// A tool counts as available when it resolves to an executable, either as an
/// existing path or through `PATH`. The version is best effort: `faad` and
/// `hdiutil` have no version flag that exits cleanly, so it may be missing.
///
/// # Example
///
/// ```no_run
/// use mixburn_av::check_tool;
///
/// let info = check_tool("lame", "--version");
/// if info.available {
///     println!("lame version: {:?}", info.version);
/// }
/// ```
pub fn check_tool(name: &str, version_arg: &str) -> ToolInfo {
    let path = match resolve_tool(name) {
        Ok(path) => path,
        Err(_) => {
            return ToolInfo {
                name: name.to_string(),
                available: false,
                version: None,
                path: None,
            }
        }
    };

    let version = match Command::new(&path).arg(version_arg).output() {
        Ok(output) if output.status.success() => String::from_utf8_lossy(&output.stdout)
            .lines()
            .find(|l| !l.trim().is_empty())
            .map(|s| s.trim().to_string()),
        _ => None,
    };

    ToolInfo {
        name: name.to_string(),
        available: true,
        version,
        path: Some(path),
    }
}

/// Check the decoder and the encoder, then each `(name, version_arg)` image
/// tool in order.
pub fn check_tools(decoder: &str, encoder: &str, image_tools: &[(&str, &str)]) -> Vec<ToolInfo> {
    let mut tools = vec![check_tool(decoder, "-h"), check_tool(encoder, "--version")];
    tools.extend(
        image_tools
            .iter()
            .map(|(name, version_arg)| check_tool(name, version_arg)),
    );
    tools
}

/// Resolve a configured tool to an executable path.
///
/// An existing path is used as is; anything else is looked up on `PATH`.
///
/// # Errors
///
/// Returns [`Error::ToolNotFound`] if neither lookup succeeds.
pub fn resolve_tool(configured: &str) -> Result<PathBuf> {
    let path = Path::new(configured);
    if path.components().count() > 1 && path.is_file() {
        return Ok(path.to_path_buf());
    }

    which::which(configured).map_err(|_| Error::tool_not_found(configured))
}
