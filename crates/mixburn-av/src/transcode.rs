//! Decoder → encoder pipe.
//!
//! A transcode runs two processes at once: the decoder writes raw audio to its
//! stdout, which is handed directly to the encoder's stdin. The pipe is the
//! only synchronization between them; the caller waits until both exit.

use crate::tools::resolve_tool;
use crate::{Error, Result};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Output, Stdio};
use tokio::process::Command;

/// Resolved decoder and encoder executables.
#[derive(Debug, Clone)]
pub struct TranscodeTools {
    pub decoder: PathBuf,
    pub encoder: PathBuf,
}

impl TranscodeTools {
    pub fn new(decoder: impl Into<PathBuf>, encoder: impl Into<PathBuf>) -> Self {
        Self {
            decoder: decoder.into(),
            encoder: encoder.into(),
        }
    }

    /// Resolve both tools from configured names or paths.
    pub fn discover(decoder: &str, encoder: &str) -> Result<Self> {
        Ok(Self {
            decoder: resolve_tool(decoder)?,
            encoder: resolve_tool(encoder)?,
        })
    }
}

/// Decoder arguments: `-q -o - <source>`.
pub fn decode_args(source: &Path) -> Vec<OsString> {
    vec![
        "-q".into(),
        "-o".into(),
        "-".into(),
        source.as_os_str().to_os_string(),
    ]
}

/// Encoder arguments: `-h -S -b <kbps> - <output>`.
pub fn encode_args(bitrate_kbps: u32, output: &Path) -> Vec<OsString> {
    vec![
        "-h".into(),
        "-S".into(),
        "-b".into(),
        bitrate_kbps.to_string().into(),
        "-".into(),
        output.as_os_str().to_os_string(),
    ]
}

/// Transcode `source` into `output` at `bitrate_kbps`.
///
/// Both children are spawned with kill-on-drop, so dropping the returned
/// future (for example when its task is aborted) kills the pipe.
///
/// # Errors
///
/// - [`Error::FileNotFound`] if `source` does not exist
/// - [`Error::Spawn`] if either tool cannot be started
/// - [`Error::BrokenPipe`] if the decoder died on SIGPIPE
/// - [`Error::ToolFailed`] if either tool exits non-zero
pub async fn transcode(
    tools: &TranscodeTools,
    source: &Path,
    output: &Path,
    bitrate_kbps: u32,
) -> Result<()> {
    if !source.is_file() {
        return Err(Error::file_not_found(source));
    }

    let decoder_name = tool_name(&tools.decoder);
    let encoder_name = tool_name(&tools.encoder);

    #[cfg(feature = "tracing")]
    tracing::debug!(
        decoder = %tools.decoder.display(),
        encoder = %tools.encoder.display(),
        source = %source.display(),
        output = %output.display(),
        bitrate_kbps,
        "Starting transcode pipe"
    );

    let mut decode = Command::new(&tools.decoder)
        .args(decode_args(source))
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| Error::spawn(&decoder_name, e))?;

    let raw_audio: Stdio = decode
        .stdout
        .take()
        .ok_or_else(|| Error::tool_failed(&decoder_name, "stdout was not captured"))?
        .try_into()?;

    // The Command holding the pipe's read end is a temporary, so the parent
    // releases it as soon as the encoder is spawned.
    let encode = Command::new(&tools.encoder)
        .args(encode_args(bitrate_kbps, output))
        .stdin(raw_audio)
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| Error::spawn(&encoder_name, e))?;

    let (decoded, encoded) = tokio::join!(decode.wait_with_output(), encode.wait_with_output());
    let decoded = decoded?;
    let encoded = encoded?;

    check_pipe(&decoder_name, &decoded, &encoder_name, &encoded)
}

/// Interpret the exit of both ends of the pipe.
fn check_pipe(
    decoder_name: &str,
    decoded: &Output,
    encoder_name: &str,
    encoded: &Output,
) -> Result<()> {
    if killed_by_sigpipe(&decoded.status) {
        return Err(Error::broken_pipe(
            decoder_name,
            format!("{} {}", encoder_name, describe(encoded)),
        ));
    }

    // A failed decoder leaves the encoder with no input, so it usually fails
    // too; the decoder is the cause.
    if !decoded.status.success() {
        return Err(Error::tool_failed(decoder_name, describe(decoded)));
    }

    if !encoded.status.success() {
        return Err(Error::tool_failed(encoder_name, describe(encoded)));
    }

    Ok(())
}

fn describe(output: &Output) -> String {
    let stderr = String::from_utf8_lossy(&output.stderr);
    match stderr.lines().rev().find(|l| !l.trim().is_empty()) {
        Some(last) => format!("{} ({})", output.status, last.trim()),
        None => output.status.to_string(),
    }
}

#[cfg(unix)]
fn killed_by_sigpipe(status: &ExitStatus) -> bool {
    use std::os::unix::process::ExitStatusExt;
    status.signal() == Some(libc::SIGPIPE)
}

#[cfg(not(unix))]
fn killed_by_sigpipe(_status: &ExitStatus) -> bool {
    false
}

fn tool_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}
