//! # mixburn-av
//!
//! External audio tool plumbing for mixburn.
//!
//! This crate provides functionality for:
//! - Locating the decoder and encoder executables
//! - Running a decoder piped into an encoder to produce an MP3
//! - Writing output through a temp file that only appears under its final
//!   name once complete
//!
//! ## Features
//!
//! - `tracing` - Enable tracing support
//!
//! ## Example
//!
//! ```no_run
//! use mixburn_av::{StagedFile, TranscodeTools};
//!
//! # async fn run() -> mixburn_av::Result<()> {
//! let tools = TranscodeTools::discover("faad", "lame")?;
//! let staged = StagedFile::new("/tmp/out/Band - Song - 1.mp3")?;
//! mixburn_av::transcode(&tools, "/music/song.m4a".as_ref(), staged.path(), 128).await?;
//! staged.commit()?;
//! # Ok(())
//! # }
//! ```

mod error;
pub mod tools;
pub mod transcode;
pub mod workspace;

// Re-exports
pub use error::{Error, Result};
pub use tools::{check_tool, check_tools, resolve_tool, ToolInfo};
pub use transcode::{decode_args, encode_args, transcode, TranscodeTools};
pub use workspace::{copy_verbatim, StagedFile};
