//! Mixburn-Common: Shared types, naming rules, and errors.
//!
//! This crate provides the vocabulary used across mixburn:
//!
//! - **Track Types**: [`TrackDescriptor`], [`Collection`], [`TrackAction`], [`Quality`]
//! - **Path Utilities**: deterministic output names for staged tracks
//! - **Error Handling**: library lookup errors and result alias
//!
//! # Examples
//!
//! ```
//! use mixburn_common::{Quality, TrackDescriptor};
//! use mixburn_common::paths::track_file_name;
//!
//! let track = TrackDescriptor::new("Song", "Band", 3, "/music/song.m4a", "AAC audio file", 4_000_000);
//! assert_eq!(track_file_name(&track), "Band - Song - 3.mp3");
//! assert_eq!(Quality::Med.bitrate_kbps(), 128);
//! ```

pub mod error;
pub mod paths;
pub mod types;

pub use error::{Error, Result};
pub use types::*;
