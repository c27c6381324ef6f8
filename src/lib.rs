//! Mixburn - stage playlists onto an MP3 CD
//!
//! This library crate exposes the staging pipeline for integration testing.

pub mod config;
pub mod image;
pub mod library;
pub mod pipeline;
pub mod staging;
