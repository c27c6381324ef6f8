use crate::image::ImageBackend;
use crate::pipeline::FailurePolicy;
use crate::staging::budget::{DEFAULT_CAPACITY_BYTES, DEFAULT_INFLATION_FACTOR};
use crate::staging::DEFAULT_POOL_SIZE;
use mixburn_common::Quality;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    /// Library manifest to read playlists from
    #[serde(default)]
    pub library: Option<PathBuf>,

    #[serde(default)]
    pub tools: ToolsConfig,

    #[serde(default)]
    pub run: RunConfig,

    #[serde(default)]
    pub image: ImageConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ToolsConfig {
    /// AAC decoder, by name or path
    #[serde(default = "default_decoder")]
    pub decoder: String,

    /// MP3 encoder, by name or path
    #[serde(default = "default_encoder")]
    pub encoder: String,
}

fn default_decoder() -> String {
    "faad".to_string()
}
fn default_encoder() -> String {
    "lame".to_string()
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            decoder: default_decoder(),
            encoder: default_encoder(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RunConfig {
    #[serde(default)]
    pub quality: Quality,

    /// Tracks processed at once
    #[serde(default = "default_pool_size")]
    pub pool_size: usize,

    /// Disc capacity in bytes
    #[serde(default = "default_capacity")]
    pub capacity_bytes: u64,

    /// Expected size growth of the selection after conversion
    #[serde(default = "default_inflation")]
    pub inflation_factor: f64,

    #[serde(default)]
    pub on_track_failure: FailurePolicy,

    /// Staging directory (default: a fresh temp dir per run)
    #[serde(default)]
    pub staging_dir: Option<PathBuf>,
}

fn default_pool_size() -> usize {
    DEFAULT_POOL_SIZE
}
fn default_capacity() -> u64 {
    DEFAULT_CAPACITY_BYTES
}
fn default_inflation() -> f64 {
    DEFAULT_INFLATION_FACTOR
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            quality: Quality::default(),
            pool_size: default_pool_size(),
            capacity_bytes: default_capacity(),
            inflation_factor: default_inflation(),
            on_track_failure: FailurePolicy::default(),
            staging_dir: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ImageConfig {
    /// Build a disc image after staging
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default)]
    pub backend: ImageBackend,

    /// Burn the image once built
    #[serde(default)]
    pub burn: bool,

    /// Volume label prefix; the UTC date is appended
    #[serde(default = "default_volume_prefix")]
    pub volume_prefix: String,

    /// Where the image is written (default: system temp dir)
    #[serde(default)]
    pub output_dir: Option<PathBuf>,
}

fn default_true() -> bool {
    true
}
fn default_volume_prefix() -> String {
    "Music".to_string()
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            backend: ImageBackend::default(),
            burn: false,
            volume_prefix: default_volume_prefix(),
            output_dir: None,
        }
    }
}
