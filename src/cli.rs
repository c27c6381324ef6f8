use clap::{Parser, Subcommand, ValueEnum};
use mixburn_common::Quality;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "mixburn")]
#[command(author, version, about = "Burn playlists to an MP3 CD, converting AAC tracks on the way")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Output quality of converted tracks
#[derive(Clone, Copy, ValueEnum)]
pub enum QualityArg {
    /// 64 kbps
    Low,
    /// 128 kbps
    Med,
    /// 192 kbps
    High,
}

impl From<QualityArg> for Quality {
    fn from(arg: QualityArg) -> Self {
        match arg {
            QualityArg::Low => Quality::Low,
            QualityArg::Med => Quality::Med,
            QualityArg::High => Quality::High,
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Stage playlists and build (optionally burn) a disc image
    Burn {
        /// The name(s) of the playlist(s) to burn
        #[arg(required = true)]
        playlists: Vec<String>,

        /// Quality of converted MP3 tracks
        #[arg(long, value_enum)]
        quality: Option<QualityArg>,

        /// Number of tracks processed in parallel
        #[arg(long)]
        processes: Option<usize>,

        /// Path to the AAC decoder executable
        #[arg(long)]
        decoder: Option<String>,

        /// Path to the MP3 encoder executable
        #[arg(long)]
        encoder: Option<String>,

        /// Library manifest to read playlists from
        #[arg(short, long)]
        library: Option<PathBuf>,

        /// Stage into this directory instead of a fresh temp dir
        #[arg(long)]
        staging_dir: Option<PathBuf>,

        /// Stop after staging; do not build an image
        #[arg(long)]
        no_image: bool,

        /// Burn the image once built
        #[arg(long, conflicts_with = "no_image")]
        burn: bool,

        /// Do not ask for confirmation before burning
        #[arg(short, long)]
        yes: bool,
    },

    /// List playlists, or the tracks of one playlist
    List {
        /// Playlist to show tracks for
        playlist: Option<String>,

        /// Library manifest to read playlists from
        #[arg(short, long)]
        library: Option<PathBuf>,
    },

    /// Check that required external tools are available
    CheckTools,

    /// Validate configuration file
    Validate {
        /// Config file to validate (uses default if not specified)
        config: Option<PathBuf>,
    },

    /// Display version information
    Version,
}
