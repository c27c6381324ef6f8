mod cli;

use mixburn::{
    config,
    image::{self, CommandImageWriter, ImageWriter},
    library::{ManifestLibrary, MediaLibrary},
    pipeline::{ImageRequest, PipelineDriver, RunRequest, RunSummary},
    staging::{classify, ConversionWorker, TrackOutcome},
};
use mixburn_av::TranscodeTools;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands, QualityArg};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

/// Options of the `burn` command.
struct BurnOptions {
    playlists: Vec<String>,
    quality: Option<QualityArg>,
    processes: Option<usize>,
    decoder: Option<String>,
    encoder: Option<String>,
    library: Option<PathBuf>,
    staging_dir: Option<PathBuf>,
    no_image: bool,
    burn: bool,
    yes: bool,
}

/// Staging directory for one run.
enum StagingRoot {
    /// Removed when the run ends; used when an image is built from it.
    Temp(TempDir),
    /// Left in place for the user.
    Kept(PathBuf),
}

impl StagingRoot {
    fn path(&self) -> &Path {
        match self {
            StagingRoot::Temp(dir) => dir.path(),
            StagingRoot::Kept(path) => path,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    // Respect RUST_LOG env var if set, otherwise use defaults based on verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "mixburn=trace,mixburn_av=trace,mixburn_common=debug".to_string()
        } else {
            "mixburn=info,mixburn_av=info".to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Burn {
            playlists,
            quality,
            processes,
            decoder,
            encoder,
            library,
            staging_dir,
            no_image,
            burn,
            yes,
        } => run_burn(
            BurnOptions {
                playlists,
                quality,
                processes,
                decoder,
                encoder,
                library,
                staging_dir,
                no_image,
                burn,
                yes,
            },
            cli.config.as_deref(),
        ),
        Commands::List { playlist, library } => {
            list_playlists(playlist.as_deref(), library, cli.config.as_deref())
        }
        Commands::CheckTools => check_tools(cli.config.as_deref()),
        Commands::Validate {
            config: config_path,
        } => {
            let path = config_path.or(cli.config);
            validate_config(path.as_deref())
        }
        Commands::Version => {
            println!("mixburn {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn load_library(path: Option<&Path>) -> Result<ManifestLibrary> {
    let path = path.context("No library manifest configured; pass --library or set `library` in the config")?;
    Ok(ManifestLibrary::load(path)?)
}

fn run_burn(opts: BurnOptions, config_path: Option<&Path>) -> Result<()> {
    let mut config = config::load_config_or_default(config_path)?;

    // Command line overrides the config file
    if let Some(quality) = opts.quality {
        config.run.quality = quality.into();
    }
    if let Some(processes) = opts.processes {
        config.run.pool_size = processes;
    }
    if let Some(decoder) = opts.decoder {
        config.tools.decoder = decoder;
    }
    if let Some(encoder) = opts.encoder {
        config.tools.encoder = encoder;
    }
    if opts.library.is_some() {
        config.library = opts.library;
    }
    if opts.staging_dir.is_some() {
        config.run.staging_dir = opts.staging_dir;
    }
    if opts.no_image {
        config.image.enabled = false;
    }
    if opts.burn {
        config.image.burn = true;
    }
    config::validate_config(&config)?;

    let library = load_library(config.library.as_deref())?;
    let tools = TranscodeTools::discover(&config.tools.decoder, &config.tools.encoder)
        .context("Transcoding tools are not available (see `mixburn check-tools`)")?;

    let image_writer = if config.image.enabled {
        Some(Arc::new(
            CommandImageWriter::discover(config.image.backend)
                .context("Image tool is not available; pass --no-image to stop after staging")?,
        ))
    } else {
        None
    };

    let staging = match config.run.staging_dir {
        Some(ref dir) => {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create staging directory: {:?}", dir))?;
            StagingRoot::Kept(dir.clone())
        }
        None if config.image.enabled => StagingRoot::Temp(
            tempfile::Builder::new()
                .prefix("EncodeAudio-")
                .tempdir()
                .context("Failed to create staging directory")?,
        ),
        None => {
            let dir = std::env::temp_dir().join(format!(
                "EncodeAudio-{}-{}",
                chrono::Utc::now().format("%Y%m%dT%H%M%S"),
                std::process::id()
            ));
            std::fs::create_dir(&dir)
                .with_context(|| format!("Failed to create staging directory: {:?}", dir))?;
            StagingRoot::Kept(dir)
        }
    };

    let request = RunRequest {
        playlists: opts.playlists,
        quality: config.run.quality,
        capacity_bytes: config.run.capacity_bytes,
        inflation_factor: config.run.inflation_factor,
        failure_policy: config.run.on_track_failure,
        image: config.image.enabled.then(|| ImageRequest {
            volume_name: image::volume_name(&config.image.volume_prefix, chrono::Utc::now()),
            output_dir: config
                .image
                .output_dir
                .clone()
                .unwrap_or_else(std::env::temp_dir),
        }),
    };

    let rt = tokio::runtime::Runtime::new()?;
    let result = rt.block_on(async {
        let cancel = CancellationToken::new();
        let on_interrupt = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("Interrupted");
                on_interrupt.cancel();
            }
        });

        let mut driver = PipelineDriver::new(
            Arc::new(library),
            Arc::new(ConversionWorker::new(tools)),
            staging.path(),
        )
        .with_pool_size(config.run.pool_size)
        .with_cancellation(cancel);
        if let Some(ref writer) = image_writer {
            driver = driver.with_image_writer(writer.clone());
        }

        driver.run(&request).await
    });

    let summary = match result {
        Ok(summary) => summary,
        Err(e) => {
            tracing::error!("Terminating run: {}", e);
            return Err(e.into());
        }
    };
    print_summary(&summary);

    if let StagingRoot::Kept(ref dir) = staging {
        println!("Staged tracks: {}", dir.display());
    }

    if let (true, Some(image), Some(writer)) = (config.image.burn, &summary.image, &image_writer) {
        if opts.yes || confirm("Continue to burn CD? (y/N) ")? {
            rt.block_on(writer.burn(image))?;
            println!("Completed.");
        } else {
            println!("Exiting at user request.");
        }
    }

    Ok(())
}

fn print_summary(summary: &RunSummary) {
    let report = &summary.report;

    println!("Playlists: {}", summary.collections.join(", "));
    println!(
        "Estimated size: {} of {} bytes",
        summary.budget.estimated_total_bytes, summary.budget.capacity_bytes
    );
    println!("Staged: {} tracks", report.successes());

    if report.failures() > 0 {
        println!("FAILED: {} of {} tracks", report.failures(), report.len());
        for (key, outcome) in report.iter() {
            if let TrackOutcome::Failure(reason) = outcome {
                println!("  [{}] {}: {}", key.collection, key.path.display(), reason);
            }
        }
    }

    if let Some(ref image) = summary.image {
        println!("Image: {}", image.display());
    }
}

fn confirm(prompt: &str) -> Result<bool> {
    print!("{}", prompt);
    std::io::stdout().flush()?;

    let mut answer = String::new();
    std::io::stdin().read_line(&mut answer)?;
    Ok(answer.trim().eq_ignore_ascii_case("y"))
}

fn list_playlists(
    playlist: Option<&str>,
    library_path: Option<PathBuf>,
    config_path: Option<&Path>,
) -> Result<()> {
    let config = config::load_config_or_default(config_path)?;
    let library = load_library(library_path.or(config.library).as_deref())?;

    match playlist {
        None => {
            for name in library.collection_names()? {
                println!("{}", name);
            }
        }
        Some(name) => {
            let canonical = library
                .find_collection(name)?
                .with_context(|| format!("Playlist \"{}\" not found", name))?;
            let tracks = library.tracks(&canonical)?.unwrap_or_default();

            println!("{} ({} tracks)", canonical, tracks.len());
            for track in &tracks {
                println!(
                    "  {:>3}. {} - {} [{}] {} bytes ({})",
                    track.track_number,
                    track.artist,
                    track.title,
                    track.kind,
                    track.size_bytes,
                    classify(&track.kind)
                );
            }
        }
    }

    Ok(())
}

fn check_tools(config_path: Option<&Path>) -> Result<()> {
    let config = config::load_config_or_default(config_path)?;

    println!("Checking external tools...\n");

    let tools = mixburn_av::check_tools(
        &config.tools.decoder,
        &config.tools.encoder,
        &config.image.backend.tools(),
    );
    let required = 2;
    let mut all_ok = true;

    for (i, tool) in tools.iter().enumerate() {
        let status = if tool.available {
            "✓"
        } else {
            if i < required {
                all_ok = false;
            }
            "✗"
        };

        print!("{} {}", status, tool.name);

        if let Some(ref version) = tool.version {
            print!(" ({})", version);
        }

        if let Some(ref path) = tool.path {
            print!(" - {}", path.display());
        }

        println!();
    }

    println!();
    if all_ok {
        println!("Decoder and encoder are available!");
    } else {
        println!("Some tools are missing. Install faad and lame to convert AAC tracks.");
    }

    Ok(())
}

fn validate_config(path: Option<&Path>) -> Result<()> {
    match path {
        Some(p) => {
            println!("Validating config: {:?}", p);
            let config = config::load_config(p)?;
            println!("✓ Configuration is valid");
            println!("  Decoder: {}", config.tools.decoder);
            println!("  Encoder: {}", config.tools.encoder);
            println!("  Quality: {}", config.run.quality);
            println!("  Pool size: {}", config.run.pool_size);
            println!("  Capacity: {} bytes", config.run.capacity_bytes);
            println!("  Image enabled: {}", config.image.enabled);
        }
        None => {
            println!("No config file specified, using defaults");
            let config = config::Config::default();
            println!("Default config:");
            println!("  Decoder: {}", config.tools.decoder);
            println!("  Encoder: {}", config.tools.encoder);
        }
    }

    Ok(())
}
