mod types;

pub use types::*;

use anyhow::{Context, Result};
use std::path::Path;

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let config: Config = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    validate_config(&config)?;

    Ok(config)
}

/// Load config from default locations or return default config
pub fn load_config_or_default(custom_path: Option<&Path>) -> Result<Config> {
    if let Some(path) = custom_path {
        return load_config(path);
    }

    // Try default locations
    let default_paths = [
        "./mixburn.toml",
        "~/.config/mixburn/config.toml",
        "/etc/mixburn/config.toml",
    ];

    for path_str in default_paths {
        let path = shellexpand::tilde(path_str);
        let path = Path::new(path.as_ref());
        if path.exists() {
            return load_config(path);
        }
    }

    Ok(Config::default())
}

/// Validate configuration
pub fn validate_config(config: &Config) -> Result<()> {
    if config.run.pool_size == 0 {
        anyhow::bail!("Pool size must be at least 1");
    }

    if config.run.capacity_bytes == 0 {
        anyhow::bail!("Capacity must be greater than 0 bytes");
    }

    let inflation = config.run.inflation_factor;
    if !inflation.is_finite() || inflation <= 0.0 {
        anyhow::bail!("Inflation factor must be a positive number, got {}", inflation);
    }

    if config.tools.decoder.trim().is_empty() || config.tools.encoder.trim().is_empty() {
        anyhow::bail!("Decoder and encoder must be set");
    }

    if let Some(ref library) = config.library {
        if !library.exists() {
            tracing::warn!("Library manifest does not exist: {:?}", library);
        }
    }

    if config.image.volume_prefix.trim().is_empty() {
        anyhow::bail!("Image volume prefix cannot be empty");
    }

    Ok(())
}
