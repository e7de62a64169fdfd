mod types;

pub use types::*;

use anyhow::{Context, Result};
use mkvtidy_av::language;
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

    let default_paths = [
        "./mkvtidy.toml",
        "~/.config/mkvtidy/config.toml",
        "/etc/mkvtidy/config.toml",
    ];

    for path_str in default_paths {
        let path = shellexpand::tilde(path_str);
        let path = Path::new(path.as_ref());
        if path.exists() {
            tracing::debug!("Using config file {:?}", path);
            return load_config(path);
        }
    }

    Ok(Config::default())
}

/// Validate configuration
pub fn validate_config(config: &Config) -> Result<()> {
    if config.process.parallelism == 0 {
        anyhow::bail!("process.parallelism must be at least 1");
    }

    if config.convert.video_quality > 51 {
        anyhow::bail!(
            "convert.video_quality must be between 0 and 51, got {}",
            config.convert.video_quality
        );
    }

    for lang in &config.process.keep_languages {
        if language::lookup(lang).is_none() {
            anyhow::bail!("process.keep_languages: unknown language '{}'", lang);
        }
    }

    if config.process.snippet_seconds == Some(0) {
        anyhow::bail!("process.snippet_seconds must be greater than 0");
    }

    for (name, path) in [
        ("mkvmerge", &config.tools.mkvmerge_path),
        ("ffmpeg", &config.tools.ffmpeg_path),
        ("ffprobe", &config.tools.ffprobe_path),
        ("mediainfo", &config.tools.mediainfo_path),
        ("handbrake", &config.tools.handbrake_path),
    ] {
        if let Some(path) = path {
            if !path.exists() {
                tracing::warn!("Configured {} path does not exist: {:?}", name, path);
            }
        }
    }

    Ok(())
}
