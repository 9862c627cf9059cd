use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{Context, Result};
use convq_logging::{convq_info, convq_warn, LogDestination};
use log::LevelFilter;
use serde::{Deserialize, Serialize};

pub const DEFAULT_CONFIG_FILE: &str = "convq.ron";

/// Where log lines go. Mirrors [`LogDestination`] in a serialisable form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LogTarget {
    File,
    #[default]
    Terminal,
    Both,
}

impl From<LogTarget> for LogDestination {
    fn from(target: LogTarget) -> Self {
        match target {
            LogTarget::File => LogDestination::File,
            LogTarget::Terminal => LogDestination::Terminal,
            LogTarget::Both => LogDestination::Both,
        }
    }
}

/// Application settings, read from a RON file. Missing fields take their
/// defaults, so a config file only needs the values it changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub ffmpeg_path: PathBuf,
    pub ffprobe_path: PathBuf,
    /// Extra ffmpeg arguments placed before `-i`.
    pub ffmpeg_args: Vec<String>,
    /// Replace existing destination files instead of failing the job.
    pub overwrite: bool,
    pub output_dir: PathBuf,
    pub default_format: String,
    pub default_options: Vec<String>,
    /// Probe sources when they are added so the listing can show durations.
    pub probe_on_add: bool,
    pub log_destination: LogTarget,
    pub log_level: String,
    pub log_file: PathBuf,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: PathBuf::from("ffmpeg"),
            ffprobe_path: PathBuf::from("ffprobe"),
            ffmpeg_args: Vec::new(),
            overwrite: true,
            output_dir: PathBuf::from("converted"),
            default_format: "mp4".to_string(),
            default_options: Vec::new(),
            probe_on_add: true,
            log_destination: LogTarget::Terminal,
            log_level: "warn".to_string(),
            log_file: PathBuf::from("convq.log"),
        }
    }
}

impl AppConfig {
    /// Configured level, or `Info` when the value is not a level name.
    pub fn level_filter(&self) -> LevelFilter {
        LevelFilter::from_str(self.log_level.trim()).unwrap_or(LevelFilter::Info)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigOrigin {
    File(PathBuf),
    Defaults(PathBuf),
}

#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: AppConfig,
    pub origin: ConfigOrigin,
}

impl LoadedConfig {
    /// Reports where the config came from. Called once the logger is up.
    pub fn log_origin(&self) {
        match &self.origin {
            ConfigOrigin::File(path) => convq_info!("Loaded config from {:?}", path),
            ConfigOrigin::Defaults(path) => {
                convq_info!("No config at {:?}; using defaults", path)
            }
        }
        if LevelFilter::from_str(self.config.log_level.trim()).is_err() {
            convq_warn!(
                "Unknown log level {:?}; using info",
                self.config.log_level
            );
        }
    }
}

/// Reads the config at `path`, or at [`DEFAULT_CONFIG_FILE`] when no path is
/// given. Only the implicit default file may be missing.
pub fn load(path: Option<&Path>) -> Result<LoadedConfig> {
    let explicit = path.is_some();
    let path = path
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));

    let content = match fs::read_to_string(&path) {
        Ok(text) => text,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound && !explicit => {
            return Ok(LoadedConfig {
                config: AppConfig::default(),
                origin: ConfigOrigin::Defaults(path),
            });
        }
        Err(err) => {
            return Err(err).with_context(|| format!("Failed to read config {:?}", path));
        }
    };

    let config: AppConfig = ron::from_str(&content)
        .with_context(|| format!("Failed to parse config {:?}", path))?;
    Ok(LoadedConfig {
        config,
        origin: ConfigOrigin::File(path),
    })
}

pub fn to_ron(config: &AppConfig) -> Result<String> {
    let pretty = ron::ser::PrettyConfig::new();
    ron::ser::to_string_pretty(config, pretty).context("Failed to serialize config")
}
