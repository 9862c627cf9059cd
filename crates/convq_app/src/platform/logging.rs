//! Logger setup for the convq binary.
//!
//! Destination, level and file come from [`AppConfig`]; `--verbose` raises
//! the level to debug.

use log::LevelFilter;

use super::config::AppConfig;

pub fn initialize(config: &AppConfig, verbose: bool) {
    let level = if verbose {
        LevelFilter::Debug.max(config.level_filter())
    } else {
        config.level_filter()
    };
    convq_logging::initialize(
        config.log_destination.into(),
        level,
        Some(config.log_file.as_path()),
    );
}
