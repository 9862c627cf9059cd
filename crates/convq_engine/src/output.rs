use std::fs;
use std::path::Path;

use tempfile::NamedTempFile;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum OutputError {
    #[error("output directory missing or not writable: {0}")]
    OutputDir(String),
    #[error("destination {0:?} is a directory")]
    DestinationIsDir(String),
}

/// Ensure output directory exists; create if missing.
pub fn ensure_output_dir(dir: &Path) -> Result<(), OutputError> {
    if dir.exists() {
        let meta = fs::metadata(dir).map_err(|e| OutputError::OutputDir(e.to_string()))?;
        if !meta.is_dir() {
            return Err(OutputError::OutputDir("path is not a directory".into()));
        }
    } else {
        fs::create_dir_all(dir).map_err(|e| OutputError::OutputDir(e.to_string()))?;
    }
    // Basic writability probe: try creating a temp file.
    NamedTempFile::new_in(dir).map_err(|e| OutputError::OutputDir(e.to_string()))?;
    Ok(())
}

/// Make sure the converter can write `destination`: its parent directory
/// exists and is writable, and the path itself is not a directory.
pub fn prepare_destination(destination: &Path) -> Result<(), OutputError> {
    if destination.is_dir() {
        return Err(OutputError::DestinationIsDir(
            destination.display().to_string(),
        ));
    }
    let parent = match destination.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    ensure_output_dir(parent)
}
