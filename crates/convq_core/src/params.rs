use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Everything the converter engine needs to run one job.
///
/// The queue never looks inside `format` or `options`; they are forwarded to
/// the engine as given.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionParameters {
    pub source: PathBuf,
    pub destination: PathBuf,
    pub format: String,
    #[serde(default)]
    pub options: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParameterError {
    #[error("source path is empty")]
    MissingSource,
    #[error("destination path is empty")]
    MissingDestination,
    #[error("target format is empty")]
    MissingFormat,
    #[error("destination {0:?} is the same as the source")]
    SameSourceAndDestination(PathBuf),
}

impl ConversionParameters {
    pub fn new(
        source: impl Into<PathBuf>,
        destination: impl Into<PathBuf>,
        format: impl Into<String>,
    ) -> Self {
        Self {
            source: source.into(),
            destination: destination.into(),
            format: format.into(),
            options: Vec::new(),
        }
    }

    /// Builds parameters that write `<output_dir>/<source stem>.<format>`.
    pub fn for_source(source: impl Into<PathBuf>, output_dir: &Path, format: &str) -> Self {
        let source = source.into();
        let destination = destination_for(&source, output_dir, format);
        Self::new(source, destination, format)
    }

    pub fn with_options<I, S>(mut self, options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options = options.into_iter().map(Into::into).collect();
        self
    }

    pub fn validate(&self) -> Result<(), ParameterError> {
        if self.source.as_os_str().is_empty() {
            return Err(ParameterError::MissingSource);
        }
        if self.destination.as_os_str().is_empty() {
            return Err(ParameterError::MissingDestination);
        }
        if self.format.trim().is_empty() {
            return Err(ParameterError::MissingFormat);
        }
        if self.source == self.destination {
            return Err(ParameterError::SameSourceAndDestination(
                self.destination.clone(),
            ));
        }
        Ok(())
    }

    /// File name of the source, for display.
    pub fn source_name(&self) -> String {
        self.source
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.source.display().to_string())
    }
}

/// `<output_dir>/<stem of source>.<format>`; falls back to `output` when the
/// source has no usable stem.
pub fn destination_for(source: &Path, output_dir: &Path, format: &str) -> PathBuf {
    let stem = source
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .filter(|stem| !stem.is_empty())
        .unwrap_or_else(|| "output".to_string());
    output_dir.join(format!("{}.{}", stem, format.trim()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_reports_the_first_missing_field() {
        let params = ConversionParameters::new("", "out.mkv", "matroska");
        assert_eq!(params.validate(), Err(ParameterError::MissingSource));

        let params = ConversionParameters::new("in.avi", "", "matroska");
        assert_eq!(params.validate(), Err(ParameterError::MissingDestination));

        let params = ConversionParameters::new("in.avi", "out.mkv", "  ");
        assert_eq!(params.validate(), Err(ParameterError::MissingFormat));
    }

    #[test]
    fn validate_rejects_in_place_conversion() {
        let params = ConversionParameters::new("clip.mp4", "clip.mp4", "mp4");
        assert!(matches!(
            params.validate(),
            Err(ParameterError::SameSourceAndDestination(_))
        ));
    }

    #[test]
    fn for_source_derives_destination_from_stem() {
        let params =
            ConversionParameters::for_source("/media/in/holiday.avi", Path::new("/out"), "mkv");
        assert_eq!(params.destination, PathBuf::from("/out/holiday.mkv"));
        assert_eq!(params.format, "mkv");
        assert!(params.validate().is_ok());
        assert_eq!(params.source_name(), "holiday.avi");
    }

    #[test]
    fn destination_for_falls_back_without_stem() {
        let dest = destination_for(Path::new(""), Path::new("out"), "mp3");
        assert_eq!(dest, PathBuf::from("out/output.mp3"));
    }
}
