//! Media probing through `ffprobe`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;
use tokio::process::Command;

/// The parts of a probe the queue cares about.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProbeReport {
    pub duration: Option<Duration>,
    pub format_name: Option<String>,
    pub video_codec: Option<String>,
    pub audio_codec: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProbeError {
    #[error("{0} not found")]
    ToolNotFound(String),
    #[error("source {0:?} does not exist")]
    SourceMissing(PathBuf),
    #[error("ffprobe failed: {0}")]
    Failed(String),
    #[error("could not parse ffprobe output: {0}")]
    Parse(String),
}

#[async_trait::async_trait]
pub trait MediaProber: Send + Sync {
    async fn probe(&self, path: &Path) -> Result<ProbeReport, ProbeError>;
}

#[derive(Debug, Clone)]
pub struct FfprobeProber {
    ffprobe_path: PathBuf,
}

impl FfprobeProber {
    pub fn new(ffprobe_path: impl Into<PathBuf>) -> Self {
        Self {
            ffprobe_path: ffprobe_path.into(),
        }
    }
}

impl Default for FfprobeProber {
    fn default() -> Self {
        Self::new("ffprobe")
    }
}

#[async_trait::async_trait]
impl MediaProber for FfprobeProber {
    async fn probe(&self, path: &Path) -> Result<ProbeReport, ProbeError> {
        if !path.exists() {
            return Err(ProbeError::SourceMissing(path.to_path_buf()));
        }
        let output = Command::new(&self.ffprobe_path)
            .args([
                "-v",
                "quiet",
                "-print_format",
                "json",
                "-show_format",
                "-show_streams",
            ])
            .arg(path)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|err| {
                if err.kind() == std::io::ErrorKind::NotFound {
                    ProbeError::ToolNotFound(self.ffprobe_path.display().to_string())
                } else {
                    ProbeError::Failed(err.to_string())
                }
            })?;

        if !output.status.success() {
            return Err(ProbeError::Failed(format!(
                "exit status {:?}",
                output.status.code()
            )));
        }
        parse_ffprobe_json(&output.stdout)
    }
}

#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    format: Option<FfprobeFormat>,
    #[serde(default)]
    streams: Vec<FfprobeStream>,
}

#[derive(Debug, Deserialize)]
struct FfprobeFormat {
    format_name: Option<String>,
    duration: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    codec_type: Option<String>,
    codec_name: Option<String>,
}

pub fn parse_ffprobe_json(bytes: &[u8]) -> Result<ProbeReport, ProbeError> {
    let output: FfprobeOutput =
        serde_json::from_slice(bytes).map_err(|err| ProbeError::Parse(err.to_string()))?;

    let first_codec = |kind: &str| {
        output
            .streams
            .iter()
            .find(|stream| stream.codec_type.as_deref() == Some(kind))
            .and_then(|stream| stream.codec_name.clone())
    };

    let (format_name, duration) = match &output.format {
        Some(format) => (
            format.format_name.clone(),
            format
                .duration
                .as_deref()
                .and_then(|raw| raw.trim().parse::<f64>().ok())
                .filter(|secs| secs.is_finite() && *secs >= 0.0)
                .map(Duration::from_secs_f64),
        ),
        None => (None, None),
    };

    Ok(ProbeReport {
        duration,
        format_name,
        video_codec: first_codec("video"),
        audio_codec: first_codec("audio"),
    })
}
