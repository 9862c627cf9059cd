//! Conversion backend that shells out to `ffmpeg`.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::{Duration, Instant};

use convq_logging::{convq_debug, convq_info, convq_warn};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio_util::sync::CancellationToken;

use crate::backend::{ConversionBackend, ProgressSink};
use crate::output::prepare_destination;
use crate::probe::MediaProber;
use crate::{
    ConversionError, ConversionOutcome, ConversionRequest, EngineEvent, FailureKind, JobToken,
};

const STDERR_TAIL_LINES: usize = 8;

#[derive(Debug, Clone)]
pub struct FfmpegSettings {
    pub ffmpeg_path: PathBuf,
    /// Arguments placed before `-i`, e.g. hardware acceleration flags.
    pub global_args: Vec<String>,
    /// Overwrite an existing destination (`-y`) instead of failing (`-n`).
    pub overwrite: bool,
}

impl Default for FfmpegSettings {
    fn default() -> Self {
        Self {
            ffmpeg_path: PathBuf::from("ffmpeg"),
            global_args: Vec::new(),
            overwrite: true,
        }
    }
}

pub struct FfmpegBackend {
    settings: FfmpegSettings,
    prober: Option<Arc<dyn MediaProber>>,
}

impl FfmpegBackend {
    pub fn new(settings: FfmpegSettings) -> Self {
        Self {
            settings,
            prober: None,
        }
    }

    /// Probe sources for their duration so progress can be reported as a
    /// percentage. Without a prober progress is only reported at the end.
    pub fn with_prober(mut self, prober: Arc<dyn MediaProber>) -> Self {
        self.prober = Some(prober);
        self
    }

    async fn source_duration(&self, source: &Path) -> Option<Duration> {
        let prober = self.prober.as_ref()?;
        match prober.probe(source).await {
            Ok(report) => report.duration,
            Err(err) => {
                convq_debug!("Probe before conversion failed for {:?}: {}", source, err);
                None
            }
        }
    }

    fn spawn(&self, request: &ConversionRequest) -> Result<Child, ConversionError> {
        let args = build_args(&self.settings, request);
        convq_debug!("ffmpeg args: {:?}", args);
        Command::new(&self.settings.ffmpeg_path)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|err| {
                if err.kind() == std::io::ErrorKind::NotFound {
                    ConversionError::new(
                        FailureKind::ToolNotFound {
                            tool: self.settings.ffmpeg_path.display().to_string(),
                        },
                        err.to_string(),
                    )
                } else {
                    ConversionError::new(FailureKind::Spawn, err.to_string())
                }
            })
    }
}

#[async_trait::async_trait]
impl ConversionBackend for FfmpegBackend {
    async fn convert(
        &self,
        token: JobToken,
        request: &ConversionRequest,
        sink: &dyn ProgressSink,
        cancel: CancellationToken,
    ) -> Result<ConversionOutcome, ConversionError> {
        if !request.source.exists() {
            return Err(ConversionError::new(
                FailureKind::SourceMissing,
                request.source.display().to_string(),
            ));
        }
        prepare_destination(&request.destination)
            .map_err(|err| ConversionError::new(FailureKind::DestinationUnavailable, err.to_string()))?;

        let duration = self.source_duration(&request.source).await;
        let started = Instant::now();
        let mut child = self.spawn(request)?;
        convq_info!(
            "ffmpeg started for token {}: {:?} -> {:?}",
            token,
            request.source,
            request.destination
        );

        let stderr_tail = child.stderr.take().map(|stderr| tokio::spawn(read_tail(stderr)));
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| ConversionError::new(FailureKind::Io, "ffmpeg stdout not captured"))?;
        let mut lines = BufReader::new(stdout).lines();
        let mut parser = ProgressParser::new(duration);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    return Err(kill_cancelled(&mut child, token).await);
                }
                line = lines.next_line() => match line {
                    Ok(Some(line)) => {
                        if let Some(percent) = parser.feed(&line) {
                            sink.emit(EngineEvent::Progress { token, percent });
                        }
                    }
                    Ok(None) => break,
                    Err(err) => {
                        convq_warn!("Reading ffmpeg progress failed: {}", err);
                        break;
                    }
                },
            }
        }

        let waited = tokio::select! {
            _ = cancel.cancelled() => None,
            status = child.wait() => Some(status),
        };
        let status = match waited {
            Some(status) => {
                status.map_err(|err| ConversionError::new(FailureKind::Io, err.to_string()))?
            }
            None => return Err(kill_cancelled(&mut child, token).await),
        };

        let tail = match stderr_tail {
            Some(handle) => handle.await.unwrap_or_default(),
            None => String::new(),
        };

        if !status.success() {
            convq_warn!("ffmpeg failed for token {}: {}", token, tail);
            return Err(ConversionError::new(FailureKind::ExitStatus(status.code()), tail));
        }

        sink.emit(EngineEvent::Progress {
            token,
            percent: 100,
        });
        Ok(ConversionOutcome {
            destination: request.destination.clone(),
            elapsed: started.elapsed(),
        })
    }
}

async fn kill_cancelled(child: &mut Child, token: JobToken) -> ConversionError {
    if let Err(err) = child.kill().await {
        convq_warn!("Killing ffmpeg for token {} failed: {}", token, err);
    }
    convq_info!("ffmpeg cancelled for token {}", token);
    ConversionError::new(FailureKind::Cancelled, "conversion aborted")
}

async fn read_tail(stream: impl AsyncRead + Unpin) -> String {
    let mut lines = BufReader::new(stream).lines();
    let mut tail = VecDeque::with_capacity(STDERR_TAIL_LINES);
    while let Ok(Some(line)) = lines.next_line().await {
        if tail.len() == STDERR_TAIL_LINES {
            tail.pop_front();
        }
        tail.push_back(line);
    }
    Vec::from(tail).join("\n")
}

/// `ffmpeg` command line for `request`.
///
/// `-f` is only passed when the requested format differs from the
/// destination's extension, so `mp4` into `x.mp4` relies on ffmpeg's own
/// guess while `matroska` into `x.mkv` forces the muxer.
pub fn build_args(settings: &FfmpegSettings, request: &ConversionRequest) -> Vec<String> {
    let mut args: Vec<String> = vec![
        "-hide_banner".into(),
        "-nostdin".into(),
        if settings.overwrite { "-y" } else { "-n" }.into(),
        "-progress".into(),
        "pipe:1".into(),
        "-nostats".into(),
    ];
    args.extend(settings.global_args.iter().cloned());
    args.push("-i".into());
    args.push(request.source.to_string_lossy().into_owned());
    args.extend(request.options.iter().cloned());

    let format = request.format.trim();
    let extension = request
        .destination
        .extension()
        .map(|ext| ext.to_string_lossy().into_owned())
        .unwrap_or_default();
    if !format.is_empty() && !format.eq_ignore_ascii_case(&extension) {
        args.push("-f".into());
        args.push(format.to_string());
    }
    args.push(request.destination.to_string_lossy().into_owned());
    args
}

/// Turns `-progress` key/value blocks into percentages.
///
/// A block ends with a `progress=continue` or `progress=end` line; only then
/// is a value emitted, and only when it changed.
#[derive(Debug, Clone)]
pub struct ProgressParser {
    duration: Option<Duration>,
    out_time_us: Option<i64>,
    last_percent: Option<u8>,
}

impl ProgressParser {
    pub fn new(duration: Option<Duration>) -> Self {
        Self {
            duration,
            out_time_us: None,
            last_percent: None,
        }
    }

    pub fn feed(&mut self, line: &str) -> Option<u8> {
        let line = line.trim();
        if let Some(value) = line.strip_prefix("out_time_us=") {
            self.out_time_us = value.trim().parse::<i64>().ok();
            return None;
        }
        let state = line.strip_prefix("progress=")?;
        let percent = match state {
            "end" => 100,
            _ => self.percent()?,
        };
        if self.last_percent == Some(percent) {
            return None;
        }
        self.last_percent = Some(percent);
        Some(percent)
    }

    fn percent(&self) -> Option<u8> {
        let total = self.duration?.as_secs_f64();
        if total <= 0.0 {
            return None;
        }
        let elapsed = self.out_time_us?.max(0) as f64 / 1_000_000.0;
        let ratio = (elapsed / total).clamp(0.0, 1.0);
        // 100 is reserved for the end block.
        Some(((ratio * 100.0).floor() as u8).min(99))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(destination: &str, format: &str) -> ConversionRequest {
        ConversionRequest {
            source: PathBuf::from("/in/clip.avi"),
            destination: PathBuf::from(destination),
            format: format.to_string(),
            options: vec!["-c:a".to_string(), "copy".to_string()],
        }
    }

    #[test]
    fn args_skip_format_when_extension_matches() {
        let args = build_args(&FfmpegSettings::default(), &request("/out/clip.mp4", "MP4"));
        assert_eq!(
            args,
            vec![
                "-hide_banner",
                "-nostdin",
                "-y",
                "-progress",
                "pipe:1",
                "-nostats",
                "-i",
                "/in/clip.avi",
                "-c:a",
                "copy",
                "/out/clip.mp4",
            ]
        );
    }

    #[test]
    fn args_force_format_and_keep_global_args_before_input() {
        let settings = FfmpegSettings {
            global_args: vec!["-hwaccel".to_string(), "auto".to_string()],
            overwrite: false,
            ..FfmpegSettings::default()
        };
        let args = build_args(&settings, &request("/out/clip.mkv", "matroska"));
        assert_eq!(args[2], "-n");
        let input = args.iter().position(|arg| arg == "-i").unwrap();
        let hwaccel = args.iter().position(|arg| arg == "-hwaccel").unwrap();
        assert!(hwaccel < input);
        assert_eq!(
            &args[args.len() - 3..],
            &["-f".to_string(), "matroska".to_string(), "/out/clip.mkv".to_string()]
        );
    }

    #[test]
    fn progress_blocks_become_percentages() {
        let mut parser = ProgressParser::new(Some(Duration::from_secs(10)));
        assert_eq!(parser.feed("frame=10"), None);
        assert_eq!(parser.feed("out_time_us=2500000"), None);
        assert_eq!(parser.feed("progress=continue"), Some(25));
        // Unchanged value is not repeated.
        assert_eq!(parser.feed("out_time_us=2500000"), None);
        assert_eq!(parser.feed("progress=continue"), None);
        assert_eq!(parser.feed("out_time_us=20000000"), None);
        assert_eq!(parser.feed("progress=continue"), Some(99));
        assert_eq!(parser.feed("progress=end"), Some(100));
    }

    #[test]
    fn unknown_duration_only_reports_the_end() {
        let mut parser = ProgressParser::new(None);
        assert_eq!(parser.feed("out_time_us=1000000"), None);
        assert_eq!(parser.feed("progress=continue"), None);
        assert_eq!(parser.feed("progress=end"), Some(100));
    }

    #[test]
    fn negative_out_time_counts_as_zero() {
        let mut parser = ProgressParser::new(Some(Duration::from_secs(4)));
        parser.feed("out_time_us=-9223372036854775807");
        assert_eq!(parser.feed("progress=continue"), Some(0));
    }
}
