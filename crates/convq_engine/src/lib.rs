//! convq engine: converter and media-prober adapters behind a command channel.
mod backend;
mod engine;
mod ffmpeg;
mod output;
mod probe;
mod types;

pub use backend::{ChannelProgressSink, ConversionBackend, ProgressSink};
pub use engine::EngineHandle;
pub use ffmpeg::{build_args, FfmpegBackend, FfmpegSettings, ProgressParser};
pub use output::{ensure_output_dir, prepare_destination, OutputError};
pub use probe::{parse_ffprobe_json, FfprobeProber, MediaProber, ProbeError, ProbeReport};
pub use types::{
    ConversionError, ConversionOutcome, ConversionRequest, EngineEvent, FailureKind, JobId,
    JobToken,
};
