use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::probe::{ProbeError, ProbeReport};

pub type JobId = u64;

/// Dispatch token chosen by the caller; echoed back on every event.
pub type JobToken = u64;

/// One conversion handed to the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionRequest {
    pub source: PathBuf,
    pub destination: PathBuf,
    pub format: String,
    pub options: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionOutcome {
    pub destination: PathBuf,
    pub elapsed: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    Progress {
        token: JobToken,
        percent: u8,
    },
    Finished {
        token: JobToken,
        result: Result<ConversionOutcome, ConversionError>,
    },
    Probed {
        job_id: JobId,
        result: Result<ProbeReport, ProbeError>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {message}")]
pub struct ConversionError {
    pub kind: FailureKind,
    pub message: String,
}

impl ConversionError {
    pub(crate) fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    SourceMissing,
    DestinationUnavailable,
    ToolNotFound { tool: String },
    Spawn,
    ExitStatus(Option<i32>),
    Cancelled,
    Io,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::SourceMissing => write!(f, "source missing"),
            FailureKind::DestinationUnavailable => write!(f, "destination unavailable"),
            FailureKind::ToolNotFound { tool } => write!(f, "{tool} not found"),
            FailureKind::Spawn => write!(f, "failed to spawn converter"),
            FailureKind::ExitStatus(Some(code)) => write!(f, "converter exited with status {code}"),
            FailureKind::ExitStatus(None) => write!(f, "converter killed by signal"),
            FailureKind::Cancelled => write!(f, "cancelled"),
            FailureKind::Io => write!(f, "io error"),
        }
    }
}
