use std::fmt;
use std::time::Duration;

use crate::ConversionParameters;

pub type JobId = u64;

/// Identifies one dispatch of a job to the converter engine.
///
/// Tokens come from a monotonically increasing counter and are never reused,
/// so a callback carrying an older token can always be told apart from the
/// current dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DispatchToken(u64);

impl DispatchToken {
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for DispatchToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TaskStatus {
    #[default]
    Queued,
    Running,
    Finished,
    Failed,
}

/// Every status change a task can go through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Handed to the engine.
    Dispatch,
    /// Engine reported success.
    Succeed,
    /// Engine reported failure.
    Fail,
    /// Dispatch withdrawn by an explicit stop.
    Revert,
    /// User asked for another attempt.
    Retry,
}

impl TaskStatus {
    /// The single rule table for status changes. `None` means the transition
    /// does not apply to the current status and the task must stay as is.
    pub fn transition(self, transition: Transition) -> Option<TaskStatus> {
        use TaskStatus::*;
        match (self, transition) {
            (Queued, Transition::Dispatch) => Some(Running),
            (Running, Transition::Succeed) => Some(Finished),
            (Running, Transition::Fail) => Some(Failed),
            (Running, Transition::Revert) => Some(Queued),
            (Finished | Failed, Transition::Retry) => Some(Queued),
            _ => None,
        }
    }

    pub fn is_removable(self) -> bool {
        self != TaskStatus::Running
    }

    pub fn is_editable(self) -> bool {
        self != TaskStatus::Running
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            TaskStatus::Queued => "queued",
            TaskStatus::Running => "running",
            TaskStatus::Finished => "finished",
            TaskStatus::Failed => "failed",
        };
        f.write_str(label)
    }
}

/// What the media prober found out about a task's source.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MediaSummary {
    pub duration: Option<Duration>,
    pub container: Option<String>,
    pub video_codec: Option<String>,
    pub audio_codec: Option<String>,
}

/// Outcome of one engine attempt as seen by the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptOutcome {
    Success,
    Failure,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    pub(crate) id: JobId,
    pub(crate) status: TaskStatus,
    pub(crate) parameters: ConversionParameters,
    pub(crate) progress: Option<u8>,
    pub(crate) media: Option<MediaSummary>,
}

impl Task {
    pub(crate) fn new(id: JobId, parameters: ConversionParameters) -> Self {
        Self {
            id,
            status: TaskStatus::Queued,
            parameters,
            progress: None,
            media: None,
        }
    }

    pub fn id(&self) -> JobId {
        self.id
    }

    pub fn status(&self) -> TaskStatus {
        self.status
    }

    pub fn parameters(&self) -> &ConversionParameters {
        &self.parameters
    }

    pub fn progress(&self) -> Option<u8> {
        self.progress
    }

    pub fn media(&self) -> Option<&MediaSummary> {
        self.media.as_ref()
    }

    /// Applies `transition` if the rule table allows it. Returns whether the
    /// status changed.
    pub(crate) fn apply(&mut self, transition: Transition) -> bool {
        match self.status.transition(transition) {
            Some(next) => {
                self.status = next;
                match transition {
                    Transition::Dispatch | Transition::Retry | Transition::Revert => {
                        self.progress = None;
                    }
                    Transition::Succeed => self.progress = Some(100),
                    Transition::Fail => {}
                }
                true
            }
            None => false,
        }
    }
}
