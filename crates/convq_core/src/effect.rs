use std::path::PathBuf;

use crate::{ConversionParameters, DispatchToken, JobId, Selection, TaskStatus};

/// Work the outside world has to do after an update, in emission order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Hand a job to the converter engine.
    BeginConversion {
        job_id: JobId,
        token: DispatchToken,
        parameters: ConversionParameters,
    },
    /// Ask the engine to abandon a dispatch. Best effort.
    AbortConversion { job_id: JobId, token: DispatchToken },
    /// Optional media probe for a freshly added task.
    ProbeSource { job_id: JobId, source: PathBuf },
    /// Show the parameter editor seeded with the first target's parameters.
    OpenParameterEditor {
        targets: Selection,
        seed: ConversionParameters,
    },
    /// A record was deleted; the presentation layer drops its row.
    RowRemoved { job_id: JobId },
    /// One attempt ended. `status` tells success (`Finished`) from `Failed`.
    TaskFinished { job_id: JobId, status: TaskStatus },
    /// The queue ran dry after the last attempt.
    AllTasksFinished,
}

impl Effect {
    /// True for the effects that make up the outward notification stream.
    pub fn is_notification(&self) -> bool {
        matches!(
            self,
            Effect::RowRemoved { .. } | Effect::TaskFinished { .. } | Effect::AllTasksFinished
        )
    }
}
