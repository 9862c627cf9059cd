use crate::{AttemptOutcome, ConversionParameters, DispatchToken, JobId, MediaSummary, Selection};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Msg {
    /// Bulk import (drag-and-drop, command line). Invalid entries are skipped.
    AddTasks(Vec<ConversionParameters>),
    /// Remove one task unless it is running.
    RemoveTask(JobId),
    /// Remove the selected tasks, quietly skipping the running one.
    RemoveSelected(Selection),
    /// Remove every finished task.
    RemoveCompleted,
    /// Remove everything except the running task.
    Clear,
    /// Re-queue selected finished/failed tasks.
    RetrySelected(Selection),
    /// Re-queue every finished/failed task.
    RetryAll,
    /// User asked to edit the parameters of the selected tasks.
    EditSelected(Selection),
    /// Parameter editor confirmed.
    ParametersEdited {
        targets: Selection,
        parameters: ConversionParameters,
    },
    /// Parameter editor dismissed.
    EditCancelled,
    /// User clicked Start.
    StartClicked,
    /// User clicked Stop.
    StopClicked,
    /// Engine progress for a dispatch.
    ConversionProgress { token: DispatchToken, percent: u8 },
    /// Engine completion for a dispatch.
    ConversionFinished {
        token: DispatchToken,
        outcome: AttemptOutcome,
    },
    /// Media prober result; `None` when probing failed.
    ProbeCompleted {
        job_id: JobId,
        media: Option<MediaSummary>,
    },
    /// UI/render tick to coalesce rendering.
    Tick,
    /// Fallback for placeholder wiring.
    NoOp,
}
