use crate::{Effect, JobId, TaskStatus};

/// Observer of the queue's outward notifications.
///
/// All methods default to no-ops so listeners only implement what they need.
pub trait QueueListener {
    fn task_finished(&mut self, _job_id: JobId, _status: TaskStatus) {}
    fn all_tasks_finished(&mut self) {}
    fn row_removed(&mut self, _job_id: JobId) {}
}

/// Forwards the notification effects in `effects` to `listener`, in order.
/// Non-notification effects are ignored.
pub fn notify(effects: &[Effect], listener: &mut dyn QueueListener) {
    for effect in effects {
        match effect {
            Effect::TaskFinished { job_id, status } => listener.task_finished(*job_id, *status),
            Effect::AllTasksFinished => listener.all_tasks_finished(),
            Effect::RowRemoved { job_id } => listener.row_removed(*job_id),
            Effect::BeginConversion { .. }
            | Effect::AbortConversion { .. }
            | Effect::ProbeSource { .. }
            | Effect::OpenParameterEditor { .. } => {}
        }
    }
}
