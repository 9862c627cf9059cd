use convq_logging::{convq_debug, convq_warn};

use crate::{Effect, JobId, Msg, QueueState};

/// Pure update function: applies a message to state and returns any effects.
pub fn update(mut state: QueueState, msg: Msg) -> (QueueState, Vec<Effect>) {
    let effects = match msg {
        Msg::AddTasks(batch) => {
            let added = state.import_tasks(batch);
            added
                .into_iter()
                .filter_map(|job_id| {
                    state.task(job_id).map(|task| Effect::ProbeSource {
                        job_id,
                        source: task.parameters().source.clone(),
                    })
                })
                .collect()
        }
        Msg::RemoveTask(job_id) => {
            if state.remove_task(job_id) {
                vec![Effect::RowRemoved { job_id }]
            } else {
                Vec::new()
            }
        }
        Msg::RemoveSelected(selection) => rows_removed(state.remove_selected(&selection)),
        Msg::RemoveCompleted => rows_removed(state.remove_completed()),
        Msg::Clear => rows_removed(state.clear()),
        Msg::RetrySelected(selection) => state.retry_selected(&selection).into_iter().collect(),
        Msg::RetryAll => state.retry_all().into_iter().collect(),
        Msg::EditSelected(selection) => state.edit_request(&selection).into_iter().collect(),
        Msg::ParametersEdited {
            targets,
            parameters,
        } => {
            match state.apply_parameters(&targets, &parameters) {
                Ok(edited) => convq_debug!("Edited parameters of {} task(s)", edited),
                Err(err) => convq_warn!("Rejected parameter edit: {}", err),
            }
            Vec::new()
        }
        Msg::StartClicked => state.start().into_iter().collect(),
        Msg::StopClicked => state.stop().into_iter().collect(),
        Msg::ConversionProgress { token, percent } => {
            state.apply_progress(token, percent);
            Vec::new()
        }
        Msg::ConversionFinished { token, outcome } => state.apply_finished(token, outcome),
        Msg::ProbeCompleted { job_id, media } => {
            if let Some(media) = media {
                state.apply_probe(job_id, media);
            }
            Vec::new()
        }
        Msg::EditCancelled | Msg::Tick | Msg::NoOp => Vec::new(),
    };

    debug_assert!(state.invariants_hold(), "queue invariants violated");
    (state, effects)
}

fn rows_removed(removed: Vec<JobId>) -> Vec<Effect> {
    removed
        .into_iter()
        .map(|job_id| Effect::RowRemoved { job_id })
        .collect()
}
