use std::sync::Once;

use convq_core::{
    update, AttemptOutcome, ConversionParameters, DispatchToken, Effect, JobId, Msg, QueueState,
    TaskStatus,
};
use pretty_assertions::assert_eq;

fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(convq_logging::initialize_for_tests);
}

fn params(name: &str) -> ConversionParameters {
    ConversionParameters::new(format!("/in/{name}.wav"), format!("/out/{name}.mp3"), "mp3")
}

fn queue_of(names: &[&str]) -> QueueState {
    let batch = names.iter().map(|name| params(name)).collect();
    let (state, _) = update(QueueState::new(), Msg::AddTasks(batch));
    state
}

fn begin_of(effects: &[Effect]) -> Option<(JobId, DispatchToken)> {
    effects.iter().find_map(|effect| match effect {
        Effect::BeginConversion { job_id, token, .. } => Some((*job_id, *token)),
        _ => None,
    })
}

fn finish(state: QueueState, token: DispatchToken, outcome: AttemptOutcome) -> (QueueState, Vec<Effect>) {
    update(state, Msg::ConversionFinished { token, outcome })
}

#[test]
fn start_without_queued_tasks_stays_idle() {
    init_logging();
    let (state, effects) = update(QueueState::new(), Msg::StartClicked);
    assert!(!state.is_busy());
    assert!(effects.is_empty());

    let state = queue_of(&["a"]);
    let (state, effects) = update(state, Msg::StartClicked);
    let (_, token) = begin_of(&effects).unwrap();
    let (state, _) = finish(state, token, AttemptOutcome::Success);
    let (state, effects) = update(state, Msg::StartClicked);
    assert!(!state.is_busy());
    assert!(effects.is_empty());
}

#[test]
fn start_dispatches_first_queued_task() {
    init_logging();
    let state = queue_of(&["a", "b"]);
    let (state, effects) = update(state, Msg::StartClicked);

    assert_eq!(
        effects,
        vec![Effect::BeginConversion {
            job_id: 1,
            token: DispatchToken::new(1),
            parameters: params("a"),
        }]
    );
    assert!(state.is_busy());
    assert_eq!(state.status_of(1), Some(TaskStatus::Running));
    assert_eq!(state.status_of(2), Some(TaskStatus::Queued));
    assert!(state.invariants_hold());
}

#[test]
fn start_while_running_is_noop() {
    init_logging();
    let state = queue_of(&["a", "b"]);
    let (state, _) = update(state, Msg::StartClicked);
    let before = state.clone();

    let (state, effects) = update(state, Msg::StartClicked);
    assert!(effects.is_empty());
    assert_eq!(state, before);
}

#[test]
fn success_advances_to_next_queued_task_without_start() {
    init_logging();
    let state = queue_of(&["a", "b"]);
    let (state, effects) = update(state, Msg::StartClicked);
    let (job_a, token_a) = begin_of(&effects).unwrap();

    let (state, effects) = finish(state, token_a, AttemptOutcome::Success);

    assert_eq!(state.status_of(job_a), Some(TaskStatus::Finished));
    assert_eq!(state.status_of(2), Some(TaskStatus::Running));
    assert!(state.is_busy());
    assert_eq!(
        effects[0],
        Effect::TaskFinished {
            job_id: job_a,
            status: TaskStatus::Finished
        }
    );
    let (next_job, next_token) = begin_of(&effects).unwrap();
    assert_eq!(next_job, 2);
    assert_ne!(next_token, token_a);
    assert_eq!(effects.len(), 2);
}

#[test]
fn failure_marks_failed_and_keeps_going() {
    init_logging();
    let state = queue_of(&["a", "b"]);
    let (state, effects) = update(state, Msg::StartClicked);
    let (_, token) = begin_of(&effects).unwrap();

    let (state, effects) = finish(state, token, AttemptOutcome::Failure);

    assert_eq!(state.status_of(1), Some(TaskStatus::Failed));
    assert_eq!(state.status_of(2), Some(TaskStatus::Running));
    assert_eq!(
        effects[0],
        Effect::TaskFinished {
            job_id: 1,
            status: TaskStatus::Failed
        }
    );
}

#[test]
fn last_completion_goes_idle_and_announces_drain() {
    init_logging();
    let state = queue_of(&["a"]);
    let (state, effects) = update(state, Msg::StartClicked);
    let (_, token) = begin_of(&effects).unwrap();

    let (state, effects) = finish(state, token, AttemptOutcome::Success);
    assert_eq!(
        effects,
        vec![
            Effect::TaskFinished {
                job_id: 1,
                status: TaskStatus::Finished
            },
            Effect::AllTasksFinished,
        ]
    );
    assert!(!state.is_busy());
    assert_eq!(state.current_dispatch(), None);
}

#[test]
fn stop_reverts_current_task_in_place_and_goes_idle() {
    init_logging();
    let state = queue_of(&["a", "b", "c"]);
    let (state, effects) = update(state, Msg::StartClicked);
    let (_, token) = begin_of(&effects).unwrap();

    let (state, effects) = update(state, Msg::StopClicked);

    assert_eq!(effects, vec![Effect::AbortConversion { job_id: 1, token }]);
    assert!(!state.is_busy());
    assert_eq!(state.status_of(1), Some(TaskStatus::Queued));
    assert_eq!(state.status_of(2), Some(TaskStatus::Queued));
    let order: Vec<_> = state.tasks().iter().map(|task| task.id()).collect();
    assert_eq!(order, vec![1, 2, 3]);
}

#[test]
fn stop_while_idle_is_noop() {
    init_logging();
    let state = queue_of(&["a"]);
    let (next, effects) = update(state.clone(), Msg::StopClicked);
    assert!(effects.is_empty());
    assert_eq!(next, state);
}

#[test]
fn stale_completion_after_stop_is_ignored() {
    init_logging();
    let state = queue_of(&["a", "b"]);
    let (state, effects) = update(state, Msg::StartClicked);
    let (_, old_token) = begin_of(&effects).unwrap();
    let (state, _) = update(state, Msg::StopClicked);
    let before = state.clone();

    let (state, effects) = finish(state, old_token, AttemptOutcome::Success);
    assert!(effects.is_empty());
    assert_eq!(state, before);
    assert_eq!(state.status_of(1), Some(TaskStatus::Queued));
}

#[test]
fn stale_completion_does_not_touch_newer_dispatch() {
    init_logging();
    let state = queue_of(&["a"]);
    let (state, effects) = update(state, Msg::StartClicked);
    let (_, old_token) = begin_of(&effects).unwrap();
    let (state, _) = update(state, Msg::StopClicked);
    let (state, effects) = update(state, Msg::StartClicked);
    let (job, new_token) = begin_of(&effects).unwrap();
    assert_eq!(job, 1);
    assert_ne!(new_token, old_token);

    let (state, effects) = finish(state, old_token, AttemptOutcome::Failure);
    assert!(effects.is_empty());
    assert_eq!(state.status_of(1), Some(TaskStatus::Running));
    assert_eq!(
        state.current_dispatch().map(|dispatch| dispatch.token),
        Some(new_token)
    );

    let (state, _) = update(
        state,
        Msg::ConversionProgress {
            token: old_token,
            percent: 80,
        },
    );
    assert_eq!(state.task(1).unwrap().progress(), None);

    let (state, effects) = finish(state, new_token, AttemptOutcome::Success);
    assert_eq!(state.status_of(1), Some(TaskStatus::Finished));
    assert_eq!(effects.last(), Some(&Effect::AllTasksFinished));
}

#[test]
fn progress_updates_current_record_without_status_change() {
    init_logging();
    let state = queue_of(&["a"]);
    let (state, effects) = update(state, Msg::StartClicked);
    let (_, token) = begin_of(&effects).unwrap();
    let (mut state, _) = update(state, Msg::Tick);
    state.consume_dirty();

    let (mut state, effects) = update(state, Msg::ConversionProgress { token, percent: 42 });
    assert!(effects.is_empty());
    assert_eq!(state.task(1).unwrap().progress(), Some(42));
    assert_eq!(state.status_of(1), Some(TaskStatus::Running));
    assert!(state.consume_dirty());

    let (mut state, _) = update(state, Msg::ConversionProgress { token, percent: 42 });
    assert!(!state.consume_dirty());

    let (state, _) = update(state, Msg::ConversionProgress { token, percent: 250 });
    assert_eq!(state.task(1).unwrap().progress(), Some(100));
}

#[test]
fn at_most_one_task_runs_through_a_busy_session() {
    init_logging();
    let mut state = queue_of(&["a", "b", "c", "d"]);
    let mut token = None;
    let script = [
        Msg::StartClicked,
        Msg::StartClicked,
        Msg::StopClicked,
        Msg::StartClicked,
        Msg::RetryAll,
        Msg::Clear,
        Msg::StartClicked,
    ];
    for msg in script {
        let (next, effects) = update(state, msg);
        state = next;
        if let Some((_, t)) = begin_of(&effects) {
            token = Some(t);
        }
        let running = state
            .tasks()
            .iter()
            .filter(|task| task.status() == TaskStatus::Running)
            .count();
        assert!(running <= 1);
        assert!(state.invariants_hold());
    }
    let token = token.unwrap();
    let (state, _) = finish(state, token, AttemptOutcome::Success);
    assert!(state.invariants_hold());
    assert_eq!(state.count(), 1);
    assert_eq!(state.status_of(1), Some(TaskStatus::Finished));
}
