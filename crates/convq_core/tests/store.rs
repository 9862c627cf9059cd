use std::collections::HashSet;
use std::sync::Once;

use convq_core::{
    update, ConversionParameters, Effect, ImportStats, Msg, ParameterError, QueueState, Selection,
    TaskStatus,
};
use pretty_assertions::assert_eq;

fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(convq_logging::initialize_for_tests);
}

fn params(name: &str) -> ConversionParameters {
    ConversionParameters::new(format!("/in/{name}.avi"), format!("/out/{name}.mkv"), "matroska")
}

#[test]
fn add_task_appends_queued_record_with_fresh_id() {
    init_logging();
    let mut state = QueueState::new();
    let first = state.add_task(params("a")).unwrap();
    let second = state.add_task(params("b")).unwrap();

    assert_eq!((first, second), (1, 2));
    assert_eq!(state.count(), 2);
    assert!(!state.is_empty());
    assert_eq!(state.status_of(first), Some(TaskStatus::Queued));
    let order: Vec<_> = state.tasks().iter().map(|task| task.id()).collect();
    assert_eq!(order, vec![1, 2]);
}

#[test]
fn add_task_rejects_structurally_invalid_parameters() {
    init_logging();
    let mut state = QueueState::new();
    let err = state
        .add_task(ConversionParameters::new("", "/out/x.mkv", "matroska"))
        .unwrap_err();
    assert_eq!(err, ParameterError::MissingSource);
    assert!(state.is_empty());
}

#[test]
fn add_tasks_counts_successes_and_skips_invalid_entries() {
    init_logging();
    let mut state = QueueState::new();
    let added = state.add_tasks(vec![
        params("a"),
        ConversionParameters::new("/in/b.avi", "/out/b.mkv", ""),
        params("c"),
    ]);

    assert_eq!(added, 2);
    assert_eq!(state.count(), 2);
    assert_eq!(
        state.last_import(),
        Some(&ImportStats {
            added: 2,
            rejected: 1
        })
    );
}

#[test]
fn add_tasks_message_requests_a_probe_per_added_task() {
    init_logging();
    let (state, effects) = update(
        QueueState::new(),
        Msg::AddTasks(vec![params("a"), ConversionParameters::new("", "", ""), params("b")]),
    );

    assert_eq!(state.count(), 2);
    assert_eq!(
        effects,
        vec![
            Effect::ProbeSource {
                job_id: 1,
                source: "/in/a.avi".into(),
            },
            Effect::ProbeSource {
                job_id: 2,
                source: "/in/b.avi".into(),
            },
        ]
    );
    assert_eq!(state.view().last_import.unwrap().rejected, 1);
}

#[test]
fn ids_are_never_reused_after_removal() {
    init_logging();
    let mut state = QueueState::new();
    let mut seen = HashSet::new();
    for round in 0..5 {
        let id = state.add_task(params(&format!("job{round}"))).unwrap();
        assert!(seen.insert(id), "id {id} handed out twice");
        assert!(state.remove_task(id));
    }
    state.add_tasks((0..3).map(|n| params(&format!("more{n}"))));
    state.clear();
    let id = state.add_task(params("last")).unwrap();
    assert!(seen.insert(id));
    assert_eq!(id, 9);
}

#[test]
fn remove_task_refuses_running_record() {
    init_logging();
    let mut state = QueueState::new();
    let a = state.add_task(params("a")).unwrap();
    let b = state.add_task(params("b")).unwrap();
    state.start();

    assert!(!state.remove_task(a));
    assert_eq!(state.status_of(a), Some(TaskStatus::Running));
    assert!(state.remove_task(b));
    assert!(!state.remove_task(b));
    assert_eq!(state.count(), 1);
}

#[test]
fn remove_task_message_signals_row_removal_only_on_success() {
    init_logging();
    let (state, _) = update(QueueState::new(), Msg::AddTasks(vec![params("a"), params("b")]));
    let (state, _) = update(state, Msg::StartClicked);

    let (state, effects) = update(state, Msg::RemoveTask(1));
    assert!(effects.is_empty());
    assert_eq!(state.count(), 2);

    let (state, effects) = update(state, Msg::RemoveTask(2));
    assert_eq!(effects, vec![Effect::RowRemoved { job_id: 2 }]);
    assert_eq!(state.count(), 1);

    let (_state, effects) = update(state, Msg::RemoveTask(42));
    assert!(effects.is_empty());
}

#[test]
fn selected_count_ignores_unknown_ids() {
    init_logging();
    let mut state = QueueState::new();
    state.add_tasks(vec![params("a"), params("b"), params("c")]);

    let selection = Selection::new([3, 1, 99, 3]);
    assert_eq!(selection.len(), 3);
    assert_eq!(state.selected_count(&selection), 2);
    assert_eq!(state.selected_count(&Selection::empty()), 0);
}

#[test]
fn parameters_for_uses_first_selected_record() {
    init_logging();
    let mut state = QueueState::new();
    state.add_tasks(vec![params("a"), params("b")]);

    assert_eq!(state.parameters_for(&Selection::new([2, 1])), Some(&params("b")));
    assert_eq!(state.current_parameters(&Selection::new([1])), Some(&params("a")));
    assert_eq!(state.parameters_for(&Selection::empty()), None);
    assert_eq!(state.parameters_for(&Selection::new([7])), None);
}

#[test]
fn parameters_for_skips_ids_no_longer_stored() {
    init_logging();
    let mut state = QueueState::new();
    state.add_tasks(vec![params("a"), params("b")]);
    assert!(state.remove_task(1));

    assert_eq!(state.parameters_for(&Selection::new([9, 1, 2])), Some(&params("b")));
    let (_, effects) = update(state, Msg::EditSelected(Selection::new([9, 2])));
    assert_eq!(
        effects,
        vec![Effect::OpenParameterEditor {
            targets: Selection::new([9, 2]),
            seed: params("b"),
        }]
    );
}

#[test]
fn probe_results_annotate_existing_tasks_only() {
    init_logging();
    let (state, _) = update(QueueState::new(), Msg::AddTasks(vec![params("a")]));
    let media = convq_core::MediaSummary {
        duration: Some(std::time::Duration::from_secs(90)),
        container: Some("avi".to_string()),
        video_codec: Some("mpeg4".to_string()),
        audio_codec: None,
    };

    let (state, effects) = update(
        state,
        Msg::ProbeCompleted {
            job_id: 1,
            media: Some(media.clone()),
        },
    );
    assert!(effects.is_empty());
    assert_eq!(state.task(1).unwrap().media(), Some(&media));
    assert_eq!(
        state.view().rows[0].duration,
        Some(std::time::Duration::from_secs(90))
    );

    let (state, _) = update(
        state,
        Msg::ProbeCompleted {
            job_id: 1,
            media: None,
        },
    );
    assert_eq!(state.task(1).unwrap().media(), Some(&media));

    let (mut state, _) = update(
        state,
        Msg::ProbeCompleted {
            job_id: 5,
            media: Some(media),
        },
    );
    assert_eq!(state.count(), 1);
    assert!(state.consume_dirty());
}
