use std::collections::BTreeMap;
use std::time::Duration;

use convq_core::{JobId, QueueListener, QueueViewModel, Task, TaskRowView, TaskStatus};

/// One-line summary of the queue, printed when the queue changed.
pub fn status_line(view: &QueueViewModel) -> String {
    let mut line = format!(
        "{} | Jobs: {} (queued {}, finished {}, failed {})",
        if view.busy { "Running" } else { "Idle" },
        view.job_count,
        view.count_with(TaskStatus::Queued),
        view.count_with(TaskStatus::Finished),
        view.count_with(TaskStatus::Failed),
    );
    if let Some(row) = view
        .rows
        .iter()
        .find(|row| row.status == TaskStatus::Running)
    {
        line.push_str(&format!(
            " | job {} {} {}",
            row.job_id,
            row.source_name,
            format_progress(row.progress)
        ));
    }
    if let Some(stats) = &view.last_import {
        if stats.rejected > 0 {
            line.push_str(&format!(
                " | last add: {} added, {} rejected",
                stats.added, stats.rejected
            ));
        }
    }
    line
}

pub fn table(view: &QueueViewModel) -> Vec<String> {
    if view.rows.is_empty() {
        return vec!["(queue is empty)".to_string()];
    }
    let mut lines = Vec::with_capacity(view.rows.len() + 1);
    lines.push(format!(
        "{:>4}  {:<8}  {:>5}  {:>8}  {}",
        "id", "status", "done", "length", "source -> destination"
    ));
    lines.extend(view.rows.iter().map(table_row));
    lines
}

fn table_row(row: &TaskRowView) -> String {
    format!(
        "{:>4}  {:<8}  {:>5}  {:>8}  {} -> {} [{}]",
        row.job_id,
        row.status.to_string(),
        format_progress(row.progress),
        row.duration.map(format_duration).unwrap_or_else(|| "-".into()),
        row.source_name,
        row.destination,
        row.format
    )
}

fn format_progress(progress: Option<u8>) -> String {
    match progress {
        Some(percent) => format!("{percent}%"),
        None => "-".to_string(),
    }
}

/// `m:ss`, or `h:mm:ss` from one hour up.
pub fn format_duration(duration: Duration) -> String {
    let total = duration.as_secs();
    let (hours, minutes, seconds) = (total / 3600, (total % 3600) / 60, total % 60);
    if hours > 0 {
        format!("{hours}:{minutes:02}:{seconds:02}")
    } else {
        format!("{minutes}:{seconds:02}")
    }
}

/// Console side of the queue notifications.
///
/// Keeps the job id to row label relation that a list widget would hold, and
/// turns notifications into printable lines.
#[derive(Debug, Default)]
pub struct ConsoleListener {
    rows: BTreeMap<JobId, String>,
    lines: Vec<String>,
}

impl ConsoleListener {
    /// Registers rows for tasks the listener has not seen yet.
    pub fn track(&mut self, tasks: &[Task]) {
        for task in tasks {
            self.rows
                .entry(task.id())
                .or_insert_with(|| task.parameters().source_name());
        }
    }

    pub fn take_lines(&mut self) -> Vec<String> {
        std::mem::take(&mut self.lines)
    }

    fn label(&self, job_id: JobId) -> String {
        match self.rows.get(&job_id) {
            Some(name) => format!("job {job_id} ({name})"),
            None => format!("job {job_id}"),
        }
    }
}

impl QueueListener for ConsoleListener {
    fn task_finished(&mut self, job_id: JobId, status: TaskStatus) {
        let line = format!("{} {}", self.label(job_id), status);
        self.lines.push(line);
    }

    fn all_tasks_finished(&mut self) {
        self.lines.push("All tasks finished".to_string());
    }

    fn row_removed(&mut self, job_id: JobId) {
        let line = format!("Removed {}", self.label(job_id));
        self.rows.remove(&job_id);
        self.lines.push(line);
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use convq_core::{
        notify, update, AttemptOutcome, ConversionParameters, DispatchToken, Msg, QueueState,
        Selection,
    };
    use pretty_assertions::assert_eq;

    use super::*;

    fn queue_of(names: &[&str]) -> QueueState {
        let batch = names
            .iter()
            .map(|name| ConversionParameters::for_source(*name, Path::new("out"), "mp3"))
            .collect();
        update(QueueState::new(), Msg::AddTasks(batch)).0
    }

    #[test]
    fn durations_are_compact() {
        assert_eq!(format_duration(Duration::from_secs(59)), "0:59");
        assert_eq!(format_duration(Duration::from_secs(754)), "12:34");
        assert_eq!(format_duration(Duration::from_secs(3723)), "1:02:03");
    }

    #[test]
    fn status_line_names_the_running_job() {
        let (state, _) = update(queue_of(&["a.wav", "b.wav"]), Msg::StartClicked);
        let (state, _) = update(
            state,
            Msg::ConversionProgress {
                token: DispatchToken::new(1),
                percent: 42,
            },
        );
        assert_eq!(
            status_line(&state.view()),
            "Running | Jobs: 2 (queued 1, finished 0, failed 0) | job 1 a.wav 42%"
        );
    }

    #[test]
    fn table_lists_every_row() {
        let lines = table(&queue_of(&["a.wav", "b.wav"]).view());
        assert_eq!(lines.len(), 3);
        assert!(lines[1].contains("queued"));
        assert!(lines[2].contains("b.wav -> out/b.mp3 [mp3]"));
        assert_eq!(table(&QueueState::new().view()), vec!["(queue is empty)"]);
    }

    #[test]
    fn listener_forgets_removed_rows() {
        let state = queue_of(&["a.wav", "b.wav"]);
        let mut listener = ConsoleListener::default();
        listener.track(state.tasks());

        let (state, effects) = update(state, Msg::RemoveSelected(Selection::new([2])));
        notify(&effects, &mut listener);
        listener.row_removed(2);

        let (state, _) = update(state, Msg::StartClicked);
        let (_, effects) = update(
            state,
            Msg::ConversionFinished {
                token: DispatchToken::new(1),
                outcome: AttemptOutcome::Failure,
            },
        );
        notify(&effects, &mut listener);
        assert_eq!(
            listener.take_lines(),
            vec![
                "Removed job 2 (b.wav)".to_string(),
                "Removed job 2".to_string(),
                "job 1 (a.wav) failed".to_string(),
                "All tasks finished".to_string(),
            ]
        );
        assert!(listener.take_lines().is_empty());
    }
}
