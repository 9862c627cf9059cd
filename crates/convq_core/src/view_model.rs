use std::time::Duration;

use crate::{JobId, Task, TaskStatus};

/// Outcome of the last bulk import.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ImportStats {
    pub added: usize,
    pub rejected: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct QueueViewModel {
    pub busy: bool,
    pub job_count: usize,
    pub rows: Vec<TaskRowView>,
    pub last_import: Option<ImportStats>,
    pub dirty: bool,
}

impl QueueViewModel {
    pub fn count_with(&self, status: TaskStatus) -> usize {
        self.rows.iter().filter(|row| row.status == status).count()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskRowView {
    pub job_id: JobId,
    pub source_name: String,
    pub destination: String,
    pub format: String,
    pub status: TaskStatus,
    pub progress: Option<u8>,
    pub duration: Option<Duration>,
}

impl TaskRowView {
    pub(crate) fn from_task(task: &Task) -> Self {
        let parameters = task.parameters();
        Self {
            job_id: task.id(),
            source_name: parameters.source_name(),
            destination: parameters.destination.display().to_string(),
            format: parameters.format.clone(),
            status: task.status(),
            progress: task.progress(),
            duration: task.media().and_then(|media| media.duration),
        }
    }
}
