use convq_logging::{convq_debug, convq_info, convq_warn};

use crate::task::Transition;
use crate::view_model::{ImportStats, QueueViewModel, TaskRowView};
use crate::{
    AttemptOutcome, ConversionParameters, DispatchToken, Effect, JobId, MediaSummary,
    ParameterError, Selection, SelectionProvider, Task, TaskStatus,
};

/// The job currently handed to the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dispatch {
    pub job_id: JobId,
    pub token: DispatchToken,
}

/// Ordered job store plus the controller that runs it one job at a time.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct QueueState {
    tasks: Vec<Task>,
    last_job_id: JobId,
    last_token: u64,
    current: Option<Dispatch>,
    last_import: Option<ImportStats>,
    dirty: bool,
}

impl QueueState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn view(&self) -> QueueViewModel {
        QueueViewModel {
            busy: self.is_busy(),
            job_count: self.tasks.len(),
            rows: self.tasks.iter().map(TaskRowView::from_task).collect(),
            last_import: self.last_import.clone(),
            dirty: self.dirty,
        }
    }

    pub(crate) fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// Returns whether anything changed since the last call and resets the flag.
    pub fn consume_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    // ----- job store ---------------------------------------------------

    /// Appends a queued task. Fails only when `parameters` do not validate.
    pub fn add_task(&mut self, parameters: ConversionParameters) -> Result<JobId, ParameterError> {
        parameters.validate()?;
        self.last_job_id += 1;
        let id = self.last_job_id;
        self.tasks.push(Task::new(id, parameters));
        self.mark_dirty();
        Ok(id)
    }

    /// Adds every valid entry; returns how many were added.
    pub fn add_tasks(&mut self, batch: impl IntoIterator<Item = ConversionParameters>) -> usize {
        self.import_tasks(batch).len()
    }

    pub(crate) fn import_tasks(
        &mut self,
        batch: impl IntoIterator<Item = ConversionParameters>,
    ) -> Vec<JobId> {
        let mut added = Vec::new();
        let mut rejected = 0;
        for parameters in batch {
            let source = parameters.source.clone();
            match self.add_task(parameters) {
                Ok(id) => added.push(id),
                Err(err) => {
                    convq_warn!("Rejected task for {:?}: {}", source, err);
                    rejected += 1;
                }
            }
        }
        self.last_import = Some(ImportStats {
            added: added.len(),
            rejected,
        });
        self.mark_dirty();
        added
    }

    /// Removes one task. A running task is never removed; stop it first.
    pub fn remove_task(&mut self, job_id: JobId) -> bool {
        !self
            .remove_where(|task| task.id == job_id)
            .is_empty()
    }

    pub fn count(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn is_busy(&self) -> bool {
        self.current.is_some()
    }

    /// Number of selected ids that refer to tasks in the store.
    pub fn selected_count(&self, provider: &dyn SelectionProvider) -> usize {
        provider
            .selection()
            .ids()
            .iter()
            .filter(|id| self.index_of(**id).is_some())
            .count()
    }

    /// Parameters of the first selected task still in the store, for
    /// seeding an editor.
    pub fn parameters_for(&self, selection: &Selection) -> Option<&ConversionParameters> {
        selection
            .ids()
            .iter()
            .find_map(|id| self.task(*id))
            .map(Task::parameters)
    }

    pub fn current_parameters(&self, provider: &dyn SelectionProvider) -> Option<&ConversionParameters> {
        self.parameters_for(&provider.selection())
    }

    pub fn task(&self, job_id: JobId) -> Option<&Task> {
        self.index_of(job_id).map(|index| &self.tasks[index])
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn status_of(&self, job_id: JobId) -> Option<TaskStatus> {
        self.task(job_id).map(Task::status)
    }

    pub fn current_dispatch(&self) -> Option<Dispatch> {
        self.current
    }

    pub fn last_import(&self) -> Option<&ImportStats> {
        self.last_import.as_ref()
    }

    /// At most one running task, and it is exactly the current dispatch.
    pub fn invariants_hold(&self) -> bool {
        let mut running = self
            .tasks
            .iter()
            .filter(|task| task.status == TaskStatus::Running);
        let first = running.next().map(|task| task.id);
        if running.next().is_some() {
            return false;
        }
        first == self.current.map(|dispatch| dispatch.job_id)
    }

    fn index_of(&self, job_id: JobId) -> Option<usize> {
        self.tasks.iter().position(|task| task.id == job_id)
    }

    fn task_mut(&mut self, job_id: JobId) -> Option<&mut Task> {
        self.tasks.iter_mut().find(|task| task.id == job_id)
    }

    /// Deletes every removable task matching `pred`, keeping order.
    fn remove_where(&mut self, pred: impl Fn(&Task) -> bool) -> Vec<JobId> {
        let mut removed = Vec::new();
        self.tasks.retain(|task| {
            if pred(task) {
                if task.status.is_removable() {
                    removed.push(task.id);
                    return false;
                }
                convq_debug!("Skipping running task {} on removal", task.id);
            }
            true
        });
        if !removed.is_empty() {
            self.mark_dirty();
        }
        removed
    }

    // ----- controller --------------------------------------------------

    /// Dispatches the first queued task unless one is already running.
    pub fn start(&mut self) -> Option<Effect> {
        if let Some(current) = self.current {
            convq_debug!("Start ignored: job {} is running", current.job_id);
            return None;
        }
        self.dispatch_next()
    }

    /// Withdraws the current dispatch and puts its task back in the queue
    /// at its old position. Does not start anything else.
    pub fn stop(&mut self) -> Option<Effect> {
        let dispatch = self.current.take()?;
        if let Some(task) = self.task_mut(dispatch.job_id) {
            task.apply(Transition::Revert);
        }
        self.mark_dirty();
        convq_info!("Stopped job {} (token {})", dispatch.job_id, dispatch.token);
        Some(Effect::AbortConversion {
            job_id: dispatch.job_id,
            token: dispatch.token,
        })
    }

    /// Records engine progress. Returns false for stale tokens.
    pub fn apply_progress(&mut self, token: DispatchToken, percent: u8) -> bool {
        let Some(dispatch) = self.current.filter(|dispatch| dispatch.token == token) else {
            convq_debug!("Dropping stale progress for token {}", token);
            return false;
        };
        let percent = percent.min(100);
        let Some(task) = self.task_mut(dispatch.job_id) else {
            return false;
        };
        if task.progress == Some(percent) {
            return true;
        }
        task.progress = Some(percent);
        self.mark_dirty();
        true
    }

    /// Closes the current attempt and moves on to the next queued task.
    ///
    /// The returned effects always put `TaskFinished` before whatever the
    /// continuation produced. A stale token yields no effects at all.
    pub fn apply_finished(&mut self, token: DispatchToken, outcome: AttemptOutcome) -> Vec<Effect> {
        let dispatch = match self.current {
            Some(dispatch) if dispatch.token == token => dispatch,
            _ => {
                convq_debug!("Dropping stale completion for token {}", token);
                return Vec::new();
            }
        };
        self.current = None;

        let transition = match outcome {
            AttemptOutcome::Success => Transition::Succeed,
            AttemptOutcome::Failure => Transition::Fail,
        };
        let mut effects = Vec::with_capacity(2);
        match self.task_mut(dispatch.job_id) {
            Some(task) => {
                task.apply(transition);
                let status = task.status;
                convq_info!("Job {} {}", dispatch.job_id, status);
                effects.push(Effect::TaskFinished {
                    job_id: dispatch.job_id,
                    status,
                });
            }
            None => {
                convq_warn!("Running job {} vanished from the store", dispatch.job_id);
            }
        }
        self.mark_dirty();

        match self.dispatch_next() {
            Some(begin) => effects.push(begin),
            None => {
                convq_info!("All tasks finished");
                effects.push(Effect::AllTasksFinished);
            }
        }
        effects
    }

    fn dispatch_next(&mut self) -> Option<Effect> {
        let token = DispatchToken::new(self.last_token + 1);
        let task = self
            .tasks
            .iter_mut()
            .find(|task| task.status == TaskStatus::Queued)?;
        task.apply(Transition::Dispatch);
        self.last_token = token.get();
        let job_id = task.id;
        let parameters = task.parameters.clone();
        self.current = Some(Dispatch { job_id, token });
        self.mark_dirty();
        convq_info!("Dispatching job {} (token {})", job_id, token);
        Some(Effect::BeginConversion {
            job_id,
            token,
            parameters,
        })
    }

    // ----- batch operations ---------------------------------------------

    /// Removes the selected tasks, quietly skipping the running one.
    pub fn remove_selected(&mut self, selection: &Selection) -> Vec<JobId> {
        self.remove_where(|task| selection.contains(task.id))
    }

    /// Removes every finished task. Failed tasks stay until retried or removed.
    pub fn remove_completed(&mut self) -> Vec<JobId> {
        self.remove_where(|task| task.status == TaskStatus::Finished)
    }

    /// Removes everything but the running task.
    pub fn clear(&mut self) -> Vec<JobId> {
        self.remove_where(|_| true)
    }

    /// Re-queues selected finished or failed tasks and starts the queue when idle.
    pub fn retry_selected(&mut self, selection: &Selection) -> Option<Effect> {
        self.retry_where(|task| selection.contains(task.id))
    }

    /// Re-queues every finished or failed task and starts the queue when idle.
    pub fn retry_all(&mut self) -> Option<Effect> {
        self.retry_where(|_| true)
    }

    fn retry_where(&mut self, pred: impl Fn(&Task) -> bool) -> Option<Effect> {
        let mut requeued = 0;
        for task in self.tasks.iter_mut().filter(|task| pred(task)) {
            if task.apply(Transition::Retry) {
                requeued += 1;
            }
        }
        if requeued > 0 {
            convq_info!("Re-queued {} task(s)", requeued);
            self.mark_dirty();
        }
        if self.is_busy() {
            None
        } else {
            self.start()
        }
    }

    /// Asks the editor to open with the first selected task's parameters.
    pub fn edit_request(&self, selection: &Selection) -> Option<Effect> {
        let seed = self.parameters_for(selection)?.clone();
        Some(Effect::OpenParameterEditor {
            targets: selection.clone(),
            seed,
        })
    }

    /// Writes `parameters` into every target that exists and is not running.
    /// An invalid edit changes nothing.
    pub fn apply_parameters(
        &mut self,
        targets: &Selection,
        parameters: &ConversionParameters,
    ) -> Result<usize, ParameterError> {
        parameters.validate()?;
        let mut edited = 0;
        for task in self.tasks.iter_mut() {
            if !targets.contains(task.id) {
                continue;
            }
            if !task.status.is_editable() {
                convq_debug!("Skipping running task {} on edit", task.id);
                continue;
            }
            if task.parameters != *parameters {
                task.parameters = parameters.clone();
                edited += 1;
            }
        }
        if edited > 0 {
            self.mark_dirty();
        }
        Ok(edited)
    }

    /// Attaches probe results to a task that still exists.
    pub fn apply_probe(&mut self, job_id: JobId, media: MediaSummary) -> bool {
        let Some(task) = self.task_mut(job_id) else {
            return false;
        };
        task.media = Some(media);
        self.mark_dirty();
        true
    }
}
