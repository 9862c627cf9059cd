//! Console stand-in for the parameter editor dialog.
//!
//! The `edit` command records the requested changes, the queue answers with
//! `OpenParameterEditor`, and the editor turns that into one
//! `ParametersEdited` per target so each job keeps its own source.

use std::path::PathBuf;

use convq_core::{destination_for, ConversionParameters, Msg, QueueState, Selection};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EditOverrides {
    pub format: Option<String>,
    pub dest_dir: Option<PathBuf>,
    /// Replaces the option list when present; `Some(vec![])` clears it.
    pub options: Option<Vec<String>>,
}

impl EditOverrides {
    pub fn is_empty(&self) -> bool {
        self.format.is_none() && self.dest_dir.is_none() && self.options.is_none()
    }

    pub fn apply(&self, base: &ConversionParameters) -> ConversionParameters {
        let mut edited = base.clone();
        if let Some(format) = &self.format {
            edited.format = format.trim().to_string();
        }
        match &self.dest_dir {
            Some(dir) => edited.destination = destination_for(&edited.source, dir, &edited.format),
            None if self.format.is_some() => {
                edited.destination = base.destination.with_extension(edited.format.as_str());
            }
            None => {}
        }
        if let Some(options) = &self.options {
            edited.options = options.clone();
        }
        edited
    }
}

#[derive(Debug, Default)]
pub struct ConsoleEditor {
    pending: Option<EditOverrides>,
}

impl ConsoleEditor {
    pub fn request(&mut self, overrides: EditOverrides) {
        self.pending = Some(overrides);
    }

    /// Drops a request the queue never answered.
    pub fn discard(&mut self) -> bool {
        self.pending.take().is_some()
    }

    /// Answers an editor request. `seed` belongs to the first target still
    /// in `state`; the other targets are read from `state`. Running or
    /// vanished targets are left out.
    pub fn open(
        &mut self,
        state: &QueueState,
        targets: &Selection,
        seed: &ConversionParameters,
    ) -> Vec<Msg> {
        let Some(overrides) = self.pending.take() else {
            return vec![Msg::EditCancelled];
        };
        let seed_owner = targets
            .ids()
            .iter()
            .copied()
            .find(|&job_id| state.task(job_id).is_some());
        let edits: Vec<Msg> = targets
            .ids()
            .iter()
            .filter_map(|&job_id| {
                let task = state.task(job_id)?;
                if !task.status().is_editable() {
                    return None;
                }
                let base = if seed_owner == Some(job_id) {
                    seed
                } else {
                    task.parameters()
                };
                Some(Msg::ParametersEdited {
                    targets: Selection::new([job_id]),
                    parameters: overrides.apply(base),
                })
            })
            .collect();
        if edits.is_empty() {
            vec![Msg::EditCancelled]
        } else {
            edits
        }
    }
}
