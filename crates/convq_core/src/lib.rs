//! convq core: pure job-queue state machine and view-model helpers.
mod effect;
mod msg;
mod notify;
mod params;
mod selection;
mod state;
mod task;
mod update;
mod view_model;

pub use effect::Effect;
pub use msg::Msg;
pub use notify::{notify, QueueListener};
pub use params::{destination_for, ConversionParameters, ParameterError};
pub use selection::{Selection, SelectionProvider};
pub use state::{Dispatch, QueueState};
pub use task::{AttemptOutcome, DispatchToken, JobId, MediaSummary, Task, TaskStatus, Transition};
pub use update::update;
pub use view_model::{ImportStats, QueueViewModel, TaskRowView};
