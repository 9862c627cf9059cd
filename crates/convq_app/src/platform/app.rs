use std::fmt;
use std::io::{self, BufRead};
use std::path::PathBuf;
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{bail, Result};
use chrono::Local;
use convq_core::{
    destination_for, notify, update, ConversionParameters, Effect, Msg, QueueState,
    SelectionProvider, TaskStatus,
};
use convq_engine::EngineHandle;
use convq_logging::{convq_debug, convq_info};

use super::config::AppConfig;
use super::effects::EffectRunner;
use super::ui::commands::{self, Command, HELP};
use super::ui::editor::ConsoleEditor;
use super::ui::render::{self, ConsoleListener};

const TICK_INTERVAL: Duration = Duration::from_millis(1000);
const SHUTDOWN_GRACE: Duration = Duration::from_secs(3);

/// Everything the main loop reacts to.
pub enum AppEvent {
    Msg(Msg),
    Line(String),
    InputClosed,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BatchSummary {
    pub finished: usize,
    pub failed: usize,
    pub rejected: usize,
}

impl fmt::Display for BatchSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} finished, {} failed, {} rejected",
            self.finished, self.failed, self.rejected
        )
    }
}

pub fn run_interactive(config: AppConfig) -> Result<()> {
    let (events_tx, events_rx) = mpsc::channel();
    let runner = EffectRunner::new(&config, events_tx.clone());
    let mut app = App::new(config, runner, events_tx, events_rx);
    app.spawn_ticker();
    app.spawn_stdin_reader();
    app.emit("Type 'help' for commands.");
    app.run_loop();
    Ok(())
}

pub fn run_batch(config: AppConfig, files: Vec<PathBuf>) -> Result<BatchSummary> {
    let (events_tx, events_rx) = mpsc::channel();
    let runner = EffectRunner::new(&config, events_tx.clone());
    let mut app = App::new(config, runner, events_tx, events_rx);
    app.spawn_ticker();
    app.batch(files)
}

pub(crate) struct App {
    state: QueueState,
    config: AppConfig,
    runner: EffectRunner,
    editor: ConsoleEditor,
    console: ConsoleListener,
    events_tx: mpsc::Sender<AppEvent>,
    events_rx: mpsc::Receiver<AppEvent>,
    exit_when_idle: bool,
    done: bool,
    last_status: String,
}

enum Flow {
    Continue,
    Quit,
}

impl App {
    pub(crate) fn new(
        config: AppConfig,
        runner: EffectRunner,
        events_tx: mpsc::Sender<AppEvent>,
        events_rx: mpsc::Receiver<AppEvent>,
    ) -> Self {
        Self {
            state: QueueState::new(),
            config,
            runner,
            editor: ConsoleEditor::default(),
            console: ConsoleListener::default(),
            events_tx,
            events_rx,
            exit_when_idle: false,
            done: false,
            last_status: String::new(),
        }
    }

    /// Queues `files`, runs them and returns once the queue drained.
    pub(crate) fn batch(&mut self, files: Vec<PathBuf>) -> Result<BatchSummary> {
        let batch: Vec<ConversionParameters> =
            files.into_iter().map(|file| self.parameters_for(file, None, None)).collect();
        let requested = batch.len();
        self.dispatch_msg(Msg::AddTasks(batch));
        if self.state.is_empty() {
            bail!("none of the {} file(s) could be queued", requested);
        }

        self.exit_when_idle = true;
        self.dispatch_msg(Msg::StartClicked);
        if self.state.is_busy() {
            self.run_loop();
        }
        self.print_lines(render::table(&self.state.view()));

        let view = self.state.view();
        Ok(BatchSummary {
            finished: view.count_with(TaskStatus::Finished),
            failed: view.count_with(TaskStatus::Failed),
            rejected: view
                .last_import
                .as_ref()
                .map(|stats| stats.rejected)
                .unwrap_or(0),
        })
    }

    fn run_loop(&mut self) {
        while !self.done {
            let Ok(event) = self.events_rx.recv() else {
                break;
            };
            match event {
                AppEvent::Msg(msg) => self.dispatch_msg(msg),
                AppEvent::Line(line) => {
                    if let Flow::Quit = self.handle_line(&line) {
                        self.shutdown();
                        break;
                    }
                }
                AppEvent::InputClosed => {
                    if self.state.is_busy() {
                        convq_info!("Input closed; exiting once the queue drains");
                        self.exit_when_idle = true;
                    } else {
                        break;
                    }
                }
            }
        }
    }

    fn dispatch_msg(&mut self, msg: Msg) {
        let is_tick = matches!(msg, Msg::Tick);
        let state = std::mem::take(&mut self.state);
        let (state, effects) = update(state, msg);
        self.state = state;

        self.console.track(self.state.tasks());
        notify(&effects, &mut self.console);
        for effect in &effects {
            match effect {
                Effect::OpenParameterEditor { targets, seed } => {
                    for msg in self.editor.open(&self.state, targets, seed) {
                        let _ = self.events_tx.send(AppEvent::Msg(msg));
                    }
                }
                Effect::AllTasksFinished if self.exit_when_idle => self.done = true,
                other => self.runner.run(other),
            }
        }
        let lines = self.console.take_lines();
        self.print_lines(lines);

        // Rendering is throttled to ticks; the dirty flag collects changes
        // in between.
        if is_tick && self.state.consume_dirty() {
            let status = render::status_line(&self.state.view());
            if status != self.last_status {
                self.emit(&status);
                self.last_status = status;
            }
        }
    }

    fn handle_line(&mut self, line: &str) -> Flow {
        if line.trim().is_empty() {
            return Flow::Continue;
        }
        let command = match commands::parse(line) {
            Ok(command) => command,
            Err(err) => {
                self.emit(&format!("Error: {err}"));
                return Flow::Continue;
            }
        };
        convq_debug!("Console command {:?}", command);

        match command {
            Command::Add {
                source,
                destination,
                format,
            } => {
                let parameters = self.parameters_for(source, destination, format);
                self.dispatch_msg(Msg::AddTasks(vec![parameters]));
                self.report_import();
            }
            Command::Start => self.dispatch_msg(Msg::StartClicked),
            Command::Stop => self.dispatch_msg(Msg::StopClicked),
            Command::Remove(selection) => {
                self.report_selection(&selection);
                let single = match selection.ids() {
                    [job_id] => Some(*job_id),
                    _ => None,
                };
                match single {
                    Some(job_id) => self.dispatch_msg(Msg::RemoveTask(job_id)),
                    None => self.dispatch_msg(Msg::RemoveSelected(selection)),
                }
            }
            Command::RemoveCompleted => self.dispatch_msg(Msg::RemoveCompleted),
            Command::Clear => self.dispatch_msg(Msg::Clear),
            Command::Retry(selection) => {
                self.report_selection(&selection);
                self.dispatch_msg(Msg::RetrySelected(selection));
            }
            Command::RetryAll => self.dispatch_msg(Msg::RetryAll),
            Command::Edit { targets, overrides } => {
                if overrides.is_empty() {
                    self.emit("Nothing to change; give format=, dest-dir= or opt=");
                    return Flow::Continue;
                }
                self.report_selection(&targets);
                self.editor.request(overrides);
                self.dispatch_msg(Msg::EditSelected(targets));
                if self.editor.discard() {
                    self.emit("No such job to edit");
                }
            }
            Command::List => self.print_lines(render::table(&self.state.view())),
            Command::Help => self.emit(HELP),
            Command::Quit => return Flow::Quit,
        }
        Flow::Continue
    }

    fn parameters_for(
        &self,
        source: PathBuf,
        destination: Option<PathBuf>,
        format: Option<String>,
    ) -> ConversionParameters {
        let format = format.unwrap_or_else(|| self.config.default_format.clone());
        let destination = destination
            .unwrap_or_else(|| destination_for(&source, &self.config.output_dir, &format));
        ConversionParameters::new(source, destination, format)
            .with_options(self.config.default_options.iter().cloned())
    }

    fn report_import(&self) {
        if let Some(stats) = self.state.last_import() {
            if stats.rejected > 0 {
                self.emit(&format!("Rejected {} file(s); see the log", stats.rejected));
            } else if let Some(task) = self.state.tasks().last() {
                self.emit(&format!(
                    "Queued job {}: {}",
                    task.id(),
                    task.parameters().source_name()
                ));
            }
        }
    }

    fn report_selection(&self, provider: &dyn SelectionProvider) {
        let requested = provider.selection().len();
        let known = self.state.selected_count(provider);
        if known < requested {
            self.emit(&format!("{} of {} ids match a job", known, requested));
        }
    }

    /// Stops the running job and waits briefly for the engine to confirm, so
    /// no converter outlives the process.
    fn shutdown(&mut self) {
        if !self.state.is_busy() {
            return;
        }
        self.dispatch_msg(Msg::StopClicked);
        let deadline = Instant::now() + SHUTDOWN_GRACE;
        while let Some(left) = deadline.checked_duration_since(Instant::now()) {
            match self.events_rx.recv_timeout(left) {
                Ok(AppEvent::Msg(msg @ Msg::ConversionFinished { .. })) => {
                    self.dispatch_msg(msg);
                    return;
                }
                Ok(AppEvent::Msg(msg)) => self.dispatch_msg(msg),
                Ok(_) => {}
                Err(_) => break,
            }
        }
        convq_info!("Engine did not confirm the abort in time");
    }

    fn spawn_ticker(&self) {
        let events_tx = self.events_tx.clone();
        thread::spawn(move || {
            while events_tx.send(AppEvent::Msg(Msg::Tick)).is_ok() {
                thread::sleep(TICK_INTERVAL);
            }
        });
    }

    fn spawn_stdin_reader(&self) {
        let events_tx = self.events_tx.clone();
        thread::spawn(move || {
            for line in io::stdin().lock().lines() {
                match line {
                    Ok(line) => {
                        if events_tx.send(AppEvent::Line(line)).is_err() {
                            return;
                        }
                    }
                    Err(err) => {
                        convq_info!("Stopped reading stdin: {}", err);
                        break;
                    }
                }
            }
            let _ = events_tx.send(AppEvent::InputClosed);
        });
    }

    fn emit(&self, text: &str) {
        println!("[{}] {}", Local::now().format("%H:%M:%S"), text);
    }

    fn print_lines(&self, lines: Vec<String>) {
        for line in lines {
            self.emit(&line);
        }
    }

    #[cfg(test)]
    fn state(&self) -> &QueueState {
        &self.state
    }
}
