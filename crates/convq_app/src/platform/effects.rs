use std::sync::mpsc;
use std::thread;

use convq_core::{
    AttemptOutcome, ConversionParameters, DispatchToken, Effect, MediaSummary, Msg,
};
use convq_engine::{
    ConversionRequest, EngineEvent, EngineHandle, FfmpegSettings, ProbeReport,
};
use convq_logging::{convq_debug, convq_info, convq_warn};

use super::app::AppEvent;
use super::config::AppConfig;

/// Carries engine-bound effects to the engine and feeds engine events back
/// into the message loop.
pub struct EffectRunner {
    engine: EngineHandle,
    probe_on_add: bool,
}

impl EffectRunner {
    pub fn new(config: &AppConfig, events_tx: mpsc::Sender<AppEvent>) -> Self {
        let settings = FfmpegSettings {
            ffmpeg_path: config.ffmpeg_path.clone(),
            global_args: config.ffmpeg_args.clone(),
            overwrite: config.overwrite,
        };
        let engine = EngineHandle::with_ffmpeg(settings, config.ffprobe_path.clone());
        Self::with_engine(engine, config.probe_on_add, events_tx)
    }

    pub fn with_engine(
        engine: EngineHandle,
        probe_on_add: bool,
        events_tx: mpsc::Sender<AppEvent>,
    ) -> Self {
        let runner = Self {
            engine,
            probe_on_add,
        };
        runner.spawn_event_loop(events_tx);
        runner
    }

    /// Effects for other collaborators (notifications, the editor) are
    /// ignored here.
    pub fn run(&self, effect: &Effect) {
        match effect {
            Effect::BeginConversion {
                job_id,
                token,
                parameters,
            } => {
                convq_info!(
                    "BeginConversion job_id={} token={} format={}",
                    job_id,
                    token,
                    parameters.format
                );
                self.engine.begin(token.get(), request_for(parameters));
            }
            Effect::AbortConversion { job_id, token } => {
                convq_info!("AbortConversion job_id={} token={}", job_id, token);
                self.engine.abort(token.get());
            }
            Effect::ProbeSource { job_id, source } => {
                if self.probe_on_add {
                    self.engine.probe(*job_id, source.clone());
                }
            }
            Effect::OpenParameterEditor { .. }
            | Effect::RowRemoved { .. }
            | Effect::TaskFinished { .. }
            | Effect::AllTasksFinished => {}
        }
    }

    fn spawn_event_loop(&self, events_tx: mpsc::Sender<AppEvent>) {
        let engine = self.engine.clone();
        thread::spawn(move || {
            while let Some(event) = engine.recv() {
                if events_tx.send(AppEvent::Msg(map_event(event))).is_err() {
                    break;
                }
            }
            convq_debug!("Engine event loop finished");
        });
    }
}

pub(crate) fn request_for(parameters: &ConversionParameters) -> ConversionRequest {
    ConversionRequest {
        source: parameters.source.clone(),
        destination: parameters.destination.clone(),
        format: parameters.format.clone(),
        options: parameters.options.clone(),
    }
}

pub(crate) fn map_event(event: EngineEvent) -> Msg {
    match event {
        EngineEvent::Progress { token, percent } => Msg::ConversionProgress {
            token: DispatchToken::new(token),
            percent,
        },
        EngineEvent::Finished { token, result } => {
            let outcome = match result {
                Ok(outcome) => {
                    convq_info!(
                        "Token {} wrote {:?} in {:.1?}",
                        token,
                        outcome.destination,
                        outcome.elapsed
                    );
                    AttemptOutcome::Success
                }
                Err(err) => {
                    convq_warn!("Token {} failed: {}", token, err);
                    AttemptOutcome::Failure
                }
            };
            Msg::ConversionFinished {
                token: DispatchToken::new(token),
                outcome,
            }
        }
        EngineEvent::Probed { job_id, result } => {
            let media = match result {
                Ok(report) => Some(media_summary(report)),
                Err(err) => {
                    convq_debug!("Probe for job {} failed: {}", job_id, err);
                    None
                }
            };
            Msg::ProbeCompleted { job_id, media }
        }
    }
}

fn media_summary(report: ProbeReport) -> MediaSummary {
    MediaSummary {
        duration: report.duration,
        container: report.format_name,
        video_codec: report.video_codec,
        audio_codec: report.audio_codec,
    }
}
