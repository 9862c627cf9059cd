use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{mpsc, Arc, Mutex};
use std::thread;
use std::time::Duration;

use convq_logging::{convq_debug, convq_error, convq_info};
use tokio_util::sync::CancellationToken;

use crate::backend::{ChannelProgressSink, ConversionBackend};
use crate::ffmpeg::{FfmpegBackend, FfmpegSettings};
use crate::probe::{FfprobeProber, MediaProber};
use crate::{ConversionRequest, EngineEvent, JobId, JobToken};

enum EngineCommand {
    Begin {
        token: JobToken,
        request: ConversionRequest,
    },
    Abort {
        token: JobToken,
    },
    Probe {
        job_id: JobId,
        path: PathBuf,
    },
}

type InFlight = Arc<Mutex<HashMap<JobToken, CancellationToken>>>;

/// Handle to the converter engine thread.
///
/// Commands return immediately; results arrive later as [`EngineEvent`]s.
/// Clones share the same engine and the same event stream.
#[derive(Clone)]
pub struct EngineHandle {
    cmd_tx: mpsc::Sender<EngineCommand>,
    event_rx: Arc<Mutex<mpsc::Receiver<EngineEvent>>>,
}

impl EngineHandle {
    pub fn new(backend: Arc<dyn ConversionBackend>, prober: Arc<dyn MediaProber>) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel();
        let (event_tx, event_rx) = mpsc::channel();

        thread::spawn(move || {
            let runtime = match tokio::runtime::Runtime::new() {
                Ok(runtime) => runtime,
                Err(err) => {
                    convq_error!("Could not start engine runtime: {}", err);
                    return;
                }
            };
            let in_flight: InFlight = Arc::new(Mutex::new(HashMap::new()));
            while let Ok(command) = cmd_rx.recv() {
                handle_command(
                    &runtime,
                    command,
                    &backend,
                    &prober,
                    &in_flight,
                    &event_tx,
                );
            }
            convq_debug!("Engine command channel closed");
        });

        Self {
            cmd_tx,
            event_rx: Arc::new(Mutex::new(event_rx)),
        }
    }

    /// Engine backed by `ffmpeg`, using `ffprobe` both for probe requests and
    /// for progress percentages.
    pub fn with_ffmpeg(settings: FfmpegSettings, ffprobe_path: PathBuf) -> Self {
        let prober: Arc<dyn MediaProber> = Arc::new(FfprobeProber::new(ffprobe_path));
        let backend = FfmpegBackend::new(settings).with_prober(prober.clone());
        Self::new(Arc::new(backend), prober)
    }

    pub fn begin(&self, token: JobToken, request: ConversionRequest) {
        let _ = self.cmd_tx.send(EngineCommand::Begin { token, request });
    }

    /// Best effort: the dispatch still reports `Finished`, usually as cancelled.
    pub fn abort(&self, token: JobToken) {
        let _ = self.cmd_tx.send(EngineCommand::Abort { token });
    }

    pub fn probe(&self, job_id: JobId, path: impl Into<PathBuf>) {
        let _ = self.cmd_tx.send(EngineCommand::Probe {
            job_id,
            path: path.into(),
        });
    }

    pub fn try_recv(&self) -> Option<EngineEvent> {
        self.event_rx.lock().ok()?.try_recv().ok()
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Option<EngineEvent> {
        self.event_rx.lock().ok()?.recv_timeout(timeout).ok()
    }

    /// Blocks until the next event. `None` once the engine thread is gone.
    pub fn recv(&self) -> Option<EngineEvent> {
        self.event_rx.lock().ok()?.recv().ok()
    }
}

fn handle_command(
    runtime: &tokio::runtime::Runtime,
    command: EngineCommand,
    backend: &Arc<dyn ConversionBackend>,
    prober: &Arc<dyn MediaProber>,
    in_flight: &InFlight,
    event_tx: &mpsc::Sender<EngineEvent>,
) {
    match command {
        EngineCommand::Begin { token, request } => {
            let cancel = CancellationToken::new();
            if let Ok(mut map) = in_flight.lock() {
                map.insert(token, cancel.clone());
            }
            let backend = backend.clone();
            let in_flight = in_flight.clone();
            let event_tx = event_tx.clone();
            runtime.spawn(async move {
                let sink = ChannelProgressSink::new(event_tx.clone());
                let result = backend.convert(token, &request, &sink, cancel).await;
                if let Ok(mut map) = in_flight.lock() {
                    map.remove(&token);
                }
                let _ = event_tx.send(EngineEvent::Finished { token, result });
            });
        }
        EngineCommand::Abort { token } => {
            let cancel = in_flight
                .lock()
                .ok()
                .and_then(|map| map.get(&token).cloned());
            match cancel {
                Some(cancel) => {
                    convq_info!("Aborting dispatch {}", token);
                    cancel.cancel();
                }
                None => convq_debug!("Abort for unknown or finished dispatch {}", token),
            }
        }
        EngineCommand::Probe { job_id, path } => {
            let prober = prober.clone();
            let event_tx = event_tx.clone();
            runtime.spawn(async move {
                let result = prober.probe(&path).await;
                let _ = event_tx.send(EngineEvent::Probed { job_id, result });
            });
        }
    }
}
