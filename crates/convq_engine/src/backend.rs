use tokio_util::sync::CancellationToken;

use crate::{ConversionError, ConversionOutcome, ConversionRequest, EngineEvent, JobToken};

pub trait ProgressSink: Send + Sync {
    fn emit(&self, event: EngineEvent);
}

pub struct ChannelProgressSink {
    tx: std::sync::mpsc::Sender<EngineEvent>,
}

impl ChannelProgressSink {
    pub fn new(tx: std::sync::mpsc::Sender<EngineEvent>) -> Self {
        Self { tx }
    }
}

impl ProgressSink for ChannelProgressSink {
    fn emit(&self, event: EngineEvent) {
        let _ = self.tx.send(event);
    }
}

/// Runs a single conversion to completion, failure or cancellation.
///
/// Implementations report progress through `sink` tagged with `token` and
/// must return promptly once `cancel` fires.
#[async_trait::async_trait]
pub trait ConversionBackend: Send + Sync {
    async fn convert(
        &self,
        token: JobToken,
        request: &ConversionRequest,
        sink: &dyn ProgressSink,
        cancel: CancellationToken,
    ) -> Result<ConversionOutcome, ConversionError>;
}
