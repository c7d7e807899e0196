use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

pub const EVENT_PROCESSING_FINISHED: &str = "processing-finished";
pub const EVENT_RECOGNITION_COMPLETED: &str = "recognition-completed";

/// A backend event as it crosses the wire: name plus untyped payload.
///
/// Payloads are validated into [`BackendEvent`] at the subscription
/// boundary; malformed events never reach the coordinator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawBackendEvent {
    pub name: String,
    pub payload: serde_json::Value,
}

impl RawBackendEvent {
    pub fn new(name: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            name: name.into(),
            payload,
        }
    }
}

/// Payload of `processing-finished`: the pre- and post-processed WAV paths,
/// emitted as a two-element array
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessingFinishedPayload(pub String, pub String);

/// Payload of `recognition-completed`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecognitionCompletedPayload {
    pub text: String,
    pub audio_path: String,
}

/// A validated, typed backend event
#[derive(Debug, Clone)]
pub enum BackendEvent {
    ProcessingFinished(ProcessingFinishedPayload),
    RecognitionCompleted(RecognitionCompletedPayload),
}

impl BackendEvent {
    /// Decode and validate a raw event
    ///
    /// Fails on unknown event names and on payloads that do not match the
    /// wire contract for the named event.
    pub fn decode(raw: &RawBackendEvent) -> Result<Self> {
        match raw.name.as_str() {
            EVENT_PROCESSING_FINISHED => {
                let payload: ProcessingFinishedPayload =
                    serde_json::from_value(raw.payload.clone())
                        .context("invalid processing-finished payload")?;
                Ok(Self::ProcessingFinished(payload))
            }
            EVENT_RECOGNITION_COMPLETED => {
                let payload: RecognitionCompletedPayload =
                    serde_json::from_value(raw.payload.clone())
                        .context("invalid recognition-completed payload")?;
                Ok(Self::RecognitionCompleted(payload))
            }
            other => bail!("unknown backend event: {}", other),
        }
    }
}
