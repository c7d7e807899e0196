use anyhow::Result;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use super::events::RawBackendEvent;

/// An input device as reported by the capture subsystem
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    pub name: String,
}

impl Device {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// Whisper model size selectable at initialization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelSize {
    Tiny,
    Small,
    Base,
    Medium,
    Large,
}

impl Default for ModelSize {
    fn default() -> Self {
        Self::Base
    }
}

/// Model installation state reported by the backend setup commands
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetupStatus {
    pub models_initialized: bool,
    pub default_model_installed: bool,
    pub available_models: Vec<String>,
    pub installed_models: Vec<String>,
}

/// Command/event interface to the native audio + recognition backend
///
/// The backend owns device enumeration, the actual capture, silence
/// detection and post-processing (producing the pre/post audio artifacts),
/// and the recognition engine. The coordinator only ever talks to it
/// through this trait.
///
/// Commands are request/response; events arrive unordered with respect to
/// command replies on the channel returned by [`subscribe_events`].
///
/// [`subscribe_events`]: RecorderBackend::subscribe_events
#[async_trait::async_trait]
pub trait RecorderBackend: Send + Sync {
    /// Enumerate available input devices
    async fn list_input_devices(&self) -> Result<Vec<Device>>;

    /// Query the system default input device
    async fn default_input_device(&self) -> Result<Device>;

    /// Start capturing from the named device
    ///
    /// Fails if the device is unavailable; the caller is responsible for
    /// rolling back any optimistic state on failure.
    async fn start_recording(&self, device: &str) -> Result<()>;

    /// Stop the current capture
    async fn stop_recording(&self) -> Result<()>;

    /// Ground-truth recording status
    ///
    /// Returns `false` once the backend has stopped on its own (e.g.
    /// silence timeout), even if no stop command was ever issued.
    async fn recording_status(&self) -> Result<bool>;

    /// Run recognition over a post-processed audio artifact
    ///
    /// Returns the raw transcript, possibly empty or whitespace-only.
    async fn recognize_audio(&self, audio_path: &str) -> Result<String>;

    /// Load the recognition model
    async fn init_model(&self, size: ModelSize) -> Result<()>;

    /// Query model installation state
    async fn setup_status(&self) -> Result<SetupStatus>;

    /// First-run setup (models directory, default model download)
    async fn initialize_app(&self) -> Result<SetupStatus>;

    /// Register for backend push events
    ///
    /// Returns a channel receiver carrying raw events; dropping the
    /// receiver deregisters the listener.
    async fn subscribe_events(&self) -> Result<mpsc::Receiver<RawBackendEvent>>;
}
