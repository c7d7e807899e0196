pub mod backend;
pub mod config;
pub mod device;
pub mod error;
pub mod events;
pub mod recognition;
pub mod session;
pub mod setup;
pub mod transcript;

pub use backend::{
    BackendEvent, Device, ModelSize, ProcessingFinishedPayload, RawBackendEvent, RecorderBackend,
    RecognitionCompletedPayload, SetupStatus,
};
pub use config::{Config, ModelConfig, PollerConfig};
pub use device::DeviceRegistry;
pub use error::SessionError;
pub use events::{EventSubscriptionManager, SubscriptionHandle};
pub use recognition::{RecognitionGateway, RecognitionOutcome, RecognitionResult};
pub use session::{
    AudioArtifacts, GenerationCounter, SessionCoordinator, SessionSnapshot, SessionState,
};
pub use setup::{InitState, Initializer};
pub use transcript::{HistoryEntry, TranscriptStore};
