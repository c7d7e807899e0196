pub mod events;
pub mod traits;

pub use events::{
    BackendEvent, ProcessingFinishedPayload, RawBackendEvent, RecognitionCompletedPayload,
    EVENT_PROCESSING_FINISHED, EVENT_RECOGNITION_COMPLETED,
};
pub use traits::{Device, ModelSize, RecorderBackend, SetupStatus};
