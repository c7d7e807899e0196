use crate::session::SessionState;

/// Error taxonomy for session coordination.
///
/// Start/stop failures are recovered locally (state rollback) before being
/// surfaced; recognition failures end the session without retry;
/// initialization failures block recording until an explicit retry.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("device error: {0}")]
    Device(String),

    #[error("failed to start recording: {0}")]
    StartRecording(String),

    #[error("failed to stop recording: {0}")]
    StopRecording(String),

    #[error("recognition failed: {0}")]
    Recognition(String),

    #[error("initialization failed: {0}")]
    Initialization(String),

    #[error("operation not valid in state {actual:?} (requires {required:?})")]
    InvalidState {
        required: SessionState,
        actual: SessionState,
    },
}
