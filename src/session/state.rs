use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use uuid::Uuid;

/// Lifecycle state of the single capture session
///
/// `Complete` and `Failed` are transient: the coordinator passes through
/// them and settles back on `Idle` in the same transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Idle,
    Recording,
    AwaitingProcessing,
    Recognizing,
    Complete,
    Failed,
}

impl SessionState {
    /// A session exists and has not reached a terminal state
    pub fn is_live(&self) -> bool {
        matches!(
            self,
            Self::Recording | Self::AwaitingProcessing | Self::Recognizing
        )
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::Idle
    }
}

/// Audio file paths produced by the backend's post-processing step
///
/// Owned by the coordinator for the session's lifetime and discarded when
/// the session completes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioArtifacts {
    pub pre_path: String,
    pub post_path: String,
}

/// Monotonic token distinguishing successive sessions
///
/// Incremented on every session start; an asynchronous result carrying an
/// older value belongs to an abandoned session and must be discarded
/// before it can touch the transcript.
#[derive(Debug, Clone, Default)]
pub struct GenerationCounter(Arc<AtomicU64>);

impl GenerationCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> u64 {
        self.0.load(Ordering::SeqCst)
    }

    pub fn is_current(&self, generation: u64) -> bool {
        self.current() == generation
    }

    /// Advance to the next generation, returning it
    pub(crate) fn bump(&self) -> u64 {
        self.0.fetch_add(1, Ordering::SeqCst) + 1
    }
}

/// One consistent observable view of the session, published on every
/// transition
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub state: SessionState,
    pub generation: u64,
    /// Correlation id for logs, present while a session is live
    pub session_id: Option<Uuid>,
    /// Device the live session is capturing from
    pub device: Option<String>,
    pub last_error: Option<String>,
}

impl SessionSnapshot {
    pub(crate) fn initial() -> Self {
        Self {
            state: SessionState::Idle,
            generation: 0,
            session_id: None,
            device: None,
            last_error: None,
        }
    }
}
