//! Session lifecycle coordination
//!
//! This module owns the state machine for one capture-to-text session:
//! - `SessionCoordinator` arbitrates start/stop intents, backend events,
//!   and poll results into one consistent observable state
//! - the status poller detects backend-initiated auto-stop while recording
//! - the generation counter discards asynchronous results from abandoned
//!   sessions

mod coordinator;
mod poller;
mod state;

pub use coordinator::SessionCoordinator;
pub use state::{AudioArtifacts, GenerationCounter, SessionSnapshot, SessionState};
