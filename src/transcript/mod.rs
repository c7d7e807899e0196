//! Current transcript text and recognition history
//!
//! Pure state container: the only mutator of `history` is
//! `add_to_history`, which is invoked exclusively by the recognition
//! gateway on non-empty results.

mod store;

pub use store::{HistoryEntry, TranscriptStore};
