use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::RwLock;

/// A finalized non-empty transcript
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Raw recognized text as returned by the engine
    pub text: String,

    /// When the recognition completed
    pub recognized_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct Inner {
    text: String,
    is_empty: bool,
    /// Newest first, append-only, unbounded
    history: Vec<HistoryEntry>,
}

/// Shared store for the current recognized text and prior transcripts
///
/// No method holds the lock across an await point; all accessors are
/// synchronous and cheap.
#[derive(Debug, Default)]
pub struct TranscriptStore {
    inner: RwLock<Inner>,
}

impl TranscriptStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current recognized text (untrimmed)
    pub fn text(&self) -> String {
        self.inner.read().unwrap().text.clone()
    }

    /// Whether the last recognition produced no usable text
    pub fn is_empty(&self) -> bool {
        self.inner.read().unwrap().is_empty
    }

    pub fn set_text(&self, text: impl Into<String>, is_empty: bool) {
        let mut inner = self.inner.write().unwrap();
        inner.text = text.into();
        inner.is_empty = is_empty;
    }

    /// Prepend a finalized transcript to the history
    ///
    /// Only the recognition gateway calls this, and only for non-empty
    /// results; the coordinator never touches history directly.
    pub fn add_to_history(&self, text: impl Into<String>) {
        let entry = HistoryEntry {
            text: text.into(),
            recognized_at: Utc::now(),
        };
        let mut inner = self.inner.write().unwrap();
        inner.history.insert(0, entry);
    }

    /// Full history, newest first
    pub fn history(&self) -> Vec<HistoryEntry> {
        self.inner.read().unwrap().history.clone()
    }

    /// History texts only, newest first
    pub fn history_texts(&self) -> Vec<String> {
        self.inner
            .read()
            .unwrap()
            .history
            .iter()
            .map(|e| e.text.clone())
            .collect()
    }
}
