use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::backend::RecorderBackend;
use crate::error::SessionError;
use crate::session::GenerationCounter;
use crate::transcript::TranscriptStore;

/// Normalized output of one recognition pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecognitionResult {
    /// Raw engine output
    pub text: String,

    /// Whitespace-trimmed text
    pub trimmed_text: String,

    /// True when the trimmed text is empty
    pub is_empty: bool,

    /// The audio artifact the text was recognized from
    pub source_audio_path: String,
}

/// Outcome of a recognition call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecognitionOutcome {
    /// The result was current and has been applied to the transcript store
    Applied(RecognitionResult),

    /// A newer session started while recognition was in flight; the result
    /// was discarded without touching text or history
    Stale,
}

/// Invokes the recognition engine and normalizes its result
///
/// The gateway is the single writer of the transcript store: it sets the
/// current text and decides whether a result counts as a completed
/// recognition (non-empty) worth appending to history. A result arriving
/// for a superseded generation is dropped before any store mutation.
pub struct RecognitionGateway {
    backend: Arc<dyn RecorderBackend>,
    store: Arc<TranscriptStore>,
    generation: GenerationCounter,
    recognizing: AtomicBool,
}

impl RecognitionGateway {
    pub fn new(
        backend: Arc<dyn RecorderBackend>,
        store: Arc<TranscriptStore>,
        generation: GenerationCounter,
    ) -> Self {
        Self {
            backend,
            store,
            generation,
            recognizing: AtomicBool::new(false),
        }
    }

    /// Whether a recognition call is currently in flight
    pub fn is_recognizing(&self) -> bool {
        self.recognizing.load(Ordering::SeqCst)
    }

    /// Recognize one audio artifact and apply the result to the store
    ///
    /// `generation` is the session generation captured when the artifact
    /// arrived; if a newer session has started by the time the engine
    /// replies, the result is discarded unapplied.
    ///
    /// Empty or whitespace-only transcripts clear the current text and
    /// leave history untouched; non-empty transcripts set the (untrimmed)
    /// text and are prepended to history. The recognizing flag is cleared
    /// on every path. Failures propagate without retry.
    pub async fn recognize(
        &self,
        audio_path: &str,
        generation: u64,
    ) -> Result<RecognitionOutcome, SessionError> {
        self.recognizing.store(true, Ordering::SeqCst);
        info!("Starting recognition for: {}", audio_path);

        let raw = match self.backend.recognize_audio(audio_path).await {
            Ok(text) => text,
            Err(e) => {
                error!("Recognition failed for {}: {}", audio_path, e);
                self.recognizing.store(false, Ordering::SeqCst);
                return Err(SessionError::Recognition(e.to_string()));
            }
        };

        if !self.generation.is_current(generation) {
            warn!(
                "Discarding stale recognition result (generation {}, current {})",
                generation,
                self.generation.current()
            );
            self.recognizing.store(false, Ordering::SeqCst);
            return Ok(RecognitionOutcome::Stale);
        }

        let trimmed = raw.trim().to_string();
        let is_empty = trimmed.is_empty();

        if is_empty {
            info!("Recognition returned no usable text for {}", audio_path);
            self.store.set_text("", true);
        } else {
            info!("Recognition completed ({} chars)", raw.len());
            self.store.set_text(raw.clone(), false);
            self.store.add_to_history(raw.clone());
        }

        self.recognizing.store(false, Ordering::SeqCst);

        Ok(RecognitionOutcome::Applied(RecognitionResult {
            text: raw,
            trimmed_text: trimmed,
            is_empty,
            source_audio_path: audio_path.to_string(),
        }))
    }
}
