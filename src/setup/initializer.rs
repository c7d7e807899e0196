use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{error, info};

use crate::backend::{ModelSize, RecorderBackend, SetupStatus};
use crate::error::SessionError;

/// Initialization progress of the recognition engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InitState {
    NotStarted,
    Initializing,
    Ready,
    /// Fatal until the user explicitly retries; all recording is blocked
    Failed(String),
}

/// One-shot application initialization: first-run setup plus model load
///
/// Concurrent callers are serialized; only the first actually runs the
/// backend commands. A recorded failure is returned to every caller until
/// [`retry`] is invoked.
///
/// [`retry`]: Initializer::retry
pub struct Initializer {
    backend: Arc<dyn RecorderBackend>,
    model_size: ModelSize,
    state: Mutex<InitState>,
}

impl Initializer {
    pub fn new(backend: Arc<dyn RecorderBackend>, model_size: ModelSize) -> Self {
        Self {
            backend,
            model_size,
            state: Mutex::new(InitState::NotStarted),
        }
    }

    /// Run initialization if it has not run yet
    ///
    /// Returns immediately when already ready; returns the recorded error
    /// when a previous attempt failed. The internal lock is held across
    /// the backend calls so a concurrent caller waits for the in-flight
    /// attempt instead of starting a second one.
    pub async fn ensure_initialized(&self) -> Result<(), SessionError> {
        let mut state = self.state.lock().await;

        match &*state {
            InitState::Ready => return Ok(()),
            InitState::Failed(reason) => {
                return Err(SessionError::Initialization(reason.clone()));
            }
            InitState::NotStarted | InitState::Initializing => {}
        }

        *state = InitState::Initializing;
        info!("Initializing application (model {:?})", self.model_size);

        match self.run_init().await {
            Ok(status) => {
                info!(
                    "Initialization complete ({} models installed)",
                    status.installed_models.len()
                );
                *state = InitState::Ready;
                Ok(())
            }
            Err(e) => {
                error!("Initialization failed: {}", e);
                let reason = e.to_string();
                *state = InitState::Failed(reason.clone());
                Err(SessionError::Initialization(reason))
            }
        }
    }

    /// Clear a recorded failure and run initialization again
    pub async fn retry(&self) -> Result<(), SessionError> {
        {
            let mut state = self.state.lock().await;
            if *state == InitState::Ready {
                return Ok(());
            }
            *state = InitState::NotStarted;
        }
        self.ensure_initialized().await
    }

    pub async fn state(&self) -> InitState {
        self.state.lock().await.clone()
    }

    /// Current model installation state from the backend
    pub async fn setup_status(&self) -> Result<SetupStatus, SessionError> {
        self.backend
            .setup_status()
            .await
            .map_err(|e| SessionError::Initialization(e.to_string()))
    }

    async fn run_init(&self) -> anyhow::Result<SetupStatus> {
        let status = self.backend.initialize_app().await?;
        self.backend.init_model(self.model_size).await?;
        Ok(status)
    }
}
