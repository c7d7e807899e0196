use std::sync::Arc;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::poller;
use super::state::{AudioArtifacts, GenerationCounter, SessionSnapshot, SessionState};
use crate::backend::{Device, RecorderBackend};
use crate::config::PollerConfig;
use crate::device::DeviceRegistry;
use crate::error::SessionError;
use crate::recognition::{RecognitionGateway, RecognitionOutcome};

struct Inner {
    state: SessionState,
    session_id: Option<Uuid>,
    device: Option<Device>,
    artifacts: Option<AudioArtifacts>,
    last_error: Option<String>,
    poller: Option<JoinHandle<()>>,
}

/// The state machine owning one capture-to-text session
///
/// Three independent triggers can mutate session state: an explicit
/// start/stop call, the `processing-finished` backend event, and the
/// status poller detecting a backend-initiated auto-stop. None of them is
/// serialized against the others by a lock held across a backend call;
/// each handler re-checks the current state before acting and no-ops on a
/// mismatch, and stale recognition results are discarded by generation.
///
/// ```text
/// Idle               --start()-->              Recording
/// Recording          --stop() / auto-stop-->   AwaitingProcessing
/// AwaitingProcessing --processing-finished-->  Recognizing
/// Recognizing        --recognition result-->   Complete --(auto)--> Idle
/// Recognizing        --recognition error-->    Failed   --(auto)--> Idle
/// Recording          --start-failed-->         Idle     (rollback)
/// ```
pub struct SessionCoordinator {
    backend: Arc<dyn RecorderBackend>,
    registry: Arc<DeviceRegistry>,
    gateway: Arc<RecognitionGateway>,
    generation: GenerationCounter,
    poller_config: PollerConfig,
    inner: Mutex<Inner>,
    watch_tx: watch::Sender<SessionSnapshot>,
}

impl SessionCoordinator {
    pub fn new(
        backend: Arc<dyn RecorderBackend>,
        registry: Arc<DeviceRegistry>,
        gateway: Arc<RecognitionGateway>,
        generation: GenerationCounter,
        poller_config: PollerConfig,
    ) -> Arc<Self> {
        let (watch_tx, _) = watch::channel(SessionSnapshot::initial());
        Arc::new(Self {
            backend,
            registry,
            gateway,
            generation,
            poller_config,
            inner: Mutex::new(Inner {
                state: SessionState::Idle,
                session_id: None,
                device: None,
                artifacts: None,
                last_error: None,
                poller: None,
            }),
            watch_tx,
        })
    }

    /// Start a new session
    ///
    /// Rejects unless idle. The device is resolved from the explicit
    /// argument, else the registry selection, else the backend default.
    /// State moves to `Recording` before the backend start command is
    /// issued so observers reflect intent immediately; a start failure
    /// rolls back to `Idle` with no retry.
    pub async fn start_session(
        self: &Arc<Self>,
        device: Option<String>,
    ) -> Result<(), SessionError> {
        {
            let inner = self.inner.lock().await;
            if inner.state != SessionState::Idle {
                warn!("Cannot start session in state {:?}", inner.state);
                return Err(SessionError::InvalidState {
                    required: SessionState::Idle,
                    actual: inner.state,
                });
            }
        }

        let device = self.resolve_device(device).await?;

        // Optimistic transition; re-check the state since device
        // resolution may have awaited the backend.
        let generation = {
            let mut inner = self.inner.lock().await;
            if inner.state != SessionState::Idle {
                warn!("Cannot start session in state {:?}", inner.state);
                return Err(SessionError::InvalidState {
                    required: SessionState::Idle,
                    actual: inner.state,
                });
            }
            let generation = self.generation.bump();
            inner.session_id = Some(Uuid::new_v4());
            inner.device = Some(device.clone());
            inner.last_error = None;
            self.apply(&mut inner, SessionState::Recording);
            generation
        };

        info!(
            "Starting recording session (generation {}, device '{}')",
            generation, device.name
        );

        if let Err(e) = self.backend.start_recording(&device.name).await {
            error!("Failed to start recording: {}", e);
            let mut inner = self.inner.lock().await;
            if self.generation.is_current(generation) && inner.state == SessionState::Recording {
                inner.last_error = Some(e.to_string());
                inner.session_id = None;
                inner.device = None;
                self.apply(&mut inner, SessionState::Idle);
            }
            return Err(SessionError::StartRecording(e.to_string()));
        }

        self.spawn_poller(generation).await;

        Ok(())
    }

    /// Stop the current session
    ///
    /// Valid only while recording. The transition to `AwaitingProcessing`
    /// happens only after the backend stop command succeeds; on failure the
    /// recording is still live and the state stays `Recording` so the user
    /// may retry. A reply arriving after the session it was issued for has
    /// already ended (auto-stop ran the session to completion and a new one
    /// may have started) is a no-op on state.
    pub async fn stop_session(&self) -> Result<(), SessionError> {
        let generation = {
            let inner = self.inner.lock().await;
            if inner.state != SessionState::Recording {
                warn!("Cannot stop session in state {:?}", inner.state);
                return Err(SessionError::InvalidState {
                    required: SessionState::Recording,
                    actual: inner.state,
                });
            }
            self.generation.current()
        };

        info!("Stopping recording session");

        if let Err(e) = self.backend.stop_recording().await {
            error!("Failed to stop recording: {}", e);
            let mut inner = self.inner.lock().await;
            if self.generation.is_current(generation) {
                inner.last_error = Some(e.to_string());
                self.publish(&inner);
            }
            return Err(SessionError::StopRecording(e.to_string()));
        }

        let mut inner = self.inner.lock().await;
        if self.generation.is_current(generation) && inner.state == SessionState::Recording {
            self.apply(&mut inner, SessionState::AwaitingProcessing);
        } else {
            // Auto-stop raced ahead while the stop command was in flight;
            // the reply may even belong to a session that already finished.
            debug!(
                "Session moved on ({:?}, generation {}) while stop was in flight",
                inner.state,
                self.generation.current()
            );
        }
        Ok(())
    }

    /// React to the poller observing that the backend stopped on its own
    ///
    /// The backend already ended the capture (e.g. silence timeout), so no
    /// stop command is issued. A no-op if the state has already left
    /// `Recording` by the time the poll result arrives.
    pub async fn handle_auto_stop(&self) {
        let mut inner = self.inner.lock().await;
        if inner.state != SessionState::Recording {
            debug!("Ignoring auto-stop in state {:?}", inner.state);
            return;
        }
        info!("Backend auto-stopped recording, awaiting processing");
        self.apply(&mut inner, SessionState::AwaitingProcessing);
    }

    /// Consume a `processing-finished` event
    ///
    /// Valid only from `AwaitingProcessing`; a late or duplicate event in
    /// any other state is logged and ignored. Stores the audio artifacts,
    /// moves to `Recognizing`, runs the recognition gateway on the
    /// post-processed artifact, and feeds the outcome back into the state
    /// machine.
    pub async fn handle_processing_finished(&self, pre_path: String, post_path: String) {
        let generation = {
            let mut inner = self.inner.lock().await;
            if inner.state != SessionState::AwaitingProcessing {
                warn!(
                    "Ignoring processing-finished in state {:?}",
                    inner.state
                );
                return;
            }
            inner.artifacts = Some(AudioArtifacts {
                pre_path,
                post_path: post_path.clone(),
            });
            self.apply(&mut inner, SessionState::Recognizing);
            self.generation.current()
        };

        let outcome = self.gateway.recognize(&post_path, generation).await;
        self.handle_recognition_result(outcome, generation).await;
    }

    /// Finish the session with a recognition outcome
    ///
    /// An outcome for a superseded generation is dropped without touching
    /// state. Otherwise success passes through `Complete` and failure
    /// through `Failed`, both settling on `Idle`; text and history were
    /// already applied (or deliberately not) by the gateway.
    pub async fn handle_recognition_result(
        &self,
        outcome: Result<RecognitionOutcome, SessionError>,
        generation: u64,
    ) {
        let mut inner = self.inner.lock().await;
        if !self.generation.is_current(generation) {
            debug!(
                "Discarding recognition outcome for stale generation {} (current {})",
                generation,
                self.generation.current()
            );
            return;
        }

        inner.artifacts = None;

        match outcome {
            Ok(RecognitionOutcome::Applied(result)) => {
                if result.is_empty {
                    info!("Session completed with empty transcript");
                } else {
                    info!("Session completed");
                }
                self.apply(&mut inner, SessionState::Complete);
                self.finish(&mut inner);
            }
            Ok(RecognitionOutcome::Stale) => {
                debug!("Gateway dropped a stale result for generation {}", generation);
            }
            Err(e) => {
                error!("Session failed: {}", e);
                inner.last_error = Some(e.to_string());
                self.apply(&mut inner, SessionState::Failed);
                self.finish(&mut inner);
            }
        }
    }

    /// Current state
    pub async fn state(&self) -> SessionState {
        self.inner.lock().await.state
    }

    /// Current session generation
    pub fn generation(&self) -> u64 {
        self.generation.current()
    }

    /// Observe session snapshots; a new value is published on every
    /// transition
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.watch_tx.subscribe()
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        let inner = self.inner.lock().await;
        self.make_snapshot(&inner)
    }

    pub async fn last_error(&self) -> Option<String> {
        self.inner.lock().await.last_error.clone()
    }

    pub(crate) fn backend(&self) -> &Arc<dyn RecorderBackend> {
        &self.backend
    }

    pub(crate) fn poller_config(&self) -> &PollerConfig {
        &self.poller_config
    }

    async fn resolve_device(&self, explicit: Option<String>) -> Result<Device, SessionError> {
        if let Some(name) = explicit {
            return Ok(Device::new(name));
        }
        if let Some(device) = self.registry.selected_device() {
            return Ok(device);
        }
        self.backend
            .default_input_device()
            .await
            .map_err(|e| SessionError::Device(e.to_string()))
    }

    async fn spawn_poller(self: &Arc<Self>, generation: u64) {
        let mut inner = self.inner.lock().await;
        // A manual stop or auto-stop may already have moved the state on.
        if inner.state != SessionState::Recording || !self.generation.is_current(generation) {
            return;
        }
        inner.poller = Some(poller::spawn(Arc::clone(self), generation));
    }

    /// Apply a state transition and publish the new snapshot
    ///
    /// The device registry is locked exactly while the session is
    /// `Recording` or `AwaitingProcessing`, and the poller is cancelled the
    /// instant the state leaves `Recording`.
    fn apply(&self, inner: &mut Inner, next: SessionState) {
        let prev = inner.state;
        inner.state = next;
        debug!("Session state: {:?} -> {:?}", prev, next);

        self.registry.set_locked(matches!(
            next,
            SessionState::Recording | SessionState::AwaitingProcessing
        ));

        if prev == SessionState::Recording && next != SessionState::Recording {
            if let Some(handle) = inner.poller.take() {
                handle.abort();
            }
        }

        self.publish(inner);
    }

    /// Settle a terminal transition back on `Idle`
    fn finish(&self, inner: &mut Inner) {
        inner.session_id = None;
        inner.device = None;
        self.apply(inner, SessionState::Idle);
    }

    fn publish(&self, inner: &Inner) {
        self.watch_tx.send_replace(self.make_snapshot(inner));
    }

    fn make_snapshot(&self, inner: &Inner) -> SessionSnapshot {
        SessionSnapshot {
            state: inner.state,
            generation: self.generation.current(),
            session_id: inner.session_id,
            device: inner.device.as_ref().map(|d| d.name.clone()),
            last_error: inner.last_error.clone(),
        }
    }
}
