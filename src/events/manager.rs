use std::sync::{Arc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::backend::{BackendEvent, ProcessingFinishedPayload, RecorderBackend};
use crate::session::SessionCoordinator;

struct ManagerInner {
    refcount: usize,
    dispatch: Option<JoinHandle<()>>,
}

/// Reference-counted registration of the backend event listeners
///
/// Observers call [`acquire`] and hold the returned handle for as long as
/// they are mounted; dropping the handle releases the reference. The
/// backend event channel is subscribed on the 0→1 edge and torn down on
/// the 1→0 edge, so any number of observers share exactly one underlying
/// registration. No process-wide state: the manager is a plain
/// dependency-injected value.
///
/// [`acquire`]: EventSubscriptionManager::acquire
pub struct EventSubscriptionManager {
    backend: Arc<dyn RecorderBackend>,
    coordinator: Arc<SessionCoordinator>,
    inner: Mutex<ManagerInner>,
    /// Single-slot in-flight marker for `processing-finished` handling: a
    /// second event arriving while the previous handler task is still
    /// running is dropped, not queued.
    in_flight: Arc<tokio::sync::Mutex<Option<JoinHandle<()>>>>,
}

impl EventSubscriptionManager {
    pub fn new(
        backend: Arc<dyn RecorderBackend>,
        coordinator: Arc<SessionCoordinator>,
    ) -> Arc<Self> {
        Arc::new(Self {
            backend,
            coordinator,
            inner: Mutex::new(ManagerInner {
                refcount: 0,
                dispatch: None,
            }),
            in_flight: Arc::new(tokio::sync::Mutex::new(None)),
        })
    }

    /// Take a reference on the shared event subscription
    ///
    /// On the 0→1 transition this spawns the dispatch task, which
    /// registers the backend event channel and forwards validated events
    /// to the coordinator. Registration failure is logged by the task; the
    /// handle itself is always returned so the observer's teardown path
    /// stays uniform.
    pub fn acquire(self: &Arc<Self>) -> SubscriptionHandle {
        let mut inner = self.inner.lock().unwrap();
        if inner.refcount == 0 {
            let task = tokio::spawn(dispatch(
                Arc::clone(&self.backend),
                Arc::clone(&self.coordinator),
                Arc::clone(&self.in_flight),
            ));
            inner.dispatch = Some(task);
        }
        inner.refcount += 1;
        debug!("Event subscription acquired (refcount {})", inner.refcount);

        SubscriptionHandle {
            manager: Arc::clone(self),
        }
    }

    /// Current number of live subscription handles
    pub fn subscriber_count(&self) -> usize {
        self.inner.lock().unwrap().refcount
    }

    fn release_one(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.refcount = inner.refcount.saturating_sub(1);
        debug!("Event subscription released (refcount {})", inner.refcount);
        if inner.refcount == 0 {
            if let Some(task) = inner.dispatch.take() {
                task.abort();
                info!("Deregistered backend event listeners");
            }
        }
    }
}

/// One observer's reference on the shared event subscription; releases on
/// drop
pub struct SubscriptionHandle {
    manager: Arc<EventSubscriptionManager>,
}

impl SubscriptionHandle {
    /// Release explicitly (equivalent to dropping the handle)
    pub fn release(self) {}
}

impl Drop for SubscriptionHandle {
    fn drop(&mut self) {
        self.manager.release_one();
    }
}

/// Registers the backend event channel and forwards events
///
/// Payloads are validated here, at the subscription boundary; malformed
/// events are logged and dropped. `processing-finished` is handed to the
/// coordinator on a spawned task guarded by the single-slot in-flight
/// marker; `recognition-completed` is informational (the transcript flows
/// back through the command reply).
async fn dispatch(
    backend: Arc<dyn RecorderBackend>,
    coordinator: Arc<SessionCoordinator>,
    in_flight: Arc<tokio::sync::Mutex<Option<JoinHandle<()>>>>,
) {
    let mut rx = match backend.subscribe_events().await {
        Ok(rx) => {
            info!("Registered backend event listeners");
            rx
        }
        Err(e) => {
            error!("Failed to register backend event listeners: {}", e);
            return;
        }
    };

    while let Some(raw) = rx.recv().await {
        let event = match BackendEvent::decode(&raw) {
            Ok(event) => event,
            Err(e) => {
                warn!("Dropping malformed backend event: {}", e);
                continue;
            }
        };

        match event {
            BackendEvent::ProcessingFinished(ProcessingFinishedPayload(pre_path, post_path)) => {
                handle_processing_finished(&coordinator, &in_flight, pre_path, post_path).await;
            }
            BackendEvent::RecognitionCompleted(payload) => {
                debug!(
                    "Backend reports recognition completed for {} ({} chars)",
                    payload.audio_path,
                    payload.text.len()
                );
            }
        }
    }

    debug!("Backend event dispatch stopped");
}

async fn handle_processing_finished(
    coordinator: &Arc<SessionCoordinator>,
    in_flight: &Arc<tokio::sync::Mutex<Option<JoinHandle<()>>>>,
    pre_path: String,
    post_path: String,
) {
    let mut slot = in_flight.lock().await;

    if let Some(handle) = slot.take() {
        if !handle.is_finished() {
            warn!("processing-finished still being handled, dropping duplicate event");
            *slot = Some(handle);
            return;
        }
    }

    let coordinator = Arc::clone(coordinator);
    *slot = Some(tokio::spawn(async move {
        coordinator
            .handle_processing_finished(pre_path, post_path)
            .await;
    }));
}
