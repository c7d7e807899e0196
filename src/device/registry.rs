use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use tracing::{debug, info, warn};

use crate::backend::{Device, RecorderBackend};
use crate::error::SessionError;

#[derive(Debug, Default)]
struct Inner {
    available: Vec<Device>,
    selected: Option<Device>,
    loaded: bool,
}

/// Enumerated input devices and the current selection
///
/// The selection is frozen while a session is recording or awaiting
/// processing; the coordinator toggles the lock on its state transitions.
pub struct DeviceRegistry {
    backend: Arc<dyn RecorderBackend>,
    inner: RwLock<Inner>,
    locked: AtomicBool,
    load_lock: tokio::sync::Mutex<()>,
}

impl DeviceRegistry {
    pub fn new(backend: Arc<dyn RecorderBackend>) -> Self {
        Self {
            backend,
            inner: RwLock::new(Inner::default()),
            locked: AtomicBool::new(false),
            load_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// One-shot device enumeration
    ///
    /// Populates the available set and, if nothing is selected yet, selects
    /// the backend default. A second call after a successful load is a
    /// no-op; a failed load stays unloaded so the next mount may retry.
    /// Concurrent callers are serialized so the backend sees one
    /// enumeration regardless of how many observers mount at once.
    pub async fn load_devices(&self) -> Result<(), SessionError> {
        let _load = self.load_lock.lock().await;

        if self.inner.read().unwrap().loaded {
            debug!("Devices already loaded, skipping enumeration");
            return Ok(());
        }

        let devices = self
            .backend
            .list_input_devices()
            .await
            .map_err(|e| SessionError::Device(e.to_string()))?;

        info!("Enumerated {} input devices", devices.len());

        let needs_default =
            self.inner.read().unwrap().selected.is_none() && !devices.is_empty();
        let default = if needs_default {
            Some(
                self.backend
                    .default_input_device()
                    .await
                    .map_err(|e| SessionError::Device(e.to_string()))?,
            )
        } else {
            None
        };

        // Commit only once every lookup succeeded, so a failed load stays
        // retryable.
        let mut inner = self.inner.write().unwrap();
        inner.available = devices;
        inner.loaded = true;
        if inner.selected.is_none() {
            if let Some(device) = default {
                info!("Selected default input device: {}", device.name);
                inner.selected = Some(device);
            }
        }

        Ok(())
    }

    /// Replace the device selection
    ///
    /// Rejected while a session is recording or awaiting processing.
    pub fn select_device(&self, device: Device) -> Result<(), SessionError> {
        if self.locked.load(Ordering::SeqCst) {
            warn!(
                "Ignoring device selection of '{}' while session is active",
                device.name
            );
            return Err(SessionError::Device(
                "cannot change device while a session is active".to_string(),
            ));
        }

        info!("Selected input device: {}", device.name);
        self.inner.write().unwrap().selected = Some(device);
        Ok(())
    }

    pub fn selected_device(&self) -> Option<Device> {
        self.inner.read().unwrap().selected.clone()
    }

    pub fn available_devices(&self) -> Vec<Device> {
        self.inner.read().unwrap().available.clone()
    }

    /// Freeze or unfreeze the selection; called by the coordinator on
    /// session state transitions.
    pub(crate) fn set_locked(&self, locked: bool) {
        self.locked.store(locked, Ordering::SeqCst);
    }

    pub fn is_locked(&self) -> bool {
        self.locked.load(Ordering::SeqCst)
    }
}
