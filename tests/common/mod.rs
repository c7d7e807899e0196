// Shared test double for the recorder backend, plus wiring helpers.
#![allow(dead_code)]

use anyhow::{bail, Result};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::{mpsc, Semaphore};

use voice_session::{
    Device, DeviceRegistry, EventSubscriptionManager, GenerationCounter, Initializer, ModelSize,
    PollerConfig, RawBackendEvent, RecognitionGateway, RecorderBackend, SessionCoordinator,
    SessionState, SetupStatus, TranscriptStore,
};

/// Scriptable backend double with per-command failure flags and call
/// counters
pub struct MockBackend {
    pub devices: Mutex<Vec<Device>>,
    pub default_device: Mutex<Device>,
    pub transcript: Mutex<String>,

    /// Ground truth returned by `recording_status`
    pub recording: AtomicBool,

    pub fail_devices: AtomicBool,
    pub fail_start: AtomicBool,
    pub fail_stop: AtomicBool,
    pub fail_status: AtomicBool,
    pub fail_recognize: AtomicBool,
    pub fail_initialize: AtomicBool,

    pub list_calls: AtomicUsize,
    pub default_calls: AtomicUsize,
    pub start_calls: AtomicUsize,
    pub stop_calls: AtomicUsize,
    pub status_calls: AtomicUsize,
    pub recognize_calls: AtomicUsize,
    pub subscribe_calls: AtomicUsize,
    pub init_model_calls: AtomicUsize,
    pub initialize_app_calls: AtomicUsize,

    pub last_recognized_path: Mutex<Option<String>>,
    pub last_started_device: Mutex<Option<String>>,

    recognize_gate: Mutex<Option<Arc<Semaphore>>>,
    stop_gate: Mutex<Option<Arc<Semaphore>>>,
    events_tx: Mutex<Option<mpsc::Sender<RawBackendEvent>>>,
}

impl MockBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            devices: Mutex::new(vec![
                Device::new("Built-in Microphone"),
                Device::new("USB Microphone"),
            ]),
            default_device: Mutex::new(Device::new("Built-in Microphone")),
            transcript: Mutex::new("hello world".to_string()),
            recording: AtomicBool::new(false),
            fail_devices: AtomicBool::new(false),
            fail_start: AtomicBool::new(false),
            fail_stop: AtomicBool::new(false),
            fail_status: AtomicBool::new(false),
            fail_recognize: AtomicBool::new(false),
            fail_initialize: AtomicBool::new(false),
            list_calls: AtomicUsize::new(0),
            default_calls: AtomicUsize::new(0),
            start_calls: AtomicUsize::new(0),
            stop_calls: AtomicUsize::new(0),
            status_calls: AtomicUsize::new(0),
            recognize_calls: AtomicUsize::new(0),
            subscribe_calls: AtomicUsize::new(0),
            init_model_calls: AtomicUsize::new(0),
            initialize_app_calls: AtomicUsize::new(0),
            last_recognized_path: Mutex::new(None),
            last_started_device: Mutex::new(None),
            recognize_gate: Mutex::new(None),
            stop_gate: Mutex::new(None),
            events_tx: Mutex::new(None),
        })
    }

    pub fn set_transcript(&self, text: &str) {
        *self.transcript.lock().unwrap() = text.to_string();
    }

    /// Make `recognize_audio` block until a permit is added to the
    /// returned semaphore
    pub fn gate_recognize(&self) -> Arc<Semaphore> {
        let gate = Arc::new(Semaphore::new(0));
        *self.recognize_gate.lock().unwrap() = Some(gate.clone());
        gate
    }

    /// Make `stop_recording` block until a permit is added to the returned
    /// semaphore, simulating a delayed command reply
    pub fn gate_stop(&self) -> Arc<Semaphore> {
        let gate = Arc::new(Semaphore::new(0));
        *self.stop_gate.lock().unwrap() = Some(gate.clone());
        gate
    }

    /// True once the event receiver has been dropped (listener teardown)
    pub fn events_closed(&self) -> bool {
        self.events_tx
            .lock()
            .unwrap()
            .as_ref()
            .map(|tx| tx.is_closed())
            .unwrap_or(true)
    }

    pub fn subscribed(&self) -> bool {
        self.events_tx.lock().unwrap().is_some()
    }

    /// Push a raw event, waiting for the dispatch task to subscribe first
    pub async fn emit(&self, name: &str, payload: serde_json::Value) {
        for _ in 0..1000 {
            let tx = self.events_tx.lock().unwrap().clone();
            if let Some(tx) = tx {
                tx.send(RawBackendEvent::new(name, payload))
                    .await
                    .expect("event channel closed");
                return;
            }
            tokio::task::yield_now().await;
        }
        panic!("no event subscriber appeared");
    }

    pub async fn emit_processing_finished(&self, pre: &str, post: &str) {
        self.emit("processing-finished", serde_json::json!([pre, post]))
            .await;
    }
}

#[async_trait::async_trait]
impl RecorderBackend for MockBackend {
    async fn list_input_devices(&self) -> Result<Vec<Device>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_devices.load(Ordering::SeqCst) {
            bail!("device enumeration failed");
        }
        Ok(self.devices.lock().unwrap().clone())
    }

    async fn default_input_device(&self) -> Result<Device> {
        self.default_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_devices.load(Ordering::SeqCst) {
            bail!("no default input device");
        }
        Ok(self.default_device.lock().unwrap().clone())
    }

    async fn start_recording(&self, device: &str) -> Result<()> {
        self.start_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_start.load(Ordering::SeqCst) {
            bail!("device unavailable: {}", device);
        }
        *self.last_started_device.lock().unwrap() = Some(device.to_string());
        self.recording.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn stop_recording(&self) -> Result<()> {
        self.stop_calls.fetch_add(1, Ordering::SeqCst);

        let gate = self.stop_gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.acquire().await.expect("gate closed").forget();
        }

        if self.fail_stop.load(Ordering::SeqCst) {
            bail!("stop command failed");
        }
        self.recording.store(false, Ordering::SeqCst);
        Ok(())
    }

    async fn recording_status(&self) -> Result<bool> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_status.load(Ordering::SeqCst) {
            bail!("status query failed");
        }
        Ok(self.recording.load(Ordering::SeqCst))
    }

    async fn recognize_audio(&self, audio_path: &str) -> Result<String> {
        self.recognize_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_recognized_path.lock().unwrap() = Some(audio_path.to_string());

        let gate = self.recognize_gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.acquire().await.expect("gate closed").forget();
        }

        if self.fail_recognize.load(Ordering::SeqCst) {
            bail!("recognition engine error");
        }
        Ok(self.transcript.lock().unwrap().clone())
    }

    async fn init_model(&self, _size: ModelSize) -> Result<()> {
        self.init_model_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_initialize.load(Ordering::SeqCst) {
            bail!("model load failed");
        }
        Ok(())
    }

    async fn setup_status(&self) -> Result<SetupStatus> {
        Ok(SetupStatus {
            models_initialized: true,
            default_model_installed: true,
            available_models: vec!["tiny".into(), "base".into()],
            installed_models: vec!["base".into()],
        })
    }

    async fn initialize_app(&self) -> Result<SetupStatus> {
        self.initialize_app_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_initialize.load(Ordering::SeqCst) {
            bail!("first-run setup failed");
        }
        self.setup_status().await
    }

    async fn subscribe_events(&self) -> Result<mpsc::Receiver<RawBackendEvent>> {
        self.subscribe_calls.fetch_add(1, Ordering::SeqCst);
        let (tx, rx) = mpsc::channel(16);
        *self.events_tx.lock().unwrap() = Some(tx);
        Ok(rx)
    }
}

/// A fully wired coordinator stack over a mock backend
pub struct TestStack {
    pub backend: Arc<MockBackend>,
    pub store: Arc<TranscriptStore>,
    pub registry: Arc<DeviceRegistry>,
    pub gateway: Arc<RecognitionGateway>,
    pub coordinator: Arc<SessionCoordinator>,
    pub manager: Arc<EventSubscriptionManager>,
    pub initializer: Arc<Initializer>,
}

pub fn stack() -> TestStack {
    stack_with(MockBackend::new(), PollerConfig::default())
}

pub fn stack_with(backend: Arc<MockBackend>, poller: PollerConfig) -> TestStack {
    let backend_dyn: Arc<dyn RecorderBackend> = backend.clone();
    let store = Arc::new(TranscriptStore::new());
    let generation = GenerationCounter::new();
    let registry = Arc::new(DeviceRegistry::new(backend_dyn.clone()));
    let gateway = Arc::new(RecognitionGateway::new(
        backend_dyn.clone(),
        store.clone(),
        generation.clone(),
    ));
    let coordinator = SessionCoordinator::new(
        backend_dyn.clone(),
        registry.clone(),
        gateway.clone(),
        generation,
        poller,
    );
    let manager = EventSubscriptionManager::new(backend_dyn.clone(), coordinator.clone());
    let initializer = Arc::new(Initializer::new(backend_dyn, ModelSize::Base));

    TestStack {
        backend,
        store,
        registry,
        gateway,
        coordinator,
        manager,
        initializer,
    }
}

/// Await a session state via the snapshot watch channel
pub async fn wait_for_state(coordinator: &Arc<SessionCoordinator>, target: SessionState) {
    let mut rx = coordinator.subscribe();
    tokio::time::timeout(std::time::Duration::from_secs(10), async {
        loop {
            if rx.borrow().state == target {
                return;
            }
            rx.changed().await.expect("snapshot channel closed");
        }
    })
    .await
    .unwrap_or_else(|_| panic!("timed out waiting for state {:?}", target));
}

/// Spin on a condition without advancing time
pub async fn wait_until(what: &str, mut cond: impl FnMut() -> bool) {
    for _ in 0..1000 {
        if cond() {
            return;
        }
        tokio::task::yield_now().await;
    }
    panic!("condition not reached: {}", what);
}
