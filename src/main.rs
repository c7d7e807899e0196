use anyhow::Result;
use clap::Parser;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::info;

use voice_session::{
    Config, Device, DeviceRegistry, EventSubscriptionManager, GenerationCounter, Initializer,
    ModelSize, RawBackendEvent, RecognitionGateway, RecorderBackend, SessionCoordinator,
    SessionState, SetupStatus, TranscriptStore,
};

#[derive(Parser)]
#[command(name = "voice-session", about = "Run a scripted demo session")]
struct Args {
    /// Config file (without extension), e.g. config/voice-session
    #[arg(long)]
    config: Option<String>,

    /// Input device name override
    #[arg(long)]
    device: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();

    let cfg = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };

    info!("voice-session v0.1.0");
    info!(
        "Poll interval: {} ms (+{} ms jitter)",
        cfg.poller.interval_ms, cfg.poller.jitter_ms
    );

    // Wire the coordinator against a scripted backend and drive one full
    // capture-to-text cycle as a smoke run.
    let backend: Arc<ScriptedBackend> = Arc::new(ScriptedBackend::new(
        "the quick brown fox jumps over the lazy dog",
    ));
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
        gateway,
        generation,
        cfg.poller.clone(),
    );
    let manager = EventSubscriptionManager::new(backend_dyn.clone(), coordinator.clone());
    let initializer = Initializer::new(backend_dyn, cfg.model.size);

    let subscription = manager.acquire();

    initializer.ensure_initialized().await?;
    registry.load_devices().await?;
    info!(
        "Devices: {:?}, selected: {:?}",
        registry.available_devices(),
        registry.selected_device().map(|d| d.name)
    );

    let mut snapshots = coordinator.subscribe();

    coordinator.start_session(args.device).await?;
    tokio::time::sleep(Duration::from_millis(300)).await;
    coordinator.stop_session().await?;

    // Wait for the session to settle back on Idle after recognition.
    loop {
        if snapshots.borrow().state == SessionState::Idle {
            break;
        }
        snapshots.changed().await?;
    }

    info!("Recognized text: {:?}", store.text());
    info!("History: {:?}", store.history_texts());

    subscription.release();

    Ok(())
}

/// In-process backend stand-in for the demo run
///
/// Stopping the capture emits a `processing-finished` event shortly after,
/// the way the real audio worker does once post-processing lands.
struct ScriptedBackend {
    recording: AtomicBool,
    events_tx: std::sync::Mutex<Option<mpsc::Sender<RawBackendEvent>>>,
    transcript: String,
}

impl ScriptedBackend {
    fn new(transcript: &str) -> Self {
        Self {
            recording: AtomicBool::new(false),
            events_tx: std::sync::Mutex::new(None),
            transcript: transcript.to_string(),
        }
    }
}

#[async_trait::async_trait]
impl RecorderBackend for ScriptedBackend {
    async fn list_input_devices(&self) -> Result<Vec<Device>> {
        Ok(vec![Device::new("Demo Microphone")])
    }

    async fn default_input_device(&self) -> Result<Device> {
        Ok(Device::new("Demo Microphone"))
    }

    async fn start_recording(&self, device: &str) -> Result<()> {
        info!("[backend] start_recording on '{}'", device);
        self.recording.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn stop_recording(&self) -> Result<()> {
        info!("[backend] stop_recording");
        self.recording.store(false, Ordering::SeqCst);

        let tx = self.events_tx.lock().unwrap().clone();
        if let Some(tx) = tx {
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(100)).await;
                let payload = serde_json::json!(["/tmp/demo-pre.wav", "/tmp/demo-post.wav"]);
                let _ = tx
                    .send(RawBackendEvent::new("processing-finished", payload))
                    .await;
            });
        }
        Ok(())
    }

    async fn recording_status(&self) -> Result<bool> {
        Ok(self.recording.load(Ordering::SeqCst))
    }

    async fn recognize_audio(&self, audio_path: &str) -> Result<String> {
        info!("[backend] recognize_audio({})", audio_path);
        tokio::time::sleep(Duration::from_millis(200)).await;
        Ok(self.transcript.clone())
    }

    async fn init_model(&self, size: ModelSize) -> Result<()> {
        info!("[backend] init_model({:?})", size);
        Ok(())
    }

    async fn setup_status(&self) -> Result<SetupStatus> {
        Ok(SetupStatus {
            models_initialized: true,
            default_model_installed: true,
            available_models: vec!["base".to_string()],
            installed_models: vec!["base".to_string()],
        })
    }

    async fn initialize_app(&self) -> Result<SetupStatus> {
        self.setup_status().await
    }

    async fn subscribe_events(&self) -> Result<mpsc::Receiver<RawBackendEvent>> {
        let (tx, rx) = mpsc::channel(16);
        *self.events_tx.lock().unwrap() = Some(tx);
        Ok(rx)
    }
}
