use anyhow::Result;
use serde::Deserialize;

use crate::backend::ModelSize;

#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub poller: PollerConfig,
    #[serde(default)]
    pub model: ModelConfig,
}

/// Status poller tuning
///
/// Auto-stop detection latency is bounded by `interval_ms + jitter_ms`.
#[derive(Debug, Clone, Deserialize)]
pub struct PollerConfig {
    /// Milliseconds between recording-status queries
    #[serde(default = "default_poll_interval_ms")]
    pub interval_ms: u64,

    /// Upper bound for a per-session random offset added to the interval
    #[serde(default)]
    pub jitter_ms: u64,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_poll_interval_ms(),
            jitter_ms: 0,
        }
    }
}

fn default_poll_interval_ms() -> u64 {
    1000
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct ModelConfig {
    /// Whisper model size loaded at initialization
    #[serde(default)]
    pub size: ModelSize,
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .build()?;

        Ok(settings.try_deserialize()?)
    }
}
