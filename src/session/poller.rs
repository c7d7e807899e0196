use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::coordinator::SessionCoordinator;
use super::state::SessionState;

/// Spawn the recording-status poller for one session generation
///
/// The poller asks the backend for ground-truth recording status on a
/// fixed interval; a `false` answer while the coordinator still believes
/// it is recording means the backend stopped on its own (silence timeout),
/// which is surfaced as an auto-stop. Poll failures are logged and retried
/// on the next tick, never escalated.
///
/// The coordinator aborts the task when the state leaves `Recording`; the
/// loop also re-checks state and generation on every tick so a dangling
/// tick can never act on a newer session.
pub(crate) fn spawn(coordinator: Arc<SessionCoordinator>, generation: u64) -> JoinHandle<()> {
    let interval = tick_interval(
        coordinator.poller_config().interval_ms,
        coordinator.poller_config().jitter_ms,
    );

    tokio::spawn(async move {
        debug!(
            "Status poller started (generation {}, every {:?})",
            generation, interval
        );

        loop {
            tokio::time::sleep(interval).await;

            if coordinator.state().await != SessionState::Recording
                || coordinator.generation() != generation
            {
                break;
            }

            match coordinator.backend().recording_status().await {
                Ok(true) => {}
                Ok(false) => {
                    debug!("Backend reports not recording, raising auto-stop");
                    coordinator.handle_auto_stop().await;
                    break;
                }
                Err(e) => {
                    warn!("Recording status poll failed, retrying next tick: {}", e);
                }
            }
        }

        debug!("Status poller stopped (generation {})", generation);
    })
}

/// Poll interval with optional jitter
///
/// Detection latency for an auto-stop is bounded by `interval_ms +
/// jitter_ms`. The jitter offset is fixed per poller so ticks stay evenly
/// spaced within a session.
fn tick_interval(interval_ms: u64, jitter_ms: u64) -> Duration {
    let jitter = match jitter_ms {
        0 => 0,
        j => SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| u64::from(d.subsec_millis()) % j)
            .unwrap_or(0),
    };
    Duration::from_millis(interval_ms + jitter)
}

#[cfg(test)]
mod tests {
    use super::tick_interval;
    use std::time::Duration;

    #[test]
    fn test_tick_interval_without_jitter() {
        assert_eq!(tick_interval(1000, 0), Duration::from_millis(1000));
    }

    #[test]
    fn test_tick_interval_jitter_bounds() {
        for _ in 0..10 {
            let interval = tick_interval(1000, 250);
            assert!(interval >= Duration::from_millis(1000));
            assert!(interval < Duration::from_millis(1250));
        }
    }
}
