// Integration tests for application initialization: single-flight model
// load, fatal-until-retry failures, and configuration defaults.

mod common;

use common::stack;
use pretty_assertions::assert_eq;
use std::sync::atomic::Ordering;
use voice_session::{Config, InitState, PollerConfig, SessionError};

#[tokio::test]
async fn test_initialization_runs_once() {
    let s = stack();

    s.initializer.ensure_initialized().await.unwrap();
    s.initializer.ensure_initialized().await.unwrap();

    assert_eq!(s.initializer.state().await, InitState::Ready);
    assert_eq!(s.backend.initialize_app_calls.load(Ordering::SeqCst), 1);
    assert_eq!(s.backend.init_model_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_concurrent_initialization_is_single_flight() {
    let s = stack();

    let (a, b) = tokio::join!(
        s.initializer.ensure_initialized(),
        s.initializer.ensure_initialized()
    );
    a.unwrap();
    b.unwrap();

    assert_eq!(s.backend.initialize_app_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_failure_blocks_until_explicit_retry() {
    let s = stack();
    s.backend.fail_initialize.store(true, Ordering::SeqCst);

    let err = s.initializer.ensure_initialized().await.unwrap_err();
    assert!(matches!(err, SessionError::Initialization(_)));
    assert!(matches!(s.initializer.state().await, InitState::Failed(_)));

    // Subsequent ensure calls return the recorded failure without hitting
    // the backend again.
    s.initializer.ensure_initialized().await.unwrap_err();
    assert_eq!(s.backend.initialize_app_calls.load(Ordering::SeqCst), 1);

    // An explicit retry runs the whole sequence again.
    s.backend.fail_initialize.store(false, Ordering::SeqCst);
    s.initializer.retry().await.unwrap();
    assert_eq!(s.initializer.state().await, InitState::Ready);
    assert_eq!(s.backend.initialize_app_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_setup_status_passthrough() {
    let s = stack();

    let status = s.initializer.setup_status().await.unwrap();

    assert!(status.models_initialized);
    assert!(status.default_model_installed);
    assert_eq!(status.installed_models, vec!["base".to_string()]);
}

#[test]
fn test_config_defaults() {
    let cfg = Config::default();
    assert_eq!(cfg.poller.interval_ms, 1000);
    assert_eq!(cfg.poller.jitter_ms, 0);

    let poller = PollerConfig::default();
    assert_eq!(poller.interval_ms, 1000);
}
