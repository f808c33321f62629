//! Tests for builder modules

use std::sync::Arc;

use campaign_dispatch::builders::{build_dispatcher, build_task_queue};
use campaign_dispatch::config::{DispatchConfig, QueueBackendConfig, TaskQueueConfig};
use campaign_dispatch::core::{ConfigError, InMemoryLogSink};
use campaign_dispatch::infra::InMemoryStore;

#[test]
fn test_build_in_memory_queue() {
    assert!(build_task_queue(&TaskQueueConfig::default()).is_ok());
}

#[test]
fn test_build_http_queue_requires_endpoint() {
    let cfg = TaskQueueConfig {
        backend: QueueBackendConfig::Http,
        ..TaskQueueConfig::default()
    };
    assert!(matches!(
        build_task_queue(&cfg),
        Err(ConfigError::Invalid { field: "task_queue.endpoint", .. })
    ));
}

#[cfg(feature = "http-queue")]
#[test]
fn test_build_http_queue() {
    let cfg = TaskQueueConfig {
        backend: QueueBackendConfig::Http,
        endpoint: Some("https://tasks.example.com".into()),
        ..TaskQueueConfig::default()
    };
    assert!(build_task_queue(&cfg).is_ok());
}

#[test]
fn test_build_dispatcher() {
    let cfg = DispatchConfig::new(100, 10, "https://api.example.com").with_chunk_size(8);
    let dispatcher = build_dispatcher(
        cfg,
        Arc::new(InMemoryStore::new()),
        Arc::new(InMemoryLogSink::new(16)),
    )
    .unwrap();
    assert_eq!(dispatcher.config().chunk_size, 8);
    assert_eq!(dispatcher.config().max_contacts, 100);
}

#[test]
fn test_build_dispatcher_validates() {
    let cfg = DispatchConfig::new(100, 10, "https://api.example.com").with_chunk_size(0);
    let result = build_dispatcher(
        cfg,
        Arc::new(InMemoryStore::new()),
        Arc::new(InMemoryLogSink::new(16)),
    );
    assert!(result.is_err());
}
