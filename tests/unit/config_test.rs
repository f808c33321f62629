//! Tests for configuration validation and loading

use std::collections::HashMap;

use campaign_dispatch::config::{DispatchConfig, QueueBackendConfig, TaskQueueConfig};
use campaign_dispatch::core::ConfigError;

fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect();
    move |key| map.get(key).cloned()
}

#[test]
fn test_dispatch_config_defaults() {
    let cfg = DispatchConfig::new(5_000, 200, "https://api.example.com");
    assert_eq!(cfg.chunk_size, 50);
    assert_eq!(cfg.window_days, 29);
    assert_eq!(cfg.task_queue, TaskQueueConfig::default());
    assert!(cfg.validate().is_ok());
}

#[test]
fn test_dispatch_config_rejects_zero_limits() {
    let cases = [
        ("max_contacts", DispatchConfig::new(0, 200, "https://api.example.com")),
        ("max_sms_per_day", DispatchConfig::new(10, 0, "https://api.example.com")),
        (
            "chunk_size",
            DispatchConfig::new(10, 200, "https://api.example.com").with_chunk_size(0),
        ),
    ];
    for (field, cfg) in cases {
        match cfg.validate() {
            Err(ConfigError::Invalid { field: got, .. }) => assert_eq!(got, field),
            other => panic!("expected {field} to be rejected, got {other:?}"),
        }
    }
}

#[test]
fn test_dispatch_config_rejects_blank_url() {
    let cfg = DispatchConfig::new(10, 10, "  ");
    assert!(matches!(
        cfg.validate(),
        Err(ConfigError::Invalid { field: "api_base_url", .. })
    ));
}

#[test]
fn test_http_backend_needs_endpoint() {
    let mut queue = TaskQueueConfig {
        backend: QueueBackendConfig::Http,
        ..TaskQueueConfig::default()
    };
    assert!(queue.validate().is_err());

    queue.endpoint = Some("https://tasks.example.com".into());
    assert!(queue.validate().is_ok());

    queue.max_attempts = 0;
    assert!(queue.validate().is_err());
}

#[test]
fn test_from_json_str() {
    let cfg = DispatchConfig::from_json_str(
        r#"{
            "max_contacts": 1000,
            "max_sms_per_day": 300,
            "api_base_url": "https://api.example.com",
            "task_queue": { "backend": "http", "endpoint": "https://tasks.example.com" }
        }"#,
    )
    .unwrap();

    assert_eq!(cfg.max_contacts, 1000);
    assert_eq!(cfg.chunk_size, 50);
    assert_eq!(cfg.task_queue.backend, QueueBackendConfig::Http);
    assert_eq!(cfg.task_queue.max_attempts, 3);
}

#[test]
fn test_window_is_fixed() {
    let cfg = DispatchConfig::from_json_str(
        r#"{
            "max_contacts": 1000,
            "max_sms_per_day": 300,
            "api_base_url": "https://api.example.com",
            "window_days": 10
        }"#,
    )
    .unwrap();
    assert_eq!(cfg.window_days, 29);

    let mut cfg = DispatchConfig::new(1_000, 300, "https://api.example.com");
    cfg.window_days = 10;
    assert!(matches!(
        cfg.validate(),
        Err(ConfigError::Invalid { field: "window_days", .. })
    ));
}

#[test]
fn test_from_json_str_errors() {
    assert!(matches!(
        DispatchConfig::from_json_str("{not json"),
        Err(ConfigError::Parse(_))
    ));
    assert!(matches!(
        DispatchConfig::from_json_str(
            r#"{"max_contacts": 0, "max_sms_per_day": 1, "api_base_url": "x"}"#
        ),
        Err(ConfigError::Invalid { .. })
    ));
}

#[test]
fn test_from_env_with() {
    let cfg = DispatchConfig::from_env_with(env(&[
        ("MAX_CONTACTS", "2500"),
        ("MAX_SMS_PER_DAY", "150"),
        ("CHUNK_SIZE", "10"),
        ("API_URL", "https://api.example.com"),
        ("TASK_QUEUE_BACKEND", "HTTP"),
        ("TASK_QUEUE_ENDPOINT", "https://tasks.example.com"),
        ("TASK_QUEUE_BACKOFF_MS", "50"),
    ]))
    .unwrap();

    assert_eq!(cfg.max_contacts, 2500);
    assert_eq!(cfg.max_sms_per_day, 150);
    assert_eq!(cfg.chunk_size, 10);
    assert_eq!(cfg.api_base_url, "https://api.example.com");
    assert_eq!(cfg.task_queue.backend, QueueBackendConfig::Http);
    assert_eq!(cfg.task_queue.backoff_ms, 50);
    assert_eq!(cfg.task_queue.max_attempts, 3);
}

#[test]
fn test_from_env_with_missing_and_malformed() {
    let missing = DispatchConfig::from_env_with(env(&[
        ("MAX_CONTACTS", "10"),
        ("API_URL", "https://api.example.com"),
    ]));
    assert!(matches!(
        missing,
        Err(ConfigError::Invalid { field: "MAX_SMS_PER_DAY", .. })
    ));

    let malformed = DispatchConfig::from_env_with(env(&[
        ("MAX_CONTACTS", "ten"),
        ("MAX_SMS_PER_DAY", "10"),
        ("API_URL", "https://api.example.com"),
    ]));
    assert!(matches!(
        malformed,
        Err(ConfigError::Invalid { field: "MAX_CONTACTS", .. })
    ));

    let backend = DispatchConfig::from_env_with(env(&[
        ("MAX_CONTACTS", "10"),
        ("MAX_SMS_PER_DAY", "10"),
        ("API_URL", "https://api.example.com"),
        ("TASK_QUEUE_BACKEND", "carrier-pigeon"),
    ]));
    assert!(matches!(
        backend,
        Err(ConfigError::Invalid { field: "task_queue.backend", .. })
    ));
}

#[test]
fn test_backend_from_str() {
    assert_eq!("memory".parse::<QueueBackendConfig>(), Ok(QueueBackendConfig::InMemory));
    assert_eq!("in_memory".parse::<QueueBackendConfig>(), Ok(QueueBackendConfig::InMemory));
    assert_eq!(" Http ".parse::<QueueBackendConfig>(), Ok(QueueBackendConfig::Http));
    assert!("grpc".parse::<QueueBackendConfig>().is_err());
}
