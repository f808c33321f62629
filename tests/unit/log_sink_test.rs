//! Tests for log sinks

use campaign_dispatch::core::{build_log_entry, InMemoryLogSink, LogLevel, LogSink, TracingLogSink};

#[test]
fn test_in_memory_log_sink() {
    let sink = InMemoryLogSink::new(10);

    sink.write(build_log_entry(
        LogLevel::Error,
        Some("1234-abcd".into()),
        "failed to enqueue task",
    ));

    let entries = sink.entries();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].level, LogLevel::Error);
    assert_eq!(entries[0].campaign.as_deref(), Some("1234-abcd"));
    assert_eq!(entries[0].message, "failed to enqueue task");
}

#[test]
fn test_log_sink_overflow() {
    let sink = InMemoryLogSink::new(2);

    sink.write(build_log_entry(LogLevel::Info, None, "one"));
    sink.write(build_log_entry(LogLevel::Warn, None, "two"));
    sink.write(build_log_entry(LogLevel::Error, None, "three"));

    let entries = sink.entries();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].message, "two"); // Oldest dropped
    assert_eq!(entries[1].message, "three");
}

#[test]
fn test_build_log_entry() {
    let first = build_log_entry(LogLevel::Warn, None, "delete failed");
    let second = build_log_entry(LogLevel::Warn, None, "delete failed");

    assert!(first.campaign.is_none());
    assert!(first.created_at_ms > 0);
    assert!(!first.entry_id.is_empty());
    assert_ne!(first.entry_id, second.entry_id);
}

#[test]
fn test_tracing_sink_accepts_entries() {
    campaign_dispatch::util::init_tracing();
    TracingLogSink.write(build_log_entry(LogLevel::Error, Some("1234-abcd".into()), "boom"));
}
