//! Tests for error types

use campaign_dispatch::core::{BatchError, DispatchError, QueueError, StoreError, ValidationFailure};

#[test]
fn test_validation_failure_display() {
    assert_eq!(ValidationFailure::NoContacts.to_string(), "no contacts found");
    assert_eq!(
        ValidationFailure::TooManyContacts { found: 12, max: 10 }.to_string(),
        "too many contacts: 12 (maximum is 10)"
    );
    let sms = ValidationFailure::SmsLimitExceeded {
        month: "2026-03".into(),
        used: 101,
        cap: 100,
    };
    assert_eq!(sms.to_string(), "sms limit exceeded: 101 of 100 in 2026-03");
}

#[test]
fn test_internal_error_hides_detail() {
    let err = DispatchError::internal(StoreError::Backend("connection reset".into()));
    assert_eq!(err.to_string(), "unexpected internal error");

    let source = std::error::Error::source(&err).expect("internal errors keep their source");
    assert!(source.to_string().contains("connection reset"));
}

#[test]
fn test_batch_error_lists_failures() {
    let err = BatchError::new(vec![anyhow::anyhow!("first"), anyhow::anyhow!("second")]);
    assert_eq!(err.len(), 2);
    assert!(!err.is_empty());
    let message = err.to_string();
    assert!(message.starts_with("2 batch unit(s) failed"), "{message}");
    assert!(message.contains("first"));
    assert!(message.contains("second"));
}

#[test]
fn test_queue_error_display() {
    let err = QueueError::Rejected {
        status: 503,
        body: "unavailable".into(),
    };
    assert_eq!(err.to_string(), "queue rejected request with status 503: unavailable");
    assert_eq!(QueueError::NotFound("t1".into()).to_string(), "task not found: t1");
}
