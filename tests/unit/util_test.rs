//! Tests for utility functions

use campaign_dispatch::util::{init_tracing, now_ms};

#[test]
fn test_now_ms_moves_forward() {
    let first = now_ms();
    let second = now_ms();
    assert!(first > 0);
    assert!(second >= first);
}

#[test]
fn test_init_tracing_is_idempotent() {
    init_tracing();
    init_tracing();
}
