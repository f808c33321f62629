//! Configuration models for dispatch limits and the task-queue backend.

pub mod dispatch;

pub use dispatch::{DispatchConfig, QueueBackendConfig, TaskQueueConfig};
