//! # Campaign Dispatch
//!
//! Turns an approved marketing campaign and its contact list into a
//! time-distributed set of per-contact email and SMS send tasks.
//!
//! A dispatch spreads contacts over a rolling 29-day window, honoring each
//! sender identity's daily quota and the account's monthly SMS cap. All send
//! records are written in one transaction; tasks already pushed to the
//! external queue are deleted again if anything fails, so a failed dispatch
//! leaves nothing behind.
//!
//! ## Key Features
//!
//! - **Bounded Batches**: every fan-out runs through a barrier-draining executor
//!   with a concurrency ceiling and aggregate failure reporting
//! - **Quota Admission**: per-sender daily quota and per-account monthly SMS cap
//! - **Channel Planning**: initial and follow-up channel chosen from the templates
//!   a campaign carries
//! - **Compensation**: rollback plus deletion of enqueued tasks on failure
//! - **Pluggable Backends**: store, task queue, renderer and log sink are traits
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use campaign_dispatch::builders::build_dispatcher;
//! use campaign_dispatch::config::DispatchConfig;
//! use campaign_dispatch::core::TracingLogSink;
//! use campaign_dispatch::infra::InMemoryStore;
//! use campaign_dispatch::runtime::dispatch_campaign;
//!
//! let cfg = DispatchConfig::from_env()?;
//! let dispatcher = build_dispatcher(cfg, Arc::new(InMemoryStore::new()), Arc::new(TracingLogSink))?;
//! let response = dispatch_campaign(&dispatcher, "1234-abcd").await;
//! ```
//!
//! For complete examples, see `tests/dispatch_test.rs`.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

/// Dispatch abstractions, quota accounting, and orchestration.
pub mod core;
/// Configuration models for dispatch limits and the task-queue backend.
pub mod config;
/// Builders to construct dispatch components from configuration.
pub mod builders;
/// Infrastructure adapters for storage and the external task queue.
pub mod infra;
/// Domain records read and written by a dispatch.
pub mod model;
/// API surface for triggering dispatches.
pub mod runtime;
/// Shared utilities.
pub mod util;
