//! API surface for triggering dispatches.

pub mod api;

pub use api::{dispatch_campaign, health, ApiResponse, Health};
