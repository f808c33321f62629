//! Task-queue client adapters.

#[cfg(feature = "http-queue")]
pub mod http;
pub mod memory;

#[cfg(feature = "http-queue")]
pub use http::HttpTaskQueue;
pub use memory::InMemoryTaskQueue;
