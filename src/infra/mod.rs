//! Infrastructure adapters for storage and the external task queue.

pub mod store;
pub mod task_queue;

pub use store::InMemoryStore;
#[cfg(feature = "http-queue")]
pub use task_queue::HttpTaskQueue;
pub use task_queue::InMemoryTaskQueue;
