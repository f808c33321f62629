//! External durable task queue abstraction.

use async_trait::async_trait;

use crate::core::error::QueueError;
use crate::model::{QueueName, TaskDescriptor};

/// Client for the external task-queue service.
///
/// Implementations must be safe to call concurrently; the dispatcher enqueues
/// with bounded parallelism.
#[async_trait]
pub trait TaskQueueClient: Send + Sync {
    /// Enqueue a task, returning the identifier the service assigned.
    async fn enqueue(&self, task: &TaskDescriptor) -> Result<String, QueueError>;

    /// Delete a previously enqueued task.
    ///
    /// Returns [`QueueError::NotFound`] when the task is already gone; callers
    /// compensating a failed dispatch treat that as success.
    async fn delete(&self, queue: QueueName, task_id: &str) -> Result<(), QueueError>;
}
