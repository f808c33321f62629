//! In-memory task queue for development and testing.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::core::error::QueueError;
use crate::core::task_queue::TaskQueueClient;
use crate::model::{QueueName, TaskDescriptor};

#[derive(Default)]
struct QueueState {
    tasks: HashMap<(QueueName, String), TaskDescriptor>,
    enqueue_calls: usize,
    fail_enqueue_after: Option<usize>,
    lose_replies_after: Option<usize>,
    fail_deletes: bool,
    deleted: Vec<(QueueName, String)>,
}

/// In-memory queue keyed by queue name and task id.
///
/// Failure injection makes compensation paths observable in tests.
#[derive(Default)]
pub struct InMemoryTaskQueue {
    state: Mutex<QueueState>,
}

impl InMemoryTaskQueue {
    /// Create an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Accept the first `successes` enqueues, then reject every later one.
    pub fn fail_enqueue_after(&self, successes: usize) {
        self.state.lock().fail_enqueue_after = Some(successes);
    }

    /// Answer the first `successes` enqueues normally; later ones are stored
    /// but reported as a transport error, as when a reply is lost.
    pub fn lose_replies_after(&self, successes: usize) {
        self.state.lock().lose_replies_after = Some(successes);
    }

    /// Reject every delete with a transport error.
    pub fn fail_deletes(&self, fail: bool) {
        self.state.lock().fail_deletes = fail;
    }

    /// Snapshot of the tasks currently queued.
    pub fn tasks(&self) -> Vec<TaskDescriptor> {
        self.state.lock().tasks.values().cloned().collect()
    }

    /// Tasks removed through [`TaskQueueClient::delete`].
    pub fn deleted(&self) -> Vec<(QueueName, String)> {
        self.state.lock().deleted.clone()
    }

    /// Number of tasks currently queued.
    pub fn len(&self) -> usize {
        self.state.lock().tasks.len()
    }

    /// Whether nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.state.lock().tasks.is_empty()
    }
}

#[async_trait]
impl TaskQueueClient for InMemoryTaskQueue {
    async fn enqueue(&self, task: &TaskDescriptor) -> Result<String, QueueError> {
        let mut state = self.state.lock();
        state.enqueue_calls += 1;
        if state
            .fail_enqueue_after
            .is_some_and(|limit| state.enqueue_calls > limit)
        {
            return Err(QueueError::Rejected {
                status: 503,
                body: "injected enqueue failure".into(),
            });
        }
        let key = (task.queue, task.task_id.clone());
        if state.tasks.contains_key(&key) {
            return Err(QueueError::Rejected {
                status: 409,
                body: format!("task {} already exists", task.task_id),
            });
        }
        state.tasks.insert(key, task.clone());
        if state
            .lose_replies_after
            .is_some_and(|limit| state.enqueue_calls > limit)
        {
            return Err(QueueError::Transport("reply lost".into()));
        }
        Ok(task.task_id.clone())
    }

    async fn delete(&self, queue: QueueName, task_id: &str) -> Result<(), QueueError> {
        let mut state = self.state.lock();
        if state.fail_deletes {
            return Err(QueueError::Transport("injected delete failure".into()));
        }
        match state.tasks.remove(&(queue, task_id.to_owned())) {
            Some(_) => {
                state.deleted.push((queue, task_id.to_owned()));
                Ok(())
            }
            None => Err(QueueError::NotFound(task_id.to_owned())),
        }
    }
}
