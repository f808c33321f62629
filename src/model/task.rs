//! Task descriptors staged for the external task queue.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Channel, DisplayId};

/// Named queue on the task-queue service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueueName {
    /// Email delivery callbacks.
    Email,
    /// SMS delivery callbacks.
    Sms,
}

impl QueueName {
    /// Queue serving the given channel.
    pub const fn for_channel(channel: Channel) -> Self {
        match channel {
            Channel::Email => Self::Email,
            Channel::Sms => Self::Sms,
        }
    }

    /// Name used on the wire.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Email => "email",
            Self::Sms => "sms",
        }
    }

    /// Path segment of the delivery callback for this queue.
    const fn callback_path(self) -> &'static str {
        match self {
            Self::Email => "emails",
            Self::Sms => "sms",
        }
    }
}

/// A task staged in memory until it is enqueued.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskDescriptor {
    /// When the queue should fire the callback.
    pub execute_at: DateTime<Utc>,
    /// Callback URL.
    pub url: String,
    /// Target queue.
    pub queue: QueueName,
    /// Task name, the send record's display id.
    pub task_id: String,
    /// Callback body.
    pub payload: serde_json::Value,
}

impl TaskDescriptor {
    /// Delivery callback for a send record.
    pub fn for_send(
        base_url: &str,
        channel: Channel,
        display_id: &DisplayId,
        execute_at: DateTime<Utc>,
    ) -> Self {
        let queue = QueueName::for_channel(channel);
        Self {
            execute_at,
            url: format!(
                "{}/{}/{}",
                base_url.trim_end_matches('/'),
                queue.callback_path(),
                display_id
            ),
            queue,
            task_id: display_id.to_string(),
            payload: serde_json::json!({}),
        }
    }
}
