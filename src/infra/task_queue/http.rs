//! HTTP task-queue client.
//!
//! Talks to a queue service exposing
//! `POST {endpoint}/queues/{queue}/tasks` and
//! `DELETE {endpoint}/queues/{queue}/tasks/{id}`. Transport errors and 5xx
//! replies are retried with exponential backoff; anything else is final.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

use crate::config::TaskQueueConfig;
use crate::core::error::{ConfigError, QueueError};
use crate::core::task_queue::TaskQueueClient;
use crate::model::{QueueName, TaskDescriptor};

const MAX_ERROR_BODY: usize = 512;

#[derive(Serialize)]
struct CreateTaskRequest<'a> {
    name: &'a str,
    url: &'a str,
    schedule_time: String,
    payload: &'a serde_json::Value,
}

#[derive(Deserialize)]
struct CreateTaskResponse {
    name: String,
}

/// Task-queue client over HTTP.
#[derive(Clone)]
pub struct HttpTaskQueue {
    client: Client,
    endpoint: String,
    max_attempts: u32,
    backoff: Duration,
}

impl HttpTaskQueue {
    /// Build a client from configuration.
    pub fn from_config(cfg: &TaskQueueConfig) -> Result<Self, ConfigError> {
        let endpoint = cfg
            .endpoint
            .as_deref()
            .map(str::trim)
            .filter(|e| !e.is_empty())
            .ok_or_else(|| ConfigError::Invalid {
                field: "task_queue.endpoint",
                reason: "required for the http backend".into(),
            })?;
        Ok(Self::new(
            Client::new(),
            endpoint,
            cfg.max_attempts,
            Duration::from_millis(cfg.backoff_ms),
        ))
    }

    /// Build a client around an existing `reqwest` client.
    pub fn new(client: Client, endpoint: &str, max_attempts: u32, backoff: Duration) -> Self {
        Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_owned(),
            max_attempts: max_attempts.max(1),
            backoff,
        }
    }

    fn tasks_url(&self, queue: QueueName) -> String {
        format!("{}/queues/{}/tasks", self.endpoint, queue.as_str())
    }

    /// Send a request built by `build`, retrying retryable failures.
    async fn send_with_retry<F>(&self, mut build: F) -> Result<reqwest::Response, QueueError>
    where
        F: FnMut() -> reqwest::RequestBuilder + Send,
    {
        let mut attempt = 1;
        loop {
            let last = attempt >= self.max_attempts;
            match build().send().await {
                Ok(response) if response.status().is_server_error() && !last => {
                    tracing::warn!(
                        "task queue answered {} (attempt {} of {}), retrying",
                        response.status(),
                        attempt,
                        self.max_attempts
                    );
                }
                Ok(response) => return Ok(response),
                Err(err) if !last => {
                    tracing::warn!(
                        "task queue request failed (attempt {} of {}): {}",
                        attempt,
                        self.max_attempts,
                        err
                    );
                }
                Err(err) => return Err(QueueError::Transport(err.to_string())),
            }
            tokio::time::sleep(self.backoff * 2u32.saturating_pow(attempt - 1)).await;
            attempt += 1;
        }
    }
}

async fn rejected(response: reqwest::Response) -> QueueError {
    let status = response.status().as_u16();
    let mut body = response.text().await.unwrap_or_default();
    if body.len() > MAX_ERROR_BODY {
        let mut cut = MAX_ERROR_BODY;
        while !body.is_char_boundary(cut) {
            cut -= 1;
        }
        body.truncate(cut);
    }
    QueueError::Rejected { status, body }
}

#[async_trait]
impl TaskQueueClient for HttpTaskQueue {
    async fn enqueue(&self, task: &TaskDescriptor) -> Result<String, QueueError> {
        let url = self.tasks_url(task.queue);
        let body = CreateTaskRequest {
            name: &task.task_id,
            url: &task.url,
            schedule_time: task.execute_at.to_rfc3339(),
            payload: &task.payload,
        };
        let response = self
            .send_with_retry(|| self.client.post(&url).json(&body))
            .await?;
        if !response.status().is_success() {
            return Err(rejected(response).await);
        }
        let created: CreateTaskResponse = response
            .json()
            .await
            .map_err(|e| QueueError::Transport(format!("unreadable reply: {e}")))?;
        tracing::debug!("enqueued task {} on {}", created.name, task.queue.as_str());
        Ok(created.name)
    }

    async fn delete(&self, queue: QueueName, task_id: &str) -> Result<(), QueueError> {
        let url = format!("{}/{}", self.tasks_url(queue), task_id);
        let response = self.send_with_retry(|| self.client.delete(&url)).await?;
        match response.status() {
            status if status.is_success() => Ok(()),
            StatusCode::NOT_FOUND => Err(QueueError::NotFound(task_id.to_owned())),
            _ => Err(rejected(response).await),
        }
    }
}
