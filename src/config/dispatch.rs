//! Dispatch and task-queue configuration structures.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::core::error::ConfigError;
use crate::core::quota::DEFAULT_WINDOW_DAYS;

const ENV_MAX_CONTACTS: &str = "MAX_CONTACTS";
const ENV_MAX_SMS_PER_DAY: &str = "MAX_SMS_PER_DAY";
const ENV_CHUNK_SIZE: &str = "CHUNK_SIZE";
const ENV_API_URL: &str = "API_URL";
const ENV_TASK_QUEUE_BACKEND: &str = "TASK_QUEUE_BACKEND";
const ENV_TASK_QUEUE_ENDPOINT: &str = "TASK_QUEUE_ENDPOINT";
const ENV_TASK_QUEUE_MAX_ATTEMPTS: &str = "TASK_QUEUE_MAX_ATTEMPTS";
const ENV_TASK_QUEUE_BACKOFF_MS: &str = "TASK_QUEUE_BACKOFF_MS";

const DEFAULT_CHUNK_SIZE: usize = 50;
const DEFAULT_MAX_ATTEMPTS: u32 = 3;
const DEFAULT_BACKOFF_MS: u64 = 200;

/// Task-queue backend selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueueBackendConfig {
    /// In-memory queue for development/testing.
    #[default]
    InMemory,
    /// HTTP task-queue service.
    Http,
}

impl FromStr for QueueBackendConfig {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "in_memory" | "memory" => Ok(Self::InMemory),
            "http" => Ok(Self::Http),
            other => Err(ConfigError::Invalid {
                field: "task_queue.backend",
                reason: format!("unknown backend `{other}`"),
            }),
        }
    }
}

/// Task-queue client configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskQueueConfig {
    /// Backend selection.
    #[serde(default)]
    pub backend: QueueBackendConfig,
    /// Base URL of the queue service, required for the HTTP backend.
    #[serde(default)]
    pub endpoint: Option<String>,
    /// Attempts per request, including the first.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Delay before the first retry; doubles on each further retry.
    #[serde(default = "default_backoff_ms")]
    pub backoff_ms: u64,
}

impl Default for TaskQueueConfig {
    fn default() -> Self {
        Self {
            backend: QueueBackendConfig::InMemory,
            endpoint: None,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff_ms: DEFAULT_BACKOFF_MS,
        }
    }
}

impl TaskQueueConfig {
    /// Validate task-queue configuration values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.backend == QueueBackendConfig::Http {
            if self.endpoint.as_deref().map_or(true, |e| e.trim().is_empty()) {
                return Err(ConfigError::Invalid {
                    field: "task_queue.endpoint",
                    reason: "required for the http backend".into(),
                });
            }
            if self.max_attempts == 0 {
                return Err(ConfigError::Invalid {
                    field: "task_queue.max_attempts",
                    reason: "must be greater than 0".into(),
                });
            }
        }
        Ok(())
    }
}

/// Root dispatch configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchConfig {
    /// Most contacts a single campaign may target.
    pub max_contacts: usize,
    /// Most SMS scheduled per day for phone-only contacts.
    pub max_sms_per_day: usize,
    /// Concurrency ceiling of every batch.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    /// Base URL the delivery callbacks are built from.
    pub api_base_url: String,
    /// Length of the scheduling window in days.
    #[serde(skip, default = "default_window_days")]
    pub window_days: u32,
    /// Task-queue client settings.
    #[serde(default)]
    pub task_queue: TaskQueueConfig,
}

impl DispatchConfig {
    /// Configuration with the given limits and defaults for everything else.
    pub fn new(max_contacts: usize, max_sms_per_day: usize, api_base_url: impl Into<String>) -> Self {
        Self {
            max_contacts,
            max_sms_per_day,
            chunk_size: DEFAULT_CHUNK_SIZE,
            api_base_url: api_base_url.into(),
            window_days: DEFAULT_WINDOW_DAYS,
            task_queue: TaskQueueConfig::default(),
        }
    }

    /// Override the batch concurrency ceiling.
    #[must_use]
    pub const fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    /// Validate dispatch configuration values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = [
            ("max_contacts", self.max_contacts),
            ("max_sms_per_day", self.max_sms_per_day),
            ("chunk_size", self.chunk_size),
        ];
        for (field, value) in positive {
            if value == 0 {
                return Err(ConfigError::Invalid {
                    field,
                    reason: "must be greater than 0".into(),
                });
            }
        }
        if self.window_days != DEFAULT_WINDOW_DAYS {
            return Err(ConfigError::Invalid {
                field: "window_days",
                reason: format!("the scheduling window is fixed at {DEFAULT_WINDOW_DAYS} days"),
            });
        }
        if self.api_base_url.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "api_base_url",
                reason: "must not be empty".into(),
            });
        }
        self.task_queue.validate()
    }

    /// Parse dispatch configuration from a JSON string and validate.
    pub fn from_json_str(input: &str) -> Result<Self, ConfigError> {
        let cfg: Self = serde_json::from_str(input).map_err(|e| ConfigError::Parse(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Load from the process environment, reading a `.env` file first if one
    /// exists.
    pub fn from_env() -> Result<Self, ConfigError> {
        if let Err(err) = dotenvy::dotenv() {
            if !err.not_found() {
                tracing::warn!("ignoring unreadable .env file: {}", err);
            }
        }
        Self::from_env_with(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary key lookup and validate.
    pub fn from_env_with<F>(get_env: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &'static str| {
            get_env(key).ok_or_else(|| ConfigError::Invalid {
                field: key,
                reason: "missing".into(),
            })
        };

        let task_queue = TaskQueueConfig {
            backend: get_env(ENV_TASK_QUEUE_BACKEND)
                .map(|v| v.parse::<QueueBackendConfig>())
                .transpose()?
                .unwrap_or_default(),
            endpoint: get_env(ENV_TASK_QUEUE_ENDPOINT),
            max_attempts: parse_or(&get_env, ENV_TASK_QUEUE_MAX_ATTEMPTS, DEFAULT_MAX_ATTEMPTS)?,
            backoff_ms: parse_or(&get_env, ENV_TASK_QUEUE_BACKOFF_MS, DEFAULT_BACKOFF_MS)?,
        };

        let cfg = Self {
            max_contacts: parse(ENV_MAX_CONTACTS, &required(ENV_MAX_CONTACTS)?)?,
            max_sms_per_day: parse(ENV_MAX_SMS_PER_DAY, &required(ENV_MAX_SMS_PER_DAY)?)?,
            chunk_size: parse_or(&get_env, ENV_CHUNK_SIZE, DEFAULT_CHUNK_SIZE)?,
            api_base_url: required(ENV_API_URL)?,
            window_days: DEFAULT_WINDOW_DAYS,
            task_queue,
        };
        cfg.validate()?;
        Ok(cfg)
    }
}

fn parse<T: FromStr>(key: &'static str, raw: &str) -> Result<T, ConfigError> {
    raw.trim().parse().map_err(|_| ConfigError::Invalid {
        field: key,
        reason: format!("`{raw}` is not a valid number"),
    })
}

fn parse_or<T, F>(get_env: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    get_env(key).map_or(Ok(default), |raw| parse(key, &raw))
}

const fn default_chunk_size() -> usize {
    DEFAULT_CHUNK_SIZE
}

const fn default_window_days() -> u32 {
    DEFAULT_WINDOW_DAYS
}

const fn default_max_attempts() -> u32 {
    DEFAULT_MAX_ATTEMPTS
}

const fn default_backoff_ms() -> u64 {
    DEFAULT_BACKOFF_MS
}
