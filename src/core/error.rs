//! Error types for dispatch operations.

use std::fmt;

use thiserror::Error;

/// Application-facing result using anyhow for unit-of-work contexts.
pub type AppResult<T> = Result<T, anyhow::Error>;

/// Errors produced by a campaign dispatch.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The campaign, its contact list, or the display id itself is unknown.
    #[error("not found")]
    NotFound,
    /// The campaign cannot be dispatched as requested.
    #[error("validation failed: {0}")]
    Validation(ValidationFailure),
    /// Anything else. Details go to the log sink, never to the caller.
    #[error("unexpected internal error")]
    Internal(#[source] anyhow::Error),
}

impl DispatchError {
    /// Wrap any error as an internal failure.
    pub fn internal(err: impl Into<anyhow::Error>) -> Self {
        Self::Internal(err.into())
    }
}

/// Reasons a campaign is rejected with a client-class response.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationFailure {
    /// The contact list has no reachable contacts.
    #[error("no contacts found")]
    NoContacts,
    /// The contact list exceeds the configured ceiling.
    #[error("too many contacts: {found} (maximum is {max})")]
    TooManyContacts {
        /// Contacts in the list.
        found: usize,
        /// Configured ceiling.
        max: usize,
    },
    /// Scheduling would push the account over its monthly SMS cap.
    #[error("sms limit exceeded: {used} of {cap} in {month}")]
    SmsLimitExceeded {
        /// Month checked, formatted `YYYY-MM`.
        month: String,
        /// Sent or scheduled SMS in that month, including this dispatch.
        used: u32,
        /// Account cap.
        cap: u32,
    },
}

/// Aggregate failure raised by the bounded batch executor.
///
/// Holds every failure observed up to and including the barrier that failed.
#[derive(Debug)]
pub struct BatchError {
    failures: Vec<anyhow::Error>,
}

impl BatchError {
    /// Build from the collected unit failures.
    pub fn new(failures: Vec<anyhow::Error>) -> Self {
        Self { failures }
    }

    /// Failures in the order they were observed.
    pub fn failures(&self) -> &[anyhow::Error] {
        &self.failures
    }

    /// Number of failed units.
    pub fn len(&self) -> usize {
        self.failures.len()
    }

    /// Whether no failures were recorded.
    pub fn is_empty(&self) -> bool {
        self.failures.is_empty()
    }
}

impl fmt::Display for BatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} batch unit(s) failed: ", self.failures.len())?;
        for (i, err) in self.failures.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{err}")?;
        }
        Ok(())
    }
}

impl std::error::Error for BatchError {}

/// Errors produced by data-access backends.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A referenced row does not exist.
    #[error("record not found: {0}")]
    NotFound(String),
    /// Backend-specific failure with context.
    #[error("backend error: {0}")]
    Backend(String),
}

/// Errors produced by task-queue clients.
#[derive(Debug, Error)]
pub enum QueueError {
    /// The task is not (or no longer) present in the queue.
    #[error("task not found: {0}")]
    NotFound(String),
    /// The queue service answered with a non-success status.
    #[error("queue rejected request with status {status}: {body}")]
    Rejected {
        /// Status code returned by the service.
        status: u16,
        /// Response body, possibly truncated.
        body: String,
    },
    /// The request never reached the service or the reply was unreadable.
    #[error("transport error: {0}")]
    Transport(String),
}

/// Invalid configuration values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// A field holds an unusable value.
    #[error("invalid `{field}`: {reason}")]
    Invalid {
        /// Offending field.
        field: &'static str,
        /// Why it was rejected.
        reason: String,
    },
    /// The configuration text could not be parsed.
    #[error("parse error: {0}")]
    Parse(String),
}
