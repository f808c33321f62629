//! API-facing response models and the dispatch entry point.

use serde::{Deserialize, Serialize};

use crate::core::{CampaignDispatcher, DispatchError, DispatchOutcome, ValidationFailure};

/// Response body and status for a dispatch request.
///
/// Never carries internal error detail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiResponse {
    /// HTTP status code.
    #[serde(skip)]
    pub status: u16,
    /// Human-readable outcome.
    pub message: String,
}

impl ApiResponse {
    fn new(status: u16, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    /// Whether the request succeeded, including the already-handled no-op.
    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }
}

/// Health response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Health {
    /// Healthy flag.
    pub ok: bool,
}

/// Dispatch a campaign and map the outcome to a response.
///
/// An already-handled campaign answers 200 so the trigger is not retried.
pub async fn dispatch_campaign(dispatcher: &CampaignDispatcher, display_id: &str) -> ApiResponse {
    match dispatcher.dispatch(display_id).await {
        Ok(DispatchOutcome::Dispatched(_)) => ApiResponse::new(200, "Campaign dispatched"),
        Ok(DispatchOutcome::AlreadyHandled) => ApiResponse::new(200, "Campaign already handled"),
        Err(DispatchError::NotFound) => ApiResponse::new(404, "Not Found"),
        Err(DispatchError::Validation(failure)) => ApiResponse::new(400, validation_message(&failure)),
        Err(DispatchError::Internal(_)) => ApiResponse::new(500, "Internal Server Error"),
    }
}

fn validation_message(failure: &ValidationFailure) -> String {
    match failure {
        ValidationFailure::NoContacts => "No contacts found".into(),
        ValidationFailure::TooManyContacts { max, .. } => {
            format!("Too many contacts. Maximum is {max}")
        }
        ValidationFailure::SmsLimitExceeded { .. } => "SMS limit exceeded".into(),
    }
}

/// Return a health payload.
pub const fn health() -> Health {
    Health { ok: true }
}
