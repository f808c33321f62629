//! Sender identities used for email sends.

use serde::{Deserialize, Serialize};

use super::AccountId;

/// Internal numeric key of a sender identity.
pub type SenderId = i64;

/// An email address bound to a provider with a daily send limit.
///
/// Usage is derived from send records, never stored here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SenderIdentity {
    /// Internal key.
    pub id: SenderId,
    /// Owning account.
    pub account_id: AccountId,
    /// From address.
    pub address: String,
    /// Provider name, e.g. the SMTP relay.
    pub provider: String,
    /// Maximum emails per calendar day (UTC).
    pub daily_limit: u32,
}
