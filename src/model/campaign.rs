//! Campaigns, the accounts that own them, and the contact lists they target.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::DisplayId;

/// Internal numeric key of a campaign.
pub type CampaignId = i64;
/// Internal numeric key of an account.
pub type AccountId = i64;
/// Internal numeric key of a contact list.
pub type ContactListId = i64;

/// Delivery channel of a send.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    /// Email through a sender identity.
    Email,
    /// Text message to the contact's phone.
    Sms,
}

impl Channel {
    /// The other channel.
    pub const fn opposite(self) -> Self {
        match self {
            Self::Email => Self::Sms,
            Self::Sms => Self::Email,
        }
    }
}

/// Lifecycle status of a campaign.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CampaignStatus {
    /// Waiting to be dispatched.
    Pending,
    /// Dispatched; sends are scheduled.
    InProgress,
    /// Every send has gone out.
    Completed,
    /// Dispatch was rejected or failed.
    Failed,
}

/// A marketing send job targeting one contact list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Campaign {
    /// Internal key.
    pub id: CampaignId,
    /// External identifier used to trigger the dispatch.
    pub display_id: DisplayId,
    /// Owning account.
    pub account_id: AccountId,
    /// Contact list the campaign targets.
    pub contact_list_id: ContactListId,
    /// Current status.
    pub status: CampaignStatus,
    /// Set once a dispatch has run to a terminal state.
    pub handled: bool,
    /// When `handled` was last set.
    pub handled_at: Option<DateTime<Utc>>,
    /// Channel the author prefers for the follow-up send.
    pub follow_up_channel: Channel,
    /// Days between the initial and follow-up send, if a follow-up is wanted.
    pub follow_up_delay_days: Option<u32>,
    /// Test campaigns write records but never touch the task queue.
    pub is_test: bool,
    /// Wall-clock duration of the last dispatch, in whole seconds.
    pub execution_time_secs: Option<u64>,
}

/// The account that owns campaigns, contacts and sender identities.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    /// Internal key.
    pub id: AccountId,
    /// External identifier.
    pub display_id: DisplayId,
    /// Maximum SMS sent or scheduled per calendar month.
    pub monthly_sms_cap: u32,
}

/// An imported contact list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContactList {
    /// Internal key.
    pub id: ContactListId,
    /// External identifier.
    pub display_id: DisplayId,
    /// Owning account.
    pub account_id: AccountId,
    /// Set once the import has finished.
    #[serde(default)]
    pub handled: bool,
}
