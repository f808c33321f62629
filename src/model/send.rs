//! Send records written by a dispatch, one per scheduled attempt.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{AccountId, Channel, ContactId, DisplayId, SenderId, TemplateId};

/// Internal numeric key of a send record.
pub type SendRecordId = i64;

/// Delivery status of a send record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SendStatus {
    /// Waiting for its task to fire.
    Scheduled,
    /// Delivered to the provider.
    Sent,
    /// Delivery failed; does not count against quotas.
    Failed,
}

/// A persisted email or SMS send.
///
/// The display id doubles as the external task identifier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendRecord {
    /// Internal key.
    pub id: SendRecordId,
    /// External identifier and task id.
    pub display_id: DisplayId,
    /// Email or SMS.
    pub channel: Channel,
    /// Recipient.
    pub contact_id: ContactId,
    /// Account the send is billed to.
    pub account_id: AccountId,
    /// Sender identity, email only.
    pub sender_id: Option<SenderId>,
    /// Template the content was rendered from.
    pub template_id: TemplateId,
    /// Rendered subject line, email only.
    pub subject: Option<String>,
    /// Rendered body.
    pub body: String,
    /// When the task is due to fire.
    pub execute_at: DateTime<Utc>,
    /// When the provider accepted it.
    pub sent_at: Option<DateTime<Utc>>,
    /// Delivery status.
    pub status: SendStatus,
}

/// A send about to be written inside the dispatch transaction.
#[derive(Debug, Clone)]
pub struct NewSendRecord {
    /// Email or SMS.
    pub channel: Channel,
    /// Recipient.
    pub contact_id: ContactId,
    /// Account the send is billed to.
    pub account_id: AccountId,
    /// Sender identity, email only.
    pub sender_id: Option<SenderId>,
    /// Template the content was rendered from.
    pub template_id: TemplateId,
    /// Rendered subject line, email only.
    pub subject: Option<String>,
    /// Rendered body.
    pub body: String,
    /// When the task is due to fire.
    pub execute_at: DateTime<Utc>,
}

impl NewSendRecord {
    /// Turn into a scheduled record once the store has assigned keys.
    pub fn into_record(self, id: SendRecordId, display_id: DisplayId) -> SendRecord {
        SendRecord {
            id,
            display_id,
            channel: self.channel,
            contact_id: self.contact_id,
            account_id: self.account_id,
            sender_id: self.sender_id,
            template_id: self.template_id,
            subject: self.subject,
            body: self.body,
            execute_at: self.execute_at,
            sent_at: None,
            status: SendStatus::Scheduled,
        }
    }
}
