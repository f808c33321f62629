//! Domain records read and written by a dispatch.

pub mod campaign;
pub mod contact;
pub mod display_id;
pub mod send;
pub mod sender;
pub mod task;
pub mod template;

pub use campaign::{
    Account, AccountId, Campaign, CampaignId, CampaignStatus, Channel, ContactList, ContactListId,
};
pub use contact::{Contact, ContactId};
pub use display_id::{DisplayId, InvalidDisplayId};
pub use send::{NewSendRecord, SendRecord, SendRecordId, SendStatus};
pub use sender::{SenderId, SenderIdentity};
pub use task::{QueueName, TaskDescriptor};
pub use template::{EmailTemplate, SmsTemplate, TemplateId};
