//! Data-access abstractions consumed by the dispatcher.
//!
//! Reads outside the dispatch transaction go through [`DispatchStore`]; every
//! write that must be all-or-nothing goes through the [`DispatchTransaction`]
//! it opens. Status updates on the store itself are auto-committed, which is
//! what failure bookkeeping needs after a rollback.

use async_trait::async_trait;

use crate::core::error::StoreError;
use crate::core::quota::QuotaSource;
use crate::model::{
    Account, AccountId, Campaign, CampaignId, CampaignStatus, Contact, ContactList, ContactListId,
    DisplayId, EmailTemplate, NewSendRecord, SendRecord, SenderIdentity, SmsTemplate,
};

/// Read access plus auto-committed campaign bookkeeping.
#[async_trait]
pub trait DispatchStore: Send + Sync {
    /// Find a campaign by its display id.
    async fn find_campaign(&self, display_id: &DisplayId) -> Result<Option<Campaign>, StoreError>;

    /// Find a contact list by key.
    async fn find_contact_list(&self, id: ContactListId) -> Result<Option<ContactList>, StoreError>;

    /// Find an account by key.
    async fn find_account(&self, id: AccountId) -> Result<Option<Account>, StoreError>;

    /// All contacts in a list.
    async fn contacts_in_list(&self, list: &ContactList) -> Result<Vec<Contact>, StoreError>;

    /// SMS templates attached to a campaign.
    async fn sms_templates(&self, campaign: &Campaign) -> Result<Vec<SmsTemplate>, StoreError>;

    /// Email templates attached to a campaign.
    async fn email_templates(&self, campaign: &Campaign) -> Result<Vec<EmailTemplate>, StoreError>;

    /// Sender identities attached to a campaign.
    async fn campaign_senders(&self, campaign: &Campaign) -> Result<Vec<SenderIdentity>, StoreError>;

    /// Set status and handled flag, stamping `handled_at`.
    async fn update_campaign_status(
        &self,
        id: CampaignId,
        status: CampaignStatus,
        handled: bool,
    ) -> Result<(), StoreError>;

    /// Record how long the dispatch took.
    async fn record_execution_time(&self, id: CampaignId, secs: u64) -> Result<(), StoreError>;

    /// Open the dispatch transaction.
    async fn begin(&self) -> Result<Box<dyn DispatchTransaction>, StoreError>;
}

/// The long-lived transaction a dispatch schedules into.
///
/// Methods take `&self` so concurrent batch units can share one transaction.
/// Quota queries observe the transaction's own uncommitted writes.
#[async_trait]
pub trait DispatchTransaction: QuotaSource + Send + Sync {
    /// Write a send record, assigning its key and display id.
    async fn insert_send(&self, record: NewSendRecord) -> Result<SendRecord, StoreError>;

    /// Set status and handled flag as part of the transaction.
    async fn update_campaign_status(
        &self,
        id: CampaignId,
        status: CampaignStatus,
        handled: bool,
    ) -> Result<(), StoreError>;

    /// Make every write visible atomically.
    async fn commit(self: Box<Self>) -> Result<(), StoreError>;

    /// Discard every write.
    async fn rollback(self: Box<Self>) -> Result<(), StoreError>;
}
