//! In-memory dispatch store for development and testing.
//!
//! Transactions stage their writes privately: their own quota queries see
//! committed rows plus staged ones, rollback discards the stage, and commit
//! applies it under a single write lock.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Datelike, NaiveDate, Utc};
use parking_lot::{Mutex, RwLock};

use crate::core::error::StoreError;
use crate::core::quota::QuotaSource;
use crate::core::store::{DispatchStore, DispatchTransaction};
use crate::model::{
    Account, AccountId, Campaign, CampaignId, CampaignStatus, Channel, Contact, ContactList,
    ContactListId, DisplayId, EmailTemplate, NewSendRecord, SendRecord, SendStatus, SenderId,
    SenderIdentity, SmsTemplate,
};

const DISPLAY_ID_ATTEMPTS: usize = 16;

#[derive(Default)]
struct StoreState {
    campaigns: HashMap<CampaignId, Campaign>,
    contact_lists: HashMap<ContactListId, ContactList>,
    accounts: HashMap<AccountId, Account>,
    contacts: HashMap<ContactListId, Vec<Contact>>,
    sms_templates: HashMap<CampaignId, Vec<SmsTemplate>>,
    email_templates: HashMap<CampaignId, Vec<EmailTemplate>>,
    senders: HashMap<CampaignId, Vec<SenderIdentity>>,
    sends: Vec<SendRecord>,
    display_ids: HashSet<DisplayId>,
    next_send_id: i64,
    faults: Faults,
}

#[derive(Default)]
struct Faults {
    inserts_before_failure: Option<usize>,
    inserts: usize,
    fail_status_updates: bool,
    fail_commit: bool,
}

impl StoreState {
    fn update_campaign(
        &mut self,
        id: CampaignId,
        status: CampaignStatus,
        handled: bool,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let campaign = self
            .campaigns
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound(format!("campaign {id}")))?;
        campaign.status = status;
        campaign.handled = handled;
        campaign.handled_at = Some(at);
        Ok(())
    }
}

/// Thread-safe in-memory store.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    state: Arc<RwLock<StoreState>>,
}

impl InMemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a campaign.
    pub fn insert_campaign(&self, campaign: Campaign) {
        self.state.write().campaigns.insert(campaign.id, campaign);
    }

    /// Add or replace an account.
    pub fn insert_account(&self, account: Account) {
        self.state.write().accounts.insert(account.id, account);
    }

    /// Add or replace a contact list along with its contacts.
    pub fn insert_contact_list(&self, list: ContactList, contacts: Vec<Contact>) {
        let mut state = self.state.write();
        state.contacts.insert(list.id, contacts);
        state.contact_lists.insert(list.id, list);
    }

    /// Attach SMS templates to a campaign.
    pub fn insert_sms_templates(&self, campaign: CampaignId, templates: Vec<SmsTemplate>) {
        self.state.write().sms_templates.insert(campaign, templates);
    }

    /// Attach email templates to a campaign.
    pub fn insert_email_templates(&self, campaign: CampaignId, templates: Vec<EmailTemplate>) {
        self.state.write().email_templates.insert(campaign, templates);
    }

    /// Attach sender identities to a campaign.
    pub fn insert_senders(&self, campaign: CampaignId, senders: Vec<SenderIdentity>) {
        self.state.write().senders.insert(campaign, senders);
    }

    /// Seed an already-committed send record, e.g. earlier usage.
    pub fn insert_send_record(&self, record: SendRecord) {
        let mut state = self.state.write();
        state.next_send_id = state.next_send_id.max(record.id);
        state.display_ids.insert(record.display_id.clone());
        state.sends.push(record);
    }

    /// Committed send records.
    pub fn send_records(&self) -> Vec<SendRecord> {
        self.state.read().sends.clone()
    }

    /// Current state of a campaign.
    pub fn campaign(&self, id: CampaignId) -> Option<Campaign> {
        self.state.read().campaigns.get(&id).cloned()
    }

    /// Fail every send insert after the first `successes`.
    pub fn fail_inserts_after(&self, successes: usize) {
        let mut state = self.state.write();
        state.faults.inserts_before_failure = Some(successes);
        state.faults.inserts = 0;
    }

    /// Fail every campaign status update, inside or outside a transaction.
    pub fn fail_status_updates(&self, fail: bool) {
        self.state.write().faults.fail_status_updates = fail;
    }

    /// Fail every commit.
    pub fn fail_commit(&self, fail: bool) {
        self.state.write().faults.fail_commit = fail;
    }
}

#[async_trait]
impl DispatchStore for InMemoryStore {
    async fn find_campaign(&self, display_id: &DisplayId) -> Result<Option<Campaign>, StoreError> {
        Ok(self
            .state
            .read()
            .campaigns
            .values()
            .find(|c| &c.display_id == display_id)
            .cloned())
    }

    async fn find_contact_list(&self, id: ContactListId) -> Result<Option<ContactList>, StoreError> {
        Ok(self.state.read().contact_lists.get(&id).cloned())
    }

    async fn find_account(&self, id: AccountId) -> Result<Option<Account>, StoreError> {
        Ok(self.state.read().accounts.get(&id).cloned())
    }

    async fn contacts_in_list(&self, list: &ContactList) -> Result<Vec<Contact>, StoreError> {
        Ok(self
            .state
            .read()
            .contacts
            .get(&list.id)
            .cloned()
            .unwrap_or_default())
    }

    async fn sms_templates(&self, campaign: &Campaign) -> Result<Vec<SmsTemplate>, StoreError> {
        Ok(self
            .state
            .read()
            .sms_templates
            .get(&campaign.id)
            .cloned()
            .unwrap_or_default())
    }

    async fn email_templates(&self, campaign: &Campaign) -> Result<Vec<EmailTemplate>, StoreError> {
        Ok(self
            .state
            .read()
            .email_templates
            .get(&campaign.id)
            .cloned()
            .unwrap_or_default())
    }

    async fn campaign_senders(&self, campaign: &Campaign) -> Result<Vec<SenderIdentity>, StoreError> {
        Ok(self
            .state
            .read()
            .senders
            .get(&campaign.id)
            .cloned()
            .unwrap_or_default())
    }

    async fn update_campaign_status(
        &self,
        id: CampaignId,
        status: CampaignStatus,
        handled: bool,
    ) -> Result<(), StoreError> {
        let mut state = self.state.write();
        if state.faults.fail_status_updates {
            return Err(StoreError::Backend("injected status update failure".into()));
        }
        state.update_campaign(id, status, handled, Utc::now())
    }

    async fn record_execution_time(&self, id: CampaignId, secs: u64) -> Result<(), StoreError> {
        let mut state = self.state.write();
        let campaign = state
            .campaigns
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound(format!("campaign {id}")))?;
        campaign.execution_time_secs = Some(secs);
        Ok(())
    }

    async fn begin(&self) -> Result<Box<dyn DispatchTransaction>, StoreError> {
        Ok(Box::new(InMemoryTransaction {
            state: Arc::clone(&self.state),
            staged: Mutex::new(Staged::default()),
        }))
    }
}

#[derive(Default)]
struct Staged {
    sends: Vec<SendRecord>,
    campaign_updates: Vec<(CampaignId, CampaignStatus, bool)>,
}

/// Transaction over an [`InMemoryStore`].
pub struct InMemoryTransaction {
    state: Arc<RwLock<StoreState>>,
    staged: Mutex<Staged>,
}

fn counts_toward_sender(record: &SendRecord, sender: SenderId, date: NaiveDate) -> bool {
    record.channel == Channel::Email
        && record.sender_id == Some(sender)
        && (record.execute_at.date_naive() == date
            || record.sent_at.is_some_and(|at| at.date_naive() == date))
}

fn counts_toward_month(record: &SendRecord, account: AccountId, year: i32, month: u32) -> bool {
    let at = record.execute_at;
    record.channel == Channel::Sms
        && record.account_id == account
        && record.status != SendStatus::Failed
        && at.year() == year
        && at.month() == month
}

fn count(n: usize) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}

#[async_trait]
impl QuotaSource for InMemoryTransaction {
    async fn sender_usage_on(&self, sender: SenderId, date: NaiveDate) -> Result<u32, StoreError> {
        let committed = self
            .state
            .read()
            .sends
            .iter()
            .filter(|r| counts_toward_sender(r, sender, date))
            .count();
        let staged = self
            .staged
            .lock()
            .sends
            .iter()
            .filter(|r| counts_toward_sender(r, sender, date))
            .count();
        Ok(count(committed + staged))
    }

    async fn sms_usage_in_month(
        &self,
        account: AccountId,
        year: i32,
        month: u32,
    ) -> Result<u32, StoreError> {
        let committed = self
            .state
            .read()
            .sends
            .iter()
            .filter(|r| counts_toward_month(r, account, year, month))
            .count();
        let staged = self
            .staged
            .lock()
            .sends
            .iter()
            .filter(|r| counts_toward_month(r, account, year, month))
            .count();
        Ok(count(committed + staged))
    }
}

#[async_trait]
impl DispatchTransaction for InMemoryTransaction {
    async fn insert_send(&self, record: NewSendRecord) -> Result<SendRecord, StoreError> {
        let mut state = self.state.write();
        if let Some(limit) = state.faults.inserts_before_failure {
            if state.faults.inserts >= limit {
                return Err(StoreError::Backend("injected insert failure".into()));
            }
        }
        state.faults.inserts += 1;

        let mut staged = self.staged.lock();
        let mut display_id = None;
        for _ in 0..DISPLAY_ID_ATTEMPTS {
            let candidate = DisplayId::generate();
            let taken = state.display_ids.contains(&candidate)
                || staged.sends.iter().any(|r| r.display_id == candidate);
            if !taken {
                display_id = Some(candidate);
                break;
            }
        }
        let display_id = display_id
            .ok_or_else(|| StoreError::Backend("could not allocate a unique display id".into()))?;

        state.next_send_id += 1;
        let record = record.into_record(state.next_send_id, display_id);
        staged.sends.push(record.clone());
        Ok(record)
    }

    async fn update_campaign_status(
        &self,
        id: CampaignId,
        status: CampaignStatus,
        handled: bool,
    ) -> Result<(), StoreError> {
        let state = self.state.read();
        if state.faults.fail_status_updates {
            return Err(StoreError::Backend("injected status update failure".into()));
        }
        if !state.campaigns.contains_key(&id) {
            return Err(StoreError::NotFound(format!("campaign {id}")));
        }
        self.staged.lock().campaign_updates.push((id, status, handled));
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        let staged = self.staged.into_inner();
        let mut state = self.state.write();
        if state.faults.fail_commit {
            return Err(StoreError::Backend("injected commit failure".into()));
        }
        let now = Utc::now();
        for (id, status, handled) in staged.campaign_updates {
            state.update_campaign(id, status, handled, now)?;
        }
        for record in staged.sends {
            state.display_ids.insert(record.display_id.clone());
            state.sends.push(record);
        }
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), StoreError> {
        let staged = self.staged.into_inner();
        tracing::debug!("discarding {} staged send records", staged.sends.len());
        Ok(())
    }
}
