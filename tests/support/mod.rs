//! Shared fixtures for dispatch integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use campaign_dispatch::config::DispatchConfig;
use campaign_dispatch::core::{CampaignDispatcher, InMemoryLogSink, VariableRenderer};
use campaign_dispatch::infra::{InMemoryStore, InMemoryTaskQueue};
use campaign_dispatch::model::{
    Account, Campaign, CampaignStatus, Channel, Contact, ContactList, DisplayId, EmailTemplate,
    SenderIdentity, SmsTemplate,
};
use chrono::{DateTime, Duration, Utc};

pub const CAMPAIGN_ID: &str = "1000-blast";
pub const API_URL: &str = "https://api.example.com";

pub fn contact(id: i64, email: &str, phone: &str) -> Contact {
    Contact {
        id,
        display_id: DisplayId::parse(&format!("{:04}-c{id}", id % 10_000)).unwrap(),
        account_id: 1,
        email: email.into(),
        phone: phone.into(),
        first_name: format!("First{id}"),
        last_name: format!("Last{id}"),
    }
}

pub fn email_only(count: i64) -> Vec<Contact> {
    (1..=count)
        .map(|id| contact(id, &format!("c{id}@example.com"), ""))
        .collect()
}

pub fn phone_only(count: i64) -> Vec<Contact> {
    (1..=count)
        .map(|id| contact(id, "", &format!("+1555000{id:04}")))
        .collect()
}

pub fn sender(id: i64, daily_limit: u32) -> SenderIdentity {
    SenderIdentity {
        id,
        account_id: 1,
        address: format!("sender{id}@example.com"),
        provider: "smtp".into(),
        daily_limit,
    }
}

pub fn sms_template(id: i64) -> SmsTemplate {
    SmsTemplate {
        id,
        content: "Hi ${{contact.firstName || 'there'}}, we miss you".into(),
    }
}

pub fn email_template(id: i64) -> EmailTemplate {
    EmailTemplate {
        id,
        subject: "Hello ${{contact.firstName}}".into(),
        components: serde_json::json!({
            "body": { "values": { "text": "Dear ${{contact.lastName || 'customer'}}" } }
        }),
    }
}

pub fn config() -> DispatchConfig {
    DispatchConfig::new(1_000, 100, API_URL).with_chunk_size(4)
}

/// Day index of `at` relative to the instant a dispatch started.
pub fn day_index(before: DateTime<Utc>, at: DateTime<Utc>) -> i64 {
    (at - before).num_days()
}

/// Whether `at` lies in the jitter window of day `day` for a dispatch that
/// started between `before` and `after`.
pub fn within_jitter(before: DateTime<Utc>, after: DateTime<Utc>, day: i64, at: DateTime<Utc>) -> bool {
    at >= before + Duration::days(day) + Duration::minutes(60)
        && at <= after + Duration::days(day) + Duration::minutes(300)
}

pub struct Fixture {
    pub store: Arc<InMemoryStore>,
    pub queue: Arc<InMemoryTaskQueue>,
    pub log_sink: Arc<InMemoryLogSink>,
    pub campaign: Campaign,
    pub account: Account,
}

impl Fixture {
    /// A pending campaign over `contacts`, with no templates or senders yet.
    pub fn new(contacts: Vec<Contact>) -> Self {
        let store = Arc::new(InMemoryStore::new());
        let account = Account {
            id: 1,
            display_id: DisplayId::parse("0001-acct").unwrap(),
            monthly_sms_cap: 10_000,
        };
        let campaign = Campaign {
            id: 1,
            display_id: DisplayId::parse(CAMPAIGN_ID).unwrap(),
            account_id: 1,
            contact_list_id: 1,
            status: CampaignStatus::Pending,
            handled: false,
            handled_at: None,
            follow_up_channel: Channel::Sms,
            follow_up_delay_days: None,
            is_test: false,
            execution_time_secs: None,
        };
        store.insert_account(account.clone());
        store.insert_campaign(campaign.clone());
        store.insert_contact_list(
            ContactList {
                id: 1,
                display_id: DisplayId::parse("0001-list").unwrap(),
                account_id: 1,
                handled: true,
            },
            contacts,
        );
        Self {
            store,
            queue: Arc::new(InMemoryTaskQueue::new()),
            log_sink: Arc::new(InMemoryLogSink::new(256)),
            campaign,
            account,
        }
    }

    pub fn with_campaign(mut self, update: impl FnOnce(&mut Campaign)) -> Self {
        update(&mut self.campaign);
        self.store.insert_campaign(self.campaign.clone());
        self
    }

    pub fn with_sms_cap(mut self, cap: u32) -> Self {
        self.account.monthly_sms_cap = cap;
        self.store.insert_account(self.account.clone());
        self
    }

    pub fn with_sms_templates(self, count: i64) -> Self {
        self.store
            .insert_sms_templates(self.campaign.id, (1..=count).map(sms_template).collect());
        self
    }

    pub fn with_email_templates(self, count: i64) -> Self {
        self.store.insert_email_templates(
            self.campaign.id,
            (1..=count).map(|id| email_template(100 + id)).collect(),
        );
        self
    }

    pub fn with_senders(self, senders: Vec<SenderIdentity>) -> Self {
        self.store.insert_senders(self.campaign.id, senders);
        self
    }

    pub fn dispatcher(&self, config: DispatchConfig) -> CampaignDispatcher {
        CampaignDispatcher::new(
            config,
            self.store.clone(),
            self.queue.clone(),
            Arc::new(VariableRenderer),
            self.log_sink.clone(),
        )
    }

    pub fn campaign_state(&self) -> Campaign {
        self.store.campaign(self.campaign.id).unwrap()
    }
}
