//! Tests for the dispatch API surface

use std::sync::Arc;

use campaign_dispatch::config::DispatchConfig;
use campaign_dispatch::core::{CampaignDispatcher, InMemoryLogSink, VariableRenderer};
use campaign_dispatch::infra::{InMemoryStore, InMemoryTaskQueue};
use campaign_dispatch::model::{
    Account, Campaign, CampaignStatus, Channel, Contact, ContactList, DisplayId, SmsTemplate,
};
use campaign_dispatch::runtime::{dispatch_campaign, health, ApiResponse};

fn id(raw: &str) -> DisplayId {
    DisplayId::parse(raw).unwrap()
}

fn phone_contact(n: i64) -> Contact {
    Contact {
        id: n,
        display_id: id(&format!("{n:04}-ct")),
        account_id: 1,
        email: String::new(),
        phone: format!("+1555{n:07}"),
        first_name: "Grace".into(),
        last_name: "Hopper".into(),
    }
}

/// A pending campaign `1000-blast` over `contacts`, with one SMS template.
fn dispatcher(contacts: Vec<Contact>, max_contacts: usize) -> CampaignDispatcher {
    let store = InMemoryStore::new();
    store.insert_account(Account {
        id: 1,
        display_id: id("0001-acct"),
        monthly_sms_cap: 1_000,
    });
    store.insert_contact_list(
        ContactList {
            id: 1,
            display_id: id("0001-list"),
            account_id: 1,
            handled: true,
        },
        contacts,
    );
    store.insert_campaign(Campaign {
        id: 1,
        display_id: id("1000-blast"),
        account_id: 1,
        contact_list_id: 1,
        status: CampaignStatus::Pending,
        handled: false,
        handled_at: None,
        follow_up_channel: Channel::Email,
        follow_up_delay_days: None,
        is_test: false,
        execution_time_secs: None,
    });
    store.insert_sms_templates(
        1,
        vec![SmsTemplate {
            id: 1,
            content: "Hello ${{contact.firstName}}".into(),
        }],
    );

    CampaignDispatcher::new(
        DispatchConfig::new(max_contacts, 50, "https://api.example.com"),
        Arc::new(store),
        Arc::new(InMemoryTaskQueue::new()),
        Arc::new(VariableRenderer),
        Arc::new(InMemoryLogSink::new(16)),
    )
}

#[tokio::test]
async fn test_dispatch_then_already_handled() {
    let dispatcher = dispatcher(vec![phone_contact(1), phone_contact(2)], 10);

    let first = dispatch_campaign(&dispatcher, "1000-blast").await;
    assert_eq!(first.status, 200);
    assert!(first.is_success());

    let second = dispatch_campaign(&dispatcher, "1000-blast").await;
    assert_eq!(second.status, 200);
    assert_ne!(first.message, second.message);
}

#[tokio::test]
async fn test_not_found_responses() {
    let dispatcher = dispatcher(vec![phone_contact(1)], 10);

    for raw in ["9999-none", "not-an-id"] {
        let response = dispatch_campaign(&dispatcher, raw).await;
        assert_eq!(response.status, 404);
        assert_eq!(response.message, "Not Found");
        assert!(!response.is_success());
    }
}

#[tokio::test]
async fn test_validation_responses() {
    let empty = dispatcher(Vec::new(), 10);
    let response = dispatch_campaign(&empty, "1000-blast").await;
    assert_eq!(response.status, 400);
    assert_eq!(response.message, "No contacts found");

    let crowded = dispatcher((1..=3).map(phone_contact).collect(), 2);
    let response = dispatch_campaign(&crowded, "1000-blast").await;
    assert_eq!(response.status, 400);
    assert_eq!(response.message, "Too many contacts. Maximum is 2");
}

#[test]
fn test_response_body_omits_status() {
    let response = ApiResponse {
        status: 500,
        message: "Internal Server Error".into(),
    };
    let body = serde_json::to_value(&response).unwrap();
    assert_eq!(body, serde_json::json!({ "message": "Internal Server Error" }));
}

#[test]
fn test_health() {
    assert!(health().ok);
}
