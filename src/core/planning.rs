//! Pure scheduling decisions: who gets what channel, and when.

use std::sync::atomic::{AtomicUsize, Ordering};

use chrono::{DateTime, Duration, Utc};
use rand::Rng;

use crate::model::{Campaign, Channel, Contact};

/// Lower bound of the jitter added to a day's start, in minutes.
pub const JITTER_MIN_MINUTES: i64 = 60;
/// Upper bound of the jitter added to a day's start, in minutes.
pub const JITTER_MAX_MINUTES: i64 = 300;

/// Single-consumer queue over an immutable contact sequence.
///
/// Each `pop` hands out a distinct contact, so concurrent batch units never
/// schedule the same contact twice.
#[derive(Debug)]
pub struct ContactQueue {
    contacts: Vec<Contact>,
    cursor: AtomicUsize,
}

impl ContactQueue {
    /// Queue over `contacts`, in order.
    pub const fn new(contacts: Vec<Contact>) -> Self {
        Self {
            contacts,
            cursor: AtomicUsize::new(0),
        }
    }

    /// Next unclaimed contact.
    pub fn pop(&self) -> Option<&Contact> {
        let index = self.cursor.fetch_add(1, Ordering::AcqRel);
        self.contacts.get(index)
    }

    /// Whether every contact has been claimed.
    pub fn is_drained(&self) -> bool {
        self.cursor.load(Ordering::Acquire) >= self.contacts.len()
    }

    /// Contacts not yet claimed.
    pub fn remaining(&self) -> usize {
        self.contacts
            .len()
            .saturating_sub(self.cursor.load(Ordering::Acquire))
    }

    /// Total contacts in the queue.
    pub fn len(&self) -> usize {
        self.contacts.len()
    }

    /// Whether the queue was built empty.
    pub fn is_empty(&self) -> bool {
        self.contacts.is_empty()
    }
}

/// Split contacts into email-capable and phone-only, dropping the unreachable.
pub fn partition_contacts(contacts: Vec<Contact>) -> (Vec<Contact>, Vec<Contact>) {
    let mut email_capable = Vec::new();
    let mut phone_only = Vec::new();
    for contact in contacts {
        if contact.has_email() {
            email_capable.push(contact);
        } else if contact.has_phone() {
            phone_only.push(contact);
        }
    }
    (email_capable, phone_only)
}

/// Channels chosen for a campaign given the templates it carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelPlan {
    /// Channel of the first send to every contact.
    pub initial: Channel,
    /// Channel of the follow-up send.
    pub follow_up: Channel,
    /// Days between the initial and follow-up send.
    pub follow_up_delay_days: Option<u32>,
    /// Whether follow-ups are scheduled at all.
    pub follow_up_eligible: bool,
}

impl ChannelPlan {
    /// Derive the plan; `None` when the campaign has no templates at all.
    pub fn derive(campaign: &Campaign, has_sms: bool, has_email: bool) -> Option<Self> {
        let has = |channel: Channel| match channel {
            Channel::Email => has_email,
            Channel::Sms => has_sms,
        };
        let preferred = campaign.follow_up_channel.opposite();
        let initial = if has(preferred) {
            preferred
        } else if has(preferred.opposite()) {
            preferred.opposite()
        } else {
            return None;
        };
        Some(Self {
            initial,
            follow_up: initial.opposite(),
            follow_up_delay_days: campaign.follow_up_delay_days,
            follow_up_eligible: campaign.follow_up_delay_days.is_some() && has_sms && has_email,
        })
    }
}

/// Start of day `index` of the window.
pub fn day_start(start: DateTime<Utc>, index: u32) -> DateTime<Utc> {
    start + Duration::days(i64::from(index))
}

/// `day_start` plus a uniform jitter of 60 to 300 minutes.
pub fn jittered(day_start: DateTime<Utc>) -> DateTime<Utc> {
    jittered_with(day_start, &mut rand::rng())
}

/// [`jittered`] with an explicit random source.
pub fn jittered_with<R: Rng>(day_start: DateTime<Utc>, rng: &mut R) -> DateTime<Utc> {
    let seconds = rng.random_range(JITTER_MIN_MINUTES * 60..=JITTER_MAX_MINUTES * 60);
    day_start + Duration::seconds(seconds)
}

/// Pick a uniformly random element.
pub fn pick<T>(items: &[T]) -> Option<&T> {
    if items.is_empty() {
        return None;
    }
    items.get(rand::rng().random_range(0..items.len()))
}
