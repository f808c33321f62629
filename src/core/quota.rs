//! Quota accounting for sender identities and account SMS caps.
//!
//! Sender quota is read at the start of each day's batch and never reserved,
//! so two dispatches sharing a sender on the same day can jointly overshoot
//! its limit. The monthly SMS cap is checked once more after scheduling.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{Datelike, NaiveDate};
use parking_lot::Mutex;
use rand::seq::SliceRandom;
use rand::Rng;

use crate::core::error::{StoreError, ValidationFailure};
use crate::model::{Account, AccountId, SenderId, SenderIdentity};

/// Default length of the rolling scheduling window, in days.
pub const DEFAULT_WINDOW_DAYS: u32 = 29;

/// Read-only aggregate queries backing quota decisions.
#[async_trait]
pub trait QuotaSource: Send + Sync {
    /// Emails from `sender` scheduled for, or sent on, `date` (UTC).
    async fn sender_usage_on(&self, sender: SenderId, date: NaiveDate) -> Result<u32, StoreError>;

    /// Non-failed SMS of `account` scheduled or sent in the given month.
    async fn sms_usage_in_month(
        &self,
        account: AccountId,
        year: i32,
        month: u32,
    ) -> Result<u32, StoreError>;
}

/// A sender annotated with its usage for one day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SenderQuota {
    /// The sender identity.
    pub sender: SenderIdentity,
    /// Emails already sent or scheduled that day.
    pub used: u32,
    /// `daily_limit - used`.
    pub remaining: u32,
}

impl SenderQuota {
    /// Annotate `sender` with `used`, or `None` once the limit is reached.
    pub fn with_usage(sender: &SenderIdentity, used: u32) -> Option<Self> {
        (used < sender.daily_limit).then(|| Self {
            sender: sender.clone(),
            used,
            remaining: sender.daily_limit - used,
        })
    }
}

/// Computes remaining sender and account quota from a [`QuotaSource`].
pub struct QuotaTracker<'a, S: QuotaSource + ?Sized> {
    source: &'a S,
}

impl<'a, S: QuotaSource + ?Sized> QuotaTracker<'a, S> {
    /// Track quota through `source`.
    pub const fn new(source: &'a S) -> Self {
        Self { source }
    }

    /// Senders that still have quota left on `date`.
    pub async fn available_senders(
        &self,
        senders: &[SenderIdentity],
        date: NaiveDate,
    ) -> Result<Vec<SenderQuota>, StoreError> {
        let mut available = Vec::with_capacity(senders.len());
        for sender in senders {
            let used = self.sender_usage(sender.id, date).await?;
            if let Some(quota) = SenderQuota::with_usage(sender, used) {
                available.push(quota);
            }
        }
        Ok(available)
    }

    /// Emails of `sender` scheduled for or sent on `date`.
    pub async fn sender_usage(&self, sender: SenderId, date: NaiveDate) -> Result<u32, StoreError> {
        self.source.sender_usage_on(sender, date).await
    }

    /// SMS already sent or scheduled in the calendar month containing `date`.
    pub async fn monthly_sms_usage(
        &self,
        account: AccountId,
        date: NaiveDate,
    ) -> Result<u32, StoreError> {
        self.source
            .sms_usage_in_month(account, date.year(), date.month())
            .await
    }

    /// Backstop check over the earliest and latest SMS dates of a dispatch.
    ///
    /// Returns the breach, if any. An empty `dates` slice never breaches.
    pub async fn check_monthly_sms(
        &self,
        account: &Account,
        dates: &[NaiveDate],
    ) -> Result<Option<ValidationFailure>, StoreError> {
        let (Some(earliest), Some(latest)) = (dates.iter().min(), dates.iter().max()) else {
            return Ok(None);
        };
        for date in [*earliest, *latest] {
            let used = self.monthly_sms_usage(account.id, date).await?;
            tracing::debug!(
                "monthly sms usage for account {} in {}: {} of {}",
                account.id,
                date.format("%Y-%m"),
                used,
                account.monthly_sms_cap
            );
            if used > account.monthly_sms_cap {
                return Ok(Some(ValidationFailure::SmsLimitExceeded {
                    month: date.format("%Y-%m").to_string(),
                    used,
                    cap: account.monthly_sms_cap,
                }));
            }
        }
        Ok(None)
    }
}

/// Sum of remaining quota across senders.
pub fn total_remaining(quotas: &[SenderQuota]) -> u32 {
    quotas.iter().map(|q| q.remaining).sum()
}

/// Sender usage per scheduling day, shared by every batch of one dispatch.
///
/// A (sender, day) pair is read from the source on first touch; every
/// admission after that is counted here. Day pools and follow-up emails that
/// land on the same day therefore draw on one budget.
#[derive(Debug, Default)]
pub struct SenderLedger {
    used: tokio::sync::Mutex<HashMap<(SenderId, NaiveDate), u32>>,
}

impl SenderLedger {
    /// Create an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    async fn usage<S: QuotaSource + ?Sized>(
        used: &mut HashMap<(SenderId, NaiveDate), u32>,
        source: &S,
        sender: SenderId,
        date: NaiveDate,
    ) -> Result<u32, StoreError> {
        if let Some(count) = used.get(&(sender, date)) {
            return Ok(*count);
        }
        let count = QuotaTracker::new(source).sender_usage(sender, date).await?;
        used.insert((sender, date), count);
        Ok(count)
    }

    /// Senders with room left on `date`, including this dispatch's admissions.
    pub async fn available_senders<S: QuotaSource + ?Sized>(
        &self,
        source: &S,
        senders: &[SenderIdentity],
        date: NaiveDate,
    ) -> Result<Vec<SenderQuota>, StoreError> {
        let mut used = self.used.lock().await;
        let mut available = Vec::with_capacity(senders.len());
        for sender in senders {
            let count = Self::usage(&mut used, source, sender.id, date).await?;
            if let Some(quota) = SenderQuota::with_usage(sender, count) {
                available.push(quota);
            }
        }
        Ok(available)
    }

    /// Count one email from `sender` on `date` if its limit allows.
    pub async fn admit<S: QuotaSource + ?Sized>(
        &self,
        source: &S,
        sender: &SenderIdentity,
        date: NaiveDate,
    ) -> Result<bool, StoreError> {
        let mut used = self.used.lock().await;
        let count = Self::usage(&mut used, source, sender.id, date).await?;
        if count >= sender.daily_limit {
            return Ok(false);
        }
        used.insert((sender.id, date), count + 1);
        Ok(true)
    }

    /// Admit `preferred` on `date`, or else a random other sender with room.
    pub async fn admit_any<S: QuotaSource + ?Sized>(
        &self,
        source: &S,
        preferred: &SenderIdentity,
        senders: &[SenderIdentity],
        date: NaiveDate,
    ) -> Result<Option<SenderIdentity>, StoreError> {
        if self.admit(source, preferred, date).await? {
            return Ok(Some(preferred.clone()));
        }
        let mut others: Vec<&SenderIdentity> =
            senders.iter().filter(|s| s.id != preferred.id).collect();
        others.shuffle(&mut rand::rng());
        for sender in others {
            if self.admit(source, sender, date).await? {
                return Ok(Some(sender.clone()));
            }
        }
        Ok(None)
    }

    /// Give back an admission that was not used.
    pub async fn release(&self, sender: SenderId, date: NaiveDate) {
        if let Some(count) = self.used.lock().await.get_mut(&(sender, date)) {
            *count = count.saturating_sub(1);
        }
    }
}

/// Emails to schedule on one day.
///
/// The global ceiling is spread evenly over the window and clipped to what the
/// senders can still carry. A result below 1 means the day is skipped.
pub fn daily_cap(total_remaining: u32, max_contacts: usize, window_days: u32) -> usize {
    let window = usize::try_from(window_days.max(1)).unwrap_or(usize::MAX);
    let spread = max_contacts.div_ceil(window);
    spread.min(usize::try_from(total_remaining).unwrap_or(usize::MAX))
}

/// Senders with quota left for one day's batch.
///
/// Each [`take`](Self::take) consumes one unit of a random sender's quota and
/// drops the sender from the pool once it is exhausted.
#[derive(Debug)]
pub struct SenderPool {
    senders: Mutex<Vec<SenderQuota>>,
}

impl SenderPool {
    /// Pool over the given senders; entries without quota are ignored.
    pub fn new(quotas: Vec<SenderQuota>) -> Self {
        Self {
            senders: Mutex::new(quotas.into_iter().filter(|q| q.remaining > 0).collect()),
        }
    }

    /// Take one send from a uniformly random sender.
    pub fn take(&self) -> Option<SenderIdentity> {
        self.take_with(&mut rand::rng())
    }

    /// Take one send using the given random source.
    pub fn take_with<R: Rng>(&self, rng: &mut R) -> Option<SenderIdentity> {
        let mut senders = self.senders.lock();
        if senders.is_empty() {
            return None;
        }
        let index = rng.random_range(0..senders.len());
        let quota = &mut senders[index];
        quota.used += 1;
        quota.remaining -= 1;
        let sender = quota.sender.clone();
        if quota.remaining == 0 {
            senders.swap_remove(index);
        }
        Some(sender)
    }

    /// Drop a sender from the pool, e.g. once its day budget is gone.
    pub fn remove(&self, sender: SenderId) {
        self.senders.lock().retain(|q| q.sender.id != sender);
    }

    /// Quota left across the pool.
    pub fn remaining(&self) -> u32 {
        total_remaining(&self.senders.lock())
    }

    /// Whether every sender is exhausted.
    pub fn is_empty(&self) -> bool {
        self.senders.lock().is_empty()
    }
}
