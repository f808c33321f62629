//! Campaign dispatch orchestration.
//!
//! Turns an approved campaign into per-contact send records and delivery
//! tasks spread over a rolling window of days. Everything written during a
//! dispatch lives in one transaction; tasks pushed to the external queue
//! before a failure are deleted again, so a failed dispatch leaves neither
//! rows nor tasks behind.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

use anyhow::Context;
use chrono::{DateTime, NaiveDate, Utc};
use futures::FutureExt;
use parking_lot::Mutex;

use crate::config::DispatchConfig;
use crate::core::batch::{BatchContext, BoundedBatchExecutor};
use crate::core::error::{BatchError, DispatchError, QueueError, StoreError, ValidationFailure};
use crate::core::log_sink::{build_log_entry, LogLevel, LogSink};
use crate::core::planning::{self, ChannelPlan, ContactQueue};
use crate::core::quota::{daily_cap, total_remaining, QuotaTracker, SenderLedger, SenderPool};
use crate::core::render::TemplateRenderer;
use crate::core::store::{DispatchStore, DispatchTransaction};
use crate::core::task_queue::TaskQueueClient;
use crate::model::{
    Account, Campaign, CampaignStatus, Channel, Contact, DisplayId, EmailTemplate, NewSendRecord,
    QueueName, SendRecord, SenderIdentity, SmsTemplate, TaskDescriptor,
};

/// Result of a dispatch that did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Sends were scheduled and the campaign is now in progress.
    Dispatched(DispatchSummary),
    /// The campaign had already been dispatched; nothing changed.
    AlreadyHandled,
}

/// What a successful dispatch produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DispatchSummary {
    /// Email send records written.
    pub email_sends: usize,
    /// SMS send records written.
    pub sms_sends: usize,
    /// Tasks pushed to the external queue; zero in test mode.
    pub tasks_enqueued: usize,
}

/// Why a dispatch stopped early.
enum Abort {
    NotFound,
    Rejected {
        failure: ValidationFailure,
        mark_failed: bool,
    },
    Internal(anyhow::Error),
}

impl Abort {
    fn internal(err: impl Into<anyhow::Error>) -> Self {
        Self::Internal(err.into())
    }

    const fn rejected(failure: ValidationFailure) -> Self {
        Self::Rejected {
            failure,
            mark_failed: true,
        }
    }
}

impl From<StoreError> for Abort {
    fn from(err: StoreError) -> Self {
        Self::Internal(err.into())
    }
}

impl From<BatchError> for Abort {
    fn from(err: BatchError) -> Self {
        Self::Internal(err.into())
    }
}

/// Everything loaded and decided before the transaction opens.
struct Prepared {
    account: Account,
    email_contacts: ContactQueue,
    phone_contacts: ContactQueue,
    sms_templates: Vec<SmsTemplate>,
    email_templates: Vec<EmailTemplate>,
    senders: Vec<SenderIdentity>,
    plan: ChannelPlan,
}

/// Orchestrates a single campaign dispatch end to end.
pub struct CampaignDispatcher {
    config: DispatchConfig,
    store: Arc<dyn DispatchStore>,
    queue: Arc<dyn TaskQueueClient>,
    renderer: Arc<dyn TemplateRenderer>,
    log_sink: Arc<dyn LogSink>,
}

impl CampaignDispatcher {
    /// Create a dispatcher over the given collaborators.
    pub fn new(
        config: DispatchConfig,
        store: Arc<dyn DispatchStore>,
        queue: Arc<dyn TaskQueueClient>,
        renderer: Arc<dyn TemplateRenderer>,
        log_sink: Arc<dyn LogSink>,
    ) -> Self {
        Self {
            config,
            store,
            queue,
            renderer,
            log_sink,
        }
    }

    /// Configuration in use.
    pub const fn config(&self) -> &DispatchConfig {
        &self.config
    }

    /// Dispatch the campaign with the given display id.
    ///
    /// A malformed id is reported as [`DispatchError::NotFound`] without
    /// touching the store. Dispatching a campaign twice is a no-op the second
    /// time.
    pub async fn dispatch(&self, raw_id: &str) -> Result<DispatchOutcome, DispatchError> {
        let started = Instant::now();
        let Ok(display_id) = DisplayId::parse(raw_id) else {
            tracing::warn!("rejecting malformed campaign id {:?}", raw_id);
            return Err(DispatchError::NotFound);
        };

        let campaign = match self.store.find_campaign(&display_id).await {
            Ok(Some(campaign)) => campaign,
            Ok(None) => {
                tracing::info!("campaign {} not found", display_id);
                return Err(DispatchError::NotFound);
            }
            Err(err) => {
                self.log(LogLevel::Error, Some(&display_id), format!("failed to load campaign: {err}"));
                return Err(DispatchError::internal(err));
            }
        };

        if campaign.handled {
            tracing::info!("campaign {} already handled, skipping", display_id);
            return Ok(DispatchOutcome::AlreadyHandled);
        }

        let result = match self.prepare(&campaign).await {
            Ok(prepared) => self.schedule(&campaign, prepared).await,
            Err(abort) => Err(abort),
        };

        match result {
            Ok(summary) => {
                self.record_execution_time(&campaign, started).await;
                tracing::info!(
                    "campaign {} dispatched: {} email, {} sms, {} tasks",
                    display_id,
                    summary.email_sends,
                    summary.sms_sends,
                    summary.tasks_enqueued
                );
                Ok(DispatchOutcome::Dispatched(summary))
            }
            Err(Abort::NotFound) => Err(DispatchError::NotFound),
            Err(Abort::Rejected {
                failure,
                mark_failed,
            }) => {
                tracing::warn!("campaign {} rejected: {}", display_id, failure);
                if mark_failed {
                    self.mark_failed(&campaign, started).await;
                }
                Err(DispatchError::Validation(failure))
            }
            Err(Abort::Internal(err)) => {
                tracing::error!("campaign {} failed: {:#}", display_id, err);
                self.log(LogLevel::Error, Some(&display_id), format!("{err:#}"));
                self.mark_failed(&campaign, started).await;
                Err(DispatchError::Internal(err))
            }
        }
    }

    /// Load contacts, templates and senders, and settle the channel plan.
    async fn prepare(&self, campaign: &Campaign) -> Result<Prepared, Abort> {
        let Some(list) = self.store.find_contact_list(campaign.contact_list_id).await? else {
            tracing::info!("contact list {} not found", campaign.contact_list_id);
            return Err(Abort::NotFound);
        };
        let account = self
            .store
            .find_account(campaign.account_id)
            .await?
            .with_context(|| format!("account {} not found", campaign.account_id))
            .map_err(Abort::Internal)?;

        let contacts = self.store.contacts_in_list(&list).await?;
        if contacts.is_empty() {
            return Err(Abort::rejected(ValidationFailure::NoContacts));
        }
        if contacts.len() > self.config.max_contacts {
            return Err(Abort::rejected(ValidationFailure::TooManyContacts {
                found: contacts.len(),
                max: self.config.max_contacts,
            }));
        }

        let (email_contacts, phone_contacts) = planning::partition_contacts(contacts);
        if email_contacts.is_empty() && phone_contacts.is_empty() {
            return Err(Abort::rejected(ValidationFailure::NoContacts));
        }

        let sms_templates = self.store.sms_templates(campaign).await?;
        let email_templates = self.store.email_templates(campaign).await?;
        let plan = ChannelPlan::derive(campaign, !sms_templates.is_empty(), !email_templates.is_empty())
            .ok_or_else(|| Abort::internal(anyhow::anyhow!("campaign has no templates")))?;

        let senders = self.store.campaign_senders(campaign).await?;
        if senders.is_empty() && !email_contacts.is_empty() && !email_templates.is_empty() {
            return Err(Abort::internal(anyhow::anyhow!("campaign has no sender identities")));
        }

        tracing::debug!(
            "campaign {}: {} email-capable, {} phone-only, initial {:?}, follow-up eligible {}",
            campaign.display_id,
            email_contacts.len(),
            phone_contacts.len(),
            plan.initial,
            plan.follow_up_eligible
        );

        Ok(Prepared {
            account,
            email_contacts: ContactQueue::new(email_contacts),
            phone_contacts: ContactQueue::new(phone_contacts),
            sms_templates,
            email_templates,
            senders,
            plan,
        })
    }

    /// Run the transactional phase, rolling back and compensating on failure.
    async fn schedule(&self, campaign: &Campaign, prepared: Prepared) -> Result<DispatchSummary, Abort> {
        let tx = self.store.begin().await?;
        let enqueued = Mutex::new(Vec::new());

        let result = self.schedule_in(campaign, &prepared, tx.as_ref(), &enqueued).await;
        let failure = match result {
            Ok(summary) => match tx.commit().await {
                Ok(()) => return Ok(summary),
                Err(err) => Abort::from(err),
            },
            Err(abort) => {
                if let Err(err) = tx.rollback().await {
                    tracing::error!("rollback failed: {}", err);
                    self.log(
                        LogLevel::Error,
                        Some(&campaign.display_id),
                        format!("rollback failed: {err}"),
                    );
                }
                abort
            }
        };

        let enqueued = std::mem::take(&mut *enqueued.lock());
        self.delete_tasks(campaign, enqueued).await;
        Err(failure)
    }

    async fn schedule_in(
        &self,
        campaign: &Campaign,
        prepared: &Prepared,
        tx: &dyn DispatchTransaction,
        enqueued: &Mutex<Vec<(QueueName, String)>>,
    ) -> Result<DispatchSummary, Abort> {
        let schedule = Schedule {
            config: &self.config,
            renderer: self.renderer.as_ref(),
            campaign,
            prepared,
            tx,
            start: Utc::now(),
            ledger: SenderLedger::new(),
            staged: Mutex::new(Vec::new()),
            sms_dates: Mutex::new(Vec::new()),
            email_sends: AtomicUsize::new(0),
            sms_sends: AtomicUsize::new(0),
        };

        if !prepared.phone_contacts.is_empty() && !prepared.sms_templates.is_empty() {
            schedule.phone_only(&prepared.phone_contacts).await?;
        }
        if !prepared.email_contacts.is_empty() && !prepared.email_templates.is_empty() {
            schedule.email_capable(&prepared.email_contacts).await?;
        }

        let sms_dates = std::mem::take(&mut *schedule.sms_dates.lock());
        if let Some(failure) = QuotaTracker::new(tx)
            .check_monthly_sms(&prepared.account, &sms_dates)
            .await?
        {
            return Err(Abort::Rejected {
                failure,
                mark_failed: false,
            });
        }

        let staged = std::mem::take(&mut *schedule.staged.lock());
        let mut summary = DispatchSummary {
            email_sends: schedule.email_sends.load(Ordering::Acquire),
            sms_sends: schedule.sms_sends.load(Ordering::Acquire),
            tasks_enqueued: 0,
        };
        if campaign.is_test {
            tracing::info!(
                "campaign {} is a test, not enqueueing {} tasks",
                campaign.display_id,
                staged.len()
            );
        } else {
            self.enqueue_tasks(&staged, enqueued).await?;
            summary.tasks_enqueued = staged.len();
        }

        tx.update_campaign_status(campaign.id, CampaignStatus::InProgress, true)
            .await?;
        Ok(summary)
    }

    async fn enqueue_tasks(
        &self,
        staged: &[TaskDescriptor],
        enqueued: &Mutex<Vec<(QueueName, String)>>,
    ) -> Result<(), BatchError> {
        let executor = BoundedBatchExecutor::new(self.config.chunk_size);
        executor
            .run(staged.len(), |ctx| {
                enqueue_one(self.queue.as_ref(), &staged[ctx.index()], enqueued).boxed()
            })
            .await
    }

    /// Delete every task enqueued before a failure. Each deletion stands alone.
    async fn delete_tasks(&self, campaign: &Campaign, enqueued: Vec<(QueueName, String)>) {
        if campaign.is_test || enqueued.is_empty() {
            return;
        }
        tracing::warn!(
            "deleting {} tasks enqueued for campaign {}",
            enqueued.len(),
            campaign.display_id
        );
        let executor = BoundedBatchExecutor::new(self.config.chunk_size);
        let result = executor
            .run(enqueued.len(), |ctx| {
                let (queue, task_id) = &enqueued[ctx.index()];
                self.delete_one(campaign, *queue, task_id).boxed()
            })
            .await;
        if let Err(err) = result {
            tracing::error!("task cleanup did not finish: {}", err);
        }
    }

    async fn delete_one(
        &self,
        campaign: &Campaign,
        queue: QueueName,
        task_id: &str,
    ) -> anyhow::Result<()> {
        match self.queue.delete(queue, task_id).await {
            Ok(()) => {}
            Err(QueueError::NotFound(_)) => {
                tracing::debug!("task {} already gone", task_id);
            }
            Err(err) => {
                tracing::error!("failed to delete task {}: {}", task_id, err);
                self.log(
                    LogLevel::Warn,
                    Some(&campaign.display_id),
                    format!("failed to delete task {task_id} on queue {}: {err}", queue.as_str()),
                );
            }
        }
        Ok(())
    }

    async fn mark_failed(&self, campaign: &Campaign, started: Instant) {
        if let Err(err) = self
            .store
            .update_campaign_status(campaign.id, CampaignStatus::Failed, true)
            .await
        {
            tracing::error!("failed to mark campaign {} failed: {}", campaign.display_id, err);
            self.log(
                LogLevel::Warn,
                Some(&campaign.display_id),
                format!("failed to mark campaign failed: {err}"),
            );
        }
        self.record_execution_time(campaign, started).await;
    }

    async fn record_execution_time(&self, campaign: &Campaign, started: Instant) {
        let secs = elapsed_secs(started);
        if let Err(err) = self.store.record_execution_time(campaign.id, secs).await {
            tracing::warn!(
                "failed to record execution time for campaign {}: {}",
                campaign.display_id,
                err
            );
        }
    }

    fn log(&self, level: LogLevel, campaign: Option<&DisplayId>, message: String) {
        self.log_sink
            .write(build_log_entry(level, campaign.map(ToString::to_string), message));
    }
}

async fn enqueue_one(
    client: &dyn TaskQueueClient,
    task: &TaskDescriptor,
    enqueued: &Mutex<Vec<(QueueName, String)>>,
) -> anyhow::Result<()> {
    match client.enqueue(task).await {
        Ok(id) => {
            enqueued.lock().push((task.queue, id));
            Ok(())
        }
        Err(err) => {
            // The service may have stored the task before the reply was lost.
            enqueued.lock().push((task.queue, task.task_id.clone()));
            Err(anyhow::Error::new(err).context(format!("failed to enqueue task {}", task.task_id)))
        }
    }
}

/// Whole seconds since `started`, rounded up.
fn elapsed_secs(started: Instant) -> u64 {
    let elapsed = started.elapsed();
    elapsed.as_secs() + u64::from(elapsed.subsec_nanos() > 0)
}

/// Scheduling state shared by every batch unit of one dispatch.
struct Schedule<'a> {
    config: &'a DispatchConfig,
    renderer: &'a dyn TemplateRenderer,
    campaign: &'a Campaign,
    prepared: &'a Prepared,
    tx: &'a dyn DispatchTransaction,
    start: DateTime<Utc>,
    ledger: SenderLedger,
    staged: Mutex<Vec<TaskDescriptor>>,
    sms_dates: Mutex<Vec<NaiveDate>>,
    email_sends: AtomicUsize,
    sms_sends: AtomicUsize,
}

impl Schedule<'_> {
    fn window(&self) -> usize {
        usize::try_from(self.config.window_days).unwrap_or(usize::MAX)
    }

    fn day_start(&self, day: &BatchContext<'_>) -> anyhow::Result<DateTime<Utc>> {
        Ok(planning::day_start(self.start, u32::try_from(day.index())?))
    }

    /// Contacts with a phone but no email get one SMS each, up to the daily
    /// SMS ceiling per day.
    async fn phone_only(&self, queue: &ContactQueue) -> Result<(), BatchError> {
        let days = BoundedBatchExecutor::new(self.config.chunk_size);
        days.run(self.window(), |day| self.phone_only_day(queue, day).boxed())
            .await
    }

    async fn phone_only_day(&self, queue: &ContactQueue, day: BatchContext<'_>) -> anyhow::Result<()> {
        if queue.is_drained() {
            day.break_loop();
            return Ok(());
        }
        let day_start = self.day_start(&day)?;
        let executor = BoundedBatchExecutor::new(self.config.chunk_size);
        executor
            .run(self.config.max_sms_per_day, |ctx| {
                self.phone_only_unit(queue, day_start, ctx).boxed()
            })
            .await?;
        if queue.is_drained() {
            day.break_loop();
        }
        Ok(())
    }

    async fn phone_only_unit(
        &self,
        queue: &ContactQueue,
        day_start: DateTime<Utc>,
        ctx: BatchContext<'_>,
    ) -> anyhow::Result<()> {
        let Some(contact) = queue.pop() else {
            ctx.break_loop();
            return Ok(());
        };
        self.schedule_sms(contact, day_start).await
    }

    /// Contacts with an email address, spread over the window within the
    /// senders' daily quota.
    async fn email_capable(&self, queue: &ContactQueue) -> Result<(), BatchError> {
        let days = BoundedBatchExecutor::new(self.config.chunk_size);
        days.run(self.window(), |day| self.email_day(queue, day).boxed())
            .await
    }

    async fn email_day(&self, queue: &ContactQueue, day: BatchContext<'_>) -> anyhow::Result<()> {
        if queue.is_drained() {
            day.break_loop();
            return Ok(());
        }
        let day_start = self.day_start(&day)?;
        let date = day_start.date_naive();

        let available = self
            .ledger
            .available_senders(self.tx, &self.prepared.senders, date)
            .await?;
        if available.is_empty() {
            tracing::debug!("no sender quota left on {}, skipping day", date);
            return Ok(());
        }
        let cap = daily_cap(
            total_remaining(&available),
            self.config.max_contacts,
            self.config.window_days,
        );
        if cap < 1 {
            tracing::debug!("daily cap is zero on {}, skipping day", date);
            return Ok(());
        }
        tracing::debug!("scheduling up to {} contacts on {}", cap, date);

        let pool = SenderPool::new(available);
        let executor = BoundedBatchExecutor::new(self.config.chunk_size);
        executor
            .run(cap, |ctx| self.email_unit(queue, &pool, day_start, ctx).boxed())
            .await?;
        if queue.is_drained() {
            day.break_loop();
        }
        Ok(())
    }

    async fn email_unit<'b>(
        &'b self,
        queue: &'b ContactQueue,
        pool: &'b SenderPool,
        day_start: DateTime<Utc>,
        ctx: BatchContext<'b>,
    ) -> anyhow::Result<()> {
        if queue.is_drained() {
            ctx.break_loop();
            return Ok(());
        }
        let date = day_start.date_naive();
        let sender = loop {
            let Some(sender) = pool.take() else {
                ctx.break_loop();
                return Ok(());
            };
            if self.ledger.admit(self.tx, &sender, date).await? {
                break sender;
            }
            // Follow-ups from earlier days used up the rest of its budget.
            pool.remove(sender.id);
        };
        let Some(contact) = queue.pop() else {
            self.ledger.release(sender.id, date).await;
            ctx.break_loop();
            return Ok(());
        };

        let plan = &self.prepared.plan;
        let initial = if contact.has_phone() {
            plan.initial
        } else {
            Channel::Email
        };
        ctx.add(
            self.send(initial, contact, Some(sender.clone()), day_start)
                .boxed(),
        );

        if let (true, true, Some(delay)) = (
            plan.follow_up_eligible,
            contact.has_phone(),
            plan.follow_up_delay_days,
        ) {
            let follow_up_start = planning::day_start(day_start, delay);
            let follow_up_sender = match plan.follow_up {
                Channel::Sms => None,
                Channel::Email => {
                    let follow_up_date = follow_up_start.date_naive();
                    let admitted = self
                        .ledger
                        .admit_any(self.tx, &sender, &self.prepared.senders, follow_up_date)
                        .await?;
                    if admitted.is_none() {
                        tracing::debug!(
                            "no sender quota left on {}, skipping follow-up for contact {}",
                            follow_up_date,
                            contact.id
                        );
                        return Ok(());
                    }
                    admitted
                }
            };
            ctx.add(
                self.send(plan.follow_up, contact, follow_up_sender, follow_up_start)
                    .boxed(),
            );
        }
        Ok(())
    }

    async fn send(
        &self,
        channel: Channel,
        contact: &Contact,
        sender: Option<SenderIdentity>,
        day_start: DateTime<Utc>,
    ) -> anyhow::Result<()> {
        match channel {
            Channel::Sms => self.schedule_sms(contact, day_start).await,
            Channel::Email => {
                let sender = sender.context("email send without a sender identity")?;
                self.schedule_email(contact, &sender, day_start).await
            }
        }
    }

    async fn schedule_sms(&self, contact: &Contact, day_start: DateTime<Utc>) -> anyhow::Result<()> {
        let template = planning::pick(&self.prepared.sms_templates).context("no sms templates")?;
        let execute_at = planning::jittered(day_start);
        let record = NewSendRecord {
            channel: Channel::Sms,
            contact_id: contact.id,
            account_id: self.campaign.account_id,
            sender_id: None,
            template_id: template.id,
            subject: None,
            body: self.renderer.render_sms(template, contact),
            execute_at,
        };
        let record = self
            .tx
            .insert_send(record)
            .await
            .with_context(|| format!("failed to write sms for contact {}", contact.id))?;
        self.sms_dates.lock().push(execute_at.date_naive());
        self.sms_sends.fetch_add(1, Ordering::AcqRel);
        self.stage(&record);
        Ok(())
    }

    async fn schedule_email(
        &self,
        contact: &Contact,
        sender: &SenderIdentity,
        day_start: DateTime<Utc>,
    ) -> anyhow::Result<()> {
        let template =
            planning::pick(&self.prepared.email_templates).context("no email templates")?;
        let rendered = self.renderer.render_email(template, contact)?;
        let record = NewSendRecord {
            channel: Channel::Email,
            contact_id: contact.id,
            account_id: self.campaign.account_id,
            sender_id: Some(sender.id),
            template_id: template.id,
            subject: Some(rendered.subject),
            body: rendered.body,
            execute_at: planning::jittered(day_start),
        };
        let record = self
            .tx
            .insert_send(record)
            .await
            .with_context(|| format!("failed to write email for contact {}", contact.id))?;
        self.email_sends.fetch_add(1, Ordering::AcqRel);
        self.stage(&record);
        Ok(())
    }

    fn stage(&self, record: &SendRecord) {
        self.staged.lock().push(TaskDescriptor::for_send(
            &self.config.api_base_url,
            record.channel,
            &record.display_id,
            record.execute_at,
        ));
    }
}
