//! Dispatch abstractions, quota accounting, and orchestration.

pub mod batch;
pub mod dispatch;
pub mod error;
pub mod log_sink;
pub mod planning;
pub mod quota;
pub mod render;
pub mod store;
pub mod task_queue;

pub use batch::{BatchContext, BatchUnit, BoundedBatchExecutor};
pub use dispatch::{CampaignDispatcher, DispatchOutcome, DispatchSummary};
pub use error::{
    AppResult, BatchError, ConfigError, DispatchError, QueueError, StoreError, ValidationFailure,
};
pub use log_sink::{build_log_entry, InMemoryLogSink, LogEntry, LogLevel, LogSink, TracingLogSink};
pub use planning::{ChannelPlan, ContactQueue};
pub use quota::{daily_cap, QuotaSource, QuotaTracker, SenderLedger, SenderPool, SenderQuota};
pub use render::{RenderedEmail, TemplateRenderer, VariableRenderer};
pub use store::{DispatchStore, DispatchTransaction};
pub use task_queue::TaskQueueClient;
