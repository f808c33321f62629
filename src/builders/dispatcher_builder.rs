//! Builders to construct a dispatcher from configuration.

use std::sync::Arc;

use crate::config::{DispatchConfig, QueueBackendConfig, TaskQueueConfig};
use crate::core::error::ConfigError;
use crate::core::{CampaignDispatcher, DispatchStore, LogSink, TaskQueueClient, VariableRenderer};
use crate::infra::InMemoryTaskQueue;

/// Build the task-queue client selected by configuration.
pub fn build_task_queue(cfg: &TaskQueueConfig) -> Result<Arc<dyn TaskQueueClient>, ConfigError> {
    cfg.validate()?;
    match cfg.backend {
        QueueBackendConfig::InMemory => Ok(Arc::new(InMemoryTaskQueue::new())),
        #[cfg(feature = "http-queue")]
        QueueBackendConfig::Http => Ok(Arc::new(crate::infra::HttpTaskQueue::from_config(cfg)?)),
        #[cfg(not(feature = "http-queue"))]
        QueueBackendConfig::Http => Err(ConfigError::Invalid {
            field: "task_queue.backend",
            reason: "built without the `http-queue` feature".into(),
        }),
    }
}

/// Build a dispatcher over `store`, with the configured task queue and the
/// variable-substituting renderer.
pub fn build_dispatcher(
    cfg: DispatchConfig,
    store: Arc<dyn DispatchStore>,
    log_sink: Arc<dyn LogSink>,
) -> Result<CampaignDispatcher, ConfigError> {
    cfg.validate()?;
    let queue = build_task_queue(&cfg.task_queue)?;
    Ok(CampaignDispatcher::new(
        cfg,
        store,
        queue,
        Arc::new(VariableRenderer),
        log_sink,
    ))
}
