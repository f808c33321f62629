//! Bounded batch executor with drain barriers.
//!
//! Runs `count` units of work with at most `concurrency` of them in flight
//! between barriers. When the in-flight set fills up, every in-flight unit is
//! awaited together (not just the oldest), including any nested work the units
//! register while the barrier drains. Failures of one barrier are all collected
//! before the executor gives up, so a failing unit never cancels its
//! barrier-mates.
//!
//! Units are polled cooperatively on the caller's task. They may borrow from the
//! caller's stack, which is what lets a day loop hand each day a shared contact
//! queue without reference counting.
//!
//! ```rust,ignore
//! use futures::FutureExt;
//! use campaign_dispatch::core::BoundedBatchExecutor;
//!
//! let executor = BoundedBatchExecutor::new(8);
//! executor
//!     .run(29, |ctx| {
//!         async move {
//!             if ctx.index() > 3 {
//!                 ctx.break_loop();
//!             }
//!             Ok(())
//!         }
//!         .boxed()
//!     })
//!     .await?;
//! ```

use std::future::poll_fn;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::task::Poll;

use futures::future::BoxFuture;
use futures::stream::{FuturesUnordered, StreamExt};
use parking_lot::Mutex;

use crate::core::error::BatchError;

/// A unit of work: any boxed future resolving to an `anyhow` result.
pub type BatchUnit<'a> = BoxFuture<'a, anyhow::Result<()>>;

/// State shared between the executor and the contexts it hands out.
struct BatchShared<'a> {
    /// Nested work registered by running units, not yet in the in-flight set.
    pending: Mutex<Vec<BatchUnit<'a>>>,
    stop: AtomicBool,
    drain: AtomicBool,
}

impl BatchShared<'_> {
    fn new() -> Self {
        Self {
            pending: Mutex::new(Vec::new()),
            stop: AtomicBool::new(false),
            drain: AtomicBool::new(false),
        }
    }
}

/// Handle given to every unit of work.
#[derive(Clone)]
pub struct BatchContext<'a> {
    index: usize,
    shared: Arc<BatchShared<'a>>,
}

impl<'a> BatchContext<'a> {
    /// Index of this unit within the batch.
    pub const fn index(&self) -> usize {
        self.index
    }

    /// Register nested work into the current barrier.
    ///
    /// The barrier does not complete until this work has finished, and its
    /// failure counts as a failure of the barrier.
    pub fn add(&self, work: BatchUnit<'a>) {
        self.shared.pending.lock().push(work);
    }

    /// Stop scheduling indices that have not started yet.
    ///
    /// Work that is already in flight still runs to completion.
    pub fn break_loop(&self) {
        self.shared.stop.store(true, Ordering::Release);
    }

    /// Drain the current barrier after the current scheduling step, even if
    /// it is not full.
    pub fn request_drain(&self) {
        self.shared.drain.store(true, Ordering::Release);
    }

    /// Whether early termination has been requested for this batch.
    pub fn is_stopped(&self) -> bool {
        self.shared.stop.load(Ordering::Acquire)
    }
}

/// Concurrency-shaping primitive used for every fan-out in a dispatch.
#[derive(Debug, Clone, Copy)]
pub struct BoundedBatchExecutor {
    concurrency: usize,
}

impl BoundedBatchExecutor {
    /// Create an executor with the given concurrency ceiling (minimum 1).
    pub fn new(concurrency: usize) -> Self {
        Self {
            concurrency: concurrency.max(1),
        }
    }

    /// Concurrency ceiling.
    pub const fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Run `count` units produced by `unit`.
    ///
    /// Returns an aggregate [`BatchError`] after the first barrier that
    /// observed a failure; indices after that barrier are never started.
    pub async fn run<'a, F>(&self, count: usize, mut unit: F) -> Result<(), BatchError>
    where
        F: FnMut(BatchContext<'a>) -> BatchUnit<'a>,
    {
        let shared = Arc::new(BatchShared::new());
        let mut in_flight: FuturesUnordered<BatchUnit<'a>> = FuturesUnordered::new();
        let mut failures = Vec::new();

        for index in 0..count {
            if shared.stop.load(Ordering::Acquire) {
                tracing::debug!("batch stopped early at index {} of {}", index, count);
                break;
            }

            in_flight.push(unit(BatchContext {
                index,
                shared: Arc::clone(&shared),
            }));

            let full = in_flight.len() + shared.pending.lock().len() >= self.concurrency;
            if full || shared.drain.swap(false, Ordering::AcqRel) {
                drain(&mut in_flight, &shared, &mut failures).await;
                if !failures.is_empty() {
                    return Err(BatchError::new(failures));
                }
            }
        }

        drain(&mut in_flight, &shared, &mut failures).await;
        if failures.is_empty() {
            Ok(())
        } else {
            Err(BatchError::new(failures))
        }
    }
}

/// Await everything in flight, folding in nested work as it is registered.
async fn drain<'a>(
    in_flight: &mut FuturesUnordered<BatchUnit<'a>>,
    shared: &BatchShared<'a>,
    failures: &mut Vec<anyhow::Error>,
) {
    poll_fn(|cx| loop {
        in_flight.extend(shared.pending.lock().drain(..));
        match in_flight.poll_next_unpin(cx) {
            Poll::Ready(Some(Ok(()))) => {}
            Poll::Ready(Some(Err(err))) => {
                tracing::debug!("batch unit failed: {:#}", err);
                failures.push(err);
            }
            Poll::Ready(None) => {
                if shared.pending.lock().is_empty() {
                    return Poll::Ready(());
                }
            }
            Poll::Pending => {
                if shared.pending.lock().is_empty() {
                    return Poll::Pending;
                }
            }
        }
    })
    .await;
}
