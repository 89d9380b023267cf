//! Bounded worker pool for a batch.
//!
//! All indices are queued up front; `concurrency` OS threads pop from the queue
//! and send `(index, result)` back over one channel. The collector waits for
//! slots in submission order, bounded per slot, so output position always
//! matches input position regardless of completion order.

use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

use crate::control::CancelToken;
use crate::executor::{panic_message, RetryingExecutor};
use crate::interface::InterfaceDescriptor;
use crate::result::MonitorResult;

/// Longest single wait on the result channel, so batch cancellation is noticed promptly.
const COLLECT_POLL: Duration = Duration::from_millis(100);

/// Result for a slot that was never started because its probe was cancelled first.
pub(super) fn cancelled_result(interface: &InterfaceDescriptor, index: usize) -> MonitorResult {
    MonitorResult::unknown_error(
        interface.reference(index),
        "batch cancelled before this interface was probed",
        Duration::ZERO,
        None,
    )
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Run one interface through the retrying executor, converting a panic into an
/// `UnknownError` result.
pub(super) fn run_guarded(
    executor: &RetryingExecutor,
    interface: &InterfaceDescriptor,
    index: usize,
    token: Option<&str>,
    cancel: &CancelToken,
) -> MonitorResult {
    panic::catch_unwind(AssertUnwindSafe(|| {
        executor.run(interface, index, token, cancel)
    }))
    .unwrap_or_else(|payload| {
        let msg = panic_message(payload.as_ref());
        tracing::error!(interface = %interface.name, "probe panicked: {}", msg);
        MonitorResult::unknown_error(
            interface.reference(index),
            format!("probe execution failed: {}", msg),
            Duration::ZERO,
            None,
        )
    })
}

/// Inputs shared read-only by every worker.
pub(super) struct SharedBatch {
    pub interfaces: Arc<[InterfaceDescriptor]>,
    /// Token per interface, already resolved from the token map.
    pub tokens: Arc<[Option<String>]>,
}

/// Run the batch on `concurrency` workers; each slot is waited on for at most `collect_bound`.
///
/// A slot that does not report in time is recorded as `UnknownError` and its
/// cancel token fired, which aborts the in-flight transfer and any backoff sleep.
/// Firing `batch_cancel` cancels every slot; unstarted slots report immediately.
pub(super) fn run_parallel(
    executor: Arc<RetryingExecutor>,
    batch: SharedBatch,
    concurrency: usize,
    collect_bound: Duration,
    batch_cancel: &CancelToken,
) -> Vec<MonitorResult> {
    let count = batch.interfaces.len();
    let work: Arc<Mutex<VecDeque<usize>>> = Arc::new(Mutex::new((0..count).collect()));
    let cancels: Arc<[CancelToken]> = (0..count).map(|_| CancelToken::new()).collect();
    let (tx, rx) = mpsc::channel::<(usize, MonitorResult)>();

    let num_workers = concurrency.min(count);
    let mut handles = Vec::with_capacity(num_workers);
    for worker in 0..num_workers {
        let work = Arc::clone(&work);
        let cancels = Arc::clone(&cancels);
        let interfaces = Arc::clone(&batch.interfaces);
        let tokens = Arc::clone(&batch.tokens);
        let executor = Arc::clone(&executor);
        let tx = tx.clone();
        let spawned = thread::Builder::new()
            .name(format!("apimon-worker-{}", worker))
            .spawn(move || loop {
                let next = lock(&work).pop_front();
                let Some(index) = next else {
                    break;
                };
                let cancel = &cancels[index];
                let result = if cancel.is_cancelled() {
                    cancelled_result(&interfaces[index], index)
                } else {
                    run_guarded(
                        &executor,
                        &interfaces[index],
                        index,
                        tokens[index].as_deref(),
                        cancel,
                    )
                };
                if tx.send((index, result)).is_err() {
                    break;
                }
            });
        match spawned {
            Ok(h) => handles.push(h),
            Err(e) => tracing::warn!("could not spawn worker {}: {}", worker, e),
        }
    }
    drop(tx);

    let mut slots: Vec<Option<MonitorResult>> = (0..count).map(|_| None).collect();
    let mut disconnected = false;
    let mut abandoned = 0usize;
    let mut cancelled_all = false;

    for index in 0..count {
        // `None` when the bound is too large to express as an instant: wait without a deadline.
        let deadline = Instant::now().checked_add(collect_bound);
        while slots[index].is_none() && !disconnected {
            if !cancelled_all && batch_cancel.is_cancelled() {
                tracing::warn!("batch cancelled, stopping outstanding probes");
                cancels.iter().for_each(CancelToken::cancel);
                cancelled_all = true;
            }
            let wait = match deadline {
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        break;
                    }
                    (deadline - now).min(COLLECT_POLL)
                }
                None => COLLECT_POLL,
            };
            match rx.recv_timeout(wait) {
                Ok((i, result)) => {
                    if slots[i].is_none() {
                        slots[i] = Some(result);
                    }
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => disconnected = true,
            }
        }
        if slots[index].is_none() {
            cancels[index].cancel();
            abandoned += 1;
            let interface = &batch.interfaces[index];
            let message = if disconnected {
                "no worker reported a result for this interface".to_string()
            } else {
                format!(
                    "no result within {:.1}s; probe cancelled",
                    collect_bound.as_secs_f64()
                )
            };
            tracing::error!(interface = %interface.name, "{}", message);
            slots[index] = Some(MonitorResult::unknown_error(
                interface.reference(index),
                message,
                Duration::ZERO,
                None,
            ));
        }
    }

    if abandoned == 0 {
        for h in handles {
            if h.join().is_err() {
                tracing::warn!("worker thread panicked after reporting");
            }
        }
    } else {
        // Cancelled workers wind down on their own; do not block the batch on them.
        tracing::warn!(abandoned, "detaching workers with cancelled probes");
    }

    slots.into_iter().flatten().collect()
}
