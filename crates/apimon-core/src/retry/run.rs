//! Retry loop: run an attempt until it succeeds, fails terminally, or the policy says stop.

use std::time::{Duration, Instant};

use super::policy::{RetryDecision, RetryPolicy};
use crate::control::CancelToken;
use crate::result::MonitorResult;

/// Blocking delay between attempts. Injected so tests can observe backoff without sleeping.
pub trait Sleeper: Send + Sync {
    /// Sleep for `duration`, returning early if `cancel` fires.
    fn sleep(&self, duration: Duration, cancel: &CancelToken);
}

/// Real sleeper: sleeps in short slices so a cancelled slot stops backing off promptly.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadSleeper;

const SLEEP_SLICE: Duration = Duration::from_millis(50);

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration, cancel: &CancelToken) {
        // An unrepresentable deadline sleeps until cancelled.
        let deadline = Instant::now().checked_add(duration);
        loop {
            if cancel.is_cancelled() {
                return;
            }
            let remaining = match deadline {
                Some(deadline) => deadline.saturating_duration_since(Instant::now()),
                None => SLEEP_SLICE,
            };
            if remaining.is_zero() {
                return;
            }
            std::thread::sleep(remaining.min(SLEEP_SLICE));
        }
    }
}

/// Where a probe stands after an attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeState {
    /// Succeeded. Terminal.
    Success,
    /// Failed with a retryable kind and attempts remain; backs off, then pending again.
    RetryableFailure,
    /// Failed terminally or exhausted its attempts. Terminal.
    TerminalFailure,
}

/// Result of one attempt together with the policy's verdict on it.
#[derive(Debug, Clone)]
pub struct Outcome {
    pub result: MonitorResult,
    pub decision: RetryDecision,
}

impl Outcome {
    /// Evaluate attempt `attempt_index` (0-based) against the policy.
    pub fn evaluate(policy: &RetryPolicy, attempt_index: u32, result: MonitorResult) -> Self {
        let decision = policy.decide(attempt_index, result.error_kind);
        Self { result, decision }
    }

    pub fn should_retry(&self) -> bool {
        matches!(self.decision, RetryDecision::RetryAfter(_))
    }

    pub fn state(&self) -> ProbeState {
        if self.should_retry() {
            ProbeState::RetryableFailure
        } else if self.result.is_success() {
            ProbeState::Success
        } else {
            ProbeState::TerminalFailure
        }
    }
}

/// Runs `attempt` until the policy says stop, sleeping the backoff delay between attempts.
///
/// `attempt` receives the 0-based attempt index. The returned result is always the
/// last attempt's, with `retry_count` set to the number of retries performed. A
/// cancelled token ends the loop after the current attempt.
pub fn run_with_retry<F>(
    policy: &RetryPolicy,
    sleeper: &dyn Sleeper,
    cancel: &CancelToken,
    mut attempt: F,
) -> MonitorResult
where
    F: FnMut(u32) -> MonitorResult,
{
    let mut index = 0u32;
    loop {
        let mut result = attempt(index);
        result.retry_count = index;
        let outcome = Outcome::evaluate(policy, index, result);
        let delay = match (outcome.state(), outcome.decision) {
            (ProbeState::RetryableFailure, RetryDecision::RetryAfter(d)) if !cancel.is_cancelled() => d,
            (state, _) => {
                tracing::debug!(
                    interface = %outcome.result.interface.name,
                    ?state,
                    attempts = index + 1,
                    "probe finished"
                );
                return outcome.result;
            }
        };
        tracing::warn!(
            interface = %outcome.result.interface.name,
            kind = ?outcome.result.error_kind,
            attempt = index + 1,
            max_attempts = policy.max_attempts(),
            delay_ms = delay.as_millis() as u64,
            "retryable failure, backing off"
        );
        sleeper.sleep(delay, cancel);
        if cancel.is_cancelled() {
            return outcome.result;
        }
        index += 1;
    }
}
