//! Probe execution: one attempt, and one attempt wrapped in the retry policy.
//!
//! The HTTP client sits behind the [`Transport`] trait. [`SingleAttemptExecutor`]
//! always returns a classified `MonitorResult`, whatever the transport does
//! (including panicking); [`RetryingExecutor`] drives it through the retry loop.

mod libcurl;

pub use self::libcurl::{transport_error_from_curl, CurlTransport};

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::control::CancelToken;
use crate::interface::{InterfaceDescriptor, InterfaceRef};
use crate::request::{PreparedRequest, RequestBuilder};
use crate::result::MonitorResult;
use crate::retry::{
    classify_response, classify_timeout, classify_transport, run_with_retry, RawResponse,
    RetryPolicy, Sleeper, ThreadSleeper, TransportError,
};

/// Sends one prepared request. Implementations block the calling thread.
pub trait Transport: Send + Sync {
    /// Send `request`, giving up after `timeout`. Should abort early once `cancel` fires.
    fn send(
        &self,
        request: &PreparedRequest,
        timeout: Duration,
        cancel: &CancelToken,
    ) -> Result<RawResponse, TransportError>;
}

/// Executes exactly one attempt against one interface.
#[derive(Clone)]
pub struct SingleAttemptExecutor {
    builder: RequestBuilder,
    transport: Arc<dyn Transport>,
    timeout: Duration,
}

impl SingleAttemptExecutor {
    pub fn new(builder: RequestBuilder, transport: Arc<dyn Transport>, timeout: Duration) -> Self {
        Self {
            builder,
            transport,
            timeout,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Build, send, and classify. Never panics into the caller and never returns an error.
    pub fn attempt(
        &self,
        interface: &InterfaceDescriptor,
        reference: InterfaceRef,
        token: Option<&str>,
        cancel: &CancelToken,
    ) -> MonitorResult {
        let request = self.builder.build(interface, token);
        let snapshot = request.snapshot();
        tracing::debug!(method = %request.method, url = %request.url, "sending request");

        let start = Instant::now();
        let sent = panic::catch_unwind(AssertUnwindSafe(|| {
            self.transport.send(&request, self.timeout, cancel)
        }));
        let elapsed = start.elapsed();

        let classification = match sent {
            Ok(Ok(response)) => classify_response(&response),
            Ok(Err(TransportError::TimedOut)) => classify_timeout(elapsed),
            Ok(Err(err)) => {
                tracing::debug!(url = %request.url, "transport failure: {}", err);
                classify_transport(&err, elapsed)
            }
            Err(payload) => {
                let msg = panic_message(payload.as_ref());
                tracing::error!(interface = %reference.name, "transport panicked: {}", msg);
                return MonitorResult::unknown_error(
                    reference,
                    format!("transport panicked: {}", msg),
                    elapsed,
                    Some(snapshot),
                );
            }
        };
        MonitorResult::from_classification(reference, classification, elapsed, Some(snapshot))
    }
}

/// Single attempts driven by a retry policy.
#[derive(Clone)]
pub struct RetryingExecutor {
    single: SingleAttemptExecutor,
    policy: RetryPolicy,
    sleeper: Arc<dyn Sleeper>,
}

impl RetryingExecutor {
    pub fn new(single: SingleAttemptExecutor, policy: RetryPolicy) -> Self {
        Self {
            single,
            policy,
            sleeper: Arc::new(ThreadSleeper),
        }
    }

    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Probe `interface` (input position `index`) until success, a terminal error,
    /// or exhaustion. `retry_count` on the result is populated.
    pub fn run(
        &self,
        interface: &InterfaceDescriptor,
        index: usize,
        token: Option<&str>,
        cancel: &CancelToken,
    ) -> MonitorResult {
        run_with_retry(&self.policy, self.sleeper.as_ref(), cancel, |_| {
            self.single
                .attempt(interface, interface.reference(index), token, cancel)
        })
    }
}

/// Best-effort text of a panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
