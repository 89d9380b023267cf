//! Retry and backoff policy.
//!
//! This module encapsulates error classification (HTTP status codes, timeouts,
//! transport failures) and the table-driven backoff policy so that the
//! executors and the scheduler share one consistent definition of "transient".

mod classify;
mod error;
mod policy;
mod run;

pub use classify::{
    classify_http_status, classify_response, classify_timeout, classify_transport,
    classify_transport_error, Classification, RawResponse,
};
pub use error::TransportError;
pub use policy::{ErrorKind, RetryDecision, RetryPolicy};
pub use run::{run_with_retry, Outcome, ProbeState, Sleeper, ThreadSleeper};
