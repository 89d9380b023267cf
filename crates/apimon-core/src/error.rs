//! Typed errors raised eagerly at construction or ingestion time.
//!
//! Per-interface probe failures are never errors: they are reported as data on
//! `MonitorResult`. Only misconfiguration and malformed descriptors end up here.

use thiserror::Error;

/// Invalid engine or retry configuration. Detected before any interface is probed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("concurrency must be greater than 0 (got {0})")]
    Concurrency(usize),

    #[error("timeout must be greater than 0")]
    Timeout,

    #[error("retry max_attempts must be at least 1 (got {0})")]
    MaxAttempts(u32),

    #[error("invalid backoff step {0:?}: must be a finite, non-negative number of seconds")]
    Backoff(String),

    #[error("unknown error kind {0:?} in retryable_kinds")]
    UnknownErrorKind(String),
}

/// A descriptor that cannot be probed as written.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DescriptorError {
    #[error("interface {name:?}: method is empty")]
    EmptyMethod { name: String },

    #[error("interface {name:?}: unsupported HTTP method {method:?}")]
    UnsupportedMethod { name: String, method: String },

    #[error("interface {name:?}: url is empty")]
    EmptyUrl { name: String },
}
