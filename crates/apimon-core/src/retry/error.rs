//! Normalized transport failure, independent of the HTTP client in use.

use thiserror::Error;

/// Failure to obtain any HTTP response for one attempt.
///
/// Transports map their native errors into this union; classification only
/// ever sees these variants.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The configured timeout elapsed before a response arrived.
    #[error("operation timed out")]
    TimedOut,
    /// The peer refused or the connection could not be established.
    #[error("connection refused: {0}")]
    Refused(String),
    /// Host name resolution failed.
    #[error("could not resolve host: {0}")]
    DnsFailure(String),
    /// TLS handshake or certificate verification failed.
    #[error("TLS failure: {0}")]
    TlsFailure(String),
    /// The attempt was aborted because its slot was cancelled.
    #[error("request cancelled")]
    Cancelled,
    /// Anything else the transport reported.
    #[error("{0}")]
    Other(String),
}
