use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::error::ConfigError;

/// Closed classification of a probe failure.
///
/// Drives both retry decisions (see [`ErrorKind::RETRYABLE`]) and downstream
/// alert severity. Serializes as its upper-case wire name (`HTTP_404`, `TIMEOUT`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ErrorKind {
    /// Endpoint does not exist.
    #[serde(rename = "HTTP_404")]
    Http404,
    /// Server error: 500, or any 5xx other than 503.
    #[serde(rename = "HTTP_500")]
    Http500,
    /// Service unavailable.
    #[serde(rename = "HTTP_503")]
    Http503,
    /// Any other 4xx: the request itself was rejected.
    #[serde(rename = "VALIDATION_ERROR")]
    ValidationError,
    /// No response within the configured timeout.
    #[serde(rename = "TIMEOUT")]
    Timeout,
    /// Transport failure that is not a timeout, refusal, or DNS failure (TLS, reset, ...).
    #[serde(rename = "NETWORK_ERROR")]
    NetworkError,
    /// Connection could not be established.
    #[serde(rename = "CONNECTION_ERROR")]
    ConnectionError,
    /// Host name did not resolve.
    #[serde(rename = "DNS_ERROR")]
    DnsError,
    /// Anything else, including failures inside the engine itself.
    #[serde(rename = "UNKNOWN_ERROR")]
    UnknownError,
}

impl ErrorKind {
    /// Every kind, in declaration order.
    pub const ALL: [ErrorKind; 9] = [
        ErrorKind::Http404,
        ErrorKind::Http500,
        ErrorKind::Http503,
        ErrorKind::ValidationError,
        ErrorKind::Timeout,
        ErrorKind::NetworkError,
        ErrorKind::ConnectionError,
        ErrorKind::DnsError,
        ErrorKind::UnknownError,
    ];

    /// Transient kinds retried by the default policy. Everything else is terminal.
    pub const RETRYABLE: [ErrorKind; 4] = [
        ErrorKind::Timeout,
        ErrorKind::NetworkError,
        ErrorKind::ConnectionError,
        ErrorKind::DnsError,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::Http404 => "HTTP_404",
            ErrorKind::Http500 => "HTTP_500",
            ErrorKind::Http503 => "HTTP_503",
            ErrorKind::ValidationError => "VALIDATION_ERROR",
            ErrorKind::Timeout => "TIMEOUT",
            ErrorKind::NetworkError => "NETWORK_ERROR",
            ErrorKind::ConnectionError => "CONNECTION_ERROR",
            ErrorKind::DnsError => "DNS_ERROR",
            ErrorKind::UnknownError => "UNKNOWN_ERROR",
        }
    }

    /// Short human-readable description, used in reports and CLI output.
    pub fn description(self) -> &'static str {
        match self {
            ErrorKind::Http404 => "endpoint not found",
            ErrorKind::Http500 => "internal server error",
            ErrorKind::Http503 => "service unavailable",
            ErrorKind::ValidationError => "request rejected by server",
            ErrorKind::Timeout => "request timed out",
            ErrorKind::NetworkError => "network error",
            ErrorKind::ConnectionError => "connection failed",
            ErrorKind::DnsError => "DNS resolution failed",
            ErrorKind::UnknownError => "unknown error",
        }
    }

    pub fn is_transient(self) -> bool {
        Self::RETRYABLE.contains(&self)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ErrorKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        ErrorKind::ALL
            .into_iter()
            .find(|k| k.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| ConfigError::UnknownErrorKind(s.to_string()))
    }
}

/// Decision returned by the retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Stop: success, terminal error, or attempts exhausted.
    NoRetry,
    /// Retry after the given delay.
    RetryAfter(Duration),
}

/// Retry policy with an explicit, ordered backoff table.
///
/// The delay before retry `i` (0-based) is `backoff_steps[min(i, len - 1)]`, so
/// the table's last entry is reused instead of growing without bound.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum number of attempts (including the first). Always at least 1.
    max_attempts: u32,
    backoff_steps: Vec<Duration>,
    retryable_kinds: BTreeSet<ErrorKind>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_steps: vec![
                Duration::from_secs(1),
                Duration::from_secs(2),
                Duration::from_secs(4),
            ],
            retryable_kinds: ErrorKind::RETRYABLE.into_iter().collect(),
        }
    }
}

impl RetryPolicy {
    /// Policy with the default retryable kinds. Fails if `max_attempts` is 0.
    pub fn new(max_attempts: u32, backoff_steps: Vec<Duration>) -> Result<Self, ConfigError> {
        if max_attempts == 0 {
            return Err(ConfigError::MaxAttempts(max_attempts));
        }
        Ok(Self {
            max_attempts,
            backoff_steps,
            ..Self::default()
        })
    }

    /// Replace the set of kinds that are retried.
    pub fn with_retryable_kinds<I>(mut self, kinds: I) -> Self
    where
        I: IntoIterator<Item = ErrorKind>,
    {
        self.retryable_kinds = kinds.into_iter().collect();
        self
    }

    /// Single attempt, never retried.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn backoff_steps(&self) -> &[Duration] {
        &self.backoff_steps
    }

    pub fn retryable_kinds(&self) -> &BTreeSet<ErrorKind> {
        &self.retryable_kinds
    }

    /// True when `kind` is present and in the retryable set. Success (`None`) is never retried.
    pub fn is_retryable(&self, kind: Option<ErrorKind>) -> bool {
        kind.is_some_and(|k| self.retryable_kinds.contains(&k))
    }

    /// Delay before the retry following attempt `attempt_index` (0-based).
    ///
    /// Negative indices yield zero; indices past the table reuse the last step.
    /// An empty table means retry immediately.
    pub fn backoff_delay(&self, attempt_index: i64) -> Duration {
        if attempt_index < 0 {
            return Duration::ZERO;
        }
        let Some(last) = self.backoff_steps.len().checked_sub(1) else {
            return Duration::ZERO;
        };
        let i = usize::try_from(attempt_index).unwrap_or(usize::MAX).min(last);
        self.backoff_steps[i]
    }

    /// Sum of all backoff sleeps a fully exhausted retry loop performs, saturating at `Duration::MAX`.
    pub fn total_backoff(&self) -> Duration {
        (0..self.max_attempts.saturating_sub(1))
            .map(|i| self.backoff_delay(i64::from(i)))
            .fold(Duration::ZERO, Duration::saturating_add)
    }

    /// Decide what to do after attempt `attempt_index` (0-based) produced `kind`.
    pub fn decide(&self, attempt_index: u32, kind: Option<ErrorKind>) -> RetryDecision {
        if attempt_index.saturating_add(1) >= self.max_attempts {
            return RetryDecision::NoRetry;
        }
        if !self.is_retryable(kind) {
            return RetryDecision::NoRetry;
        }
        RetryDecision::RetryAfter(self.backoff_delay(i64::from(attempt_index)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secs(list: &[u64]) -> Vec<Duration> {
        list.iter().map(|s| Duration::from_secs(*s)).collect()
    }

    #[test]
    fn backoff_indexing_clamps_to_last_step() {
        let p = RetryPolicy::new(3, secs(&[1, 2, 4])).unwrap();
        assert_eq!(p.backoff_delay(0), Duration::from_secs(1));
        assert_eq!(p.backoff_delay(1), Duration::from_secs(2));
        assert_eq!(p.backoff_delay(2), Duration::from_secs(4));
        assert_eq!(p.backoff_delay(5), Duration::from_secs(4));
        assert_eq!(p.backoff_delay(-1), Duration::ZERO);
    }

    #[test]
    fn empty_backoff_table_retries_immediately() {
        let p = RetryPolicy::new(3, Vec::new()).unwrap();
        assert_eq!(p.backoff_delay(0), Duration::ZERO);
        assert_eq!(
            p.decide(0, Some(ErrorKind::Timeout)),
            RetryDecision::RetryAfter(Duration::ZERO)
        );
    }

    #[test]
    fn zero_attempts_is_config_error() {
        assert_eq!(
            RetryPolicy::new(0, secs(&[1])),
            Err(ConfigError::MaxAttempts(0))
        );
    }

    #[test]
    fn only_transient_kinds_are_retryable_by_default() {
        let p = RetryPolicy::default();
        for kind in ErrorKind::ALL {
            assert_eq!(p.is_retryable(Some(kind)), kind.is_transient(), "{kind}");
        }
        assert!(!p.is_retryable(None));
    }

    #[test]
    fn terminal_kinds_never_retry() {
        let p = RetryPolicy::default();
        assert_eq!(p.decide(0, Some(ErrorKind::Http404)), RetryDecision::NoRetry);
        assert_eq!(p.decide(0, Some(ErrorKind::Http500)), RetryDecision::NoRetry);
        assert_eq!(p.decide(0, None), RetryDecision::NoRetry);
    }

    #[test]
    fn respects_max_attempts() {
        let p = RetryPolicy::new(3, secs(&[1, 2, 4])).unwrap();
        assert_eq!(
            p.decide(0, Some(ErrorKind::Timeout)),
            RetryDecision::RetryAfter(Duration::from_secs(1))
        );
        assert_eq!(
            p.decide(1, Some(ErrorKind::Timeout)),
            RetryDecision::RetryAfter(Duration::from_secs(2))
        );
        assert_eq!(p.decide(2, Some(ErrorKind::Timeout)), RetryDecision::NoRetry);
    }

    #[test]
    fn custom_retryable_set() {
        let p = RetryPolicy::default().with_retryable_kinds([ErrorKind::Http503]);
        assert!(p.is_retryable(Some(ErrorKind::Http503)));
        assert!(!p.is_retryable(Some(ErrorKind::Timeout)));
    }

    #[test]
    fn total_backoff_sums_performed_sleeps() {
        let p = RetryPolicy::new(4, secs(&[1, 2])).unwrap();
        // retries after attempts 0, 1, 2 -> 1 + 2 + 2
        assert_eq!(p.total_backoff(), Duration::from_secs(5));
        assert_eq!(RetryPolicy::no_retry().total_backoff(), Duration::ZERO);
    }

    #[test]
    fn total_backoff_saturates_on_huge_steps() {
        let huge = Duration::try_from_secs_f64(1e19).unwrap();
        let p = RetryPolicy::new(3, vec![huge]).unwrap();
        assert_eq!(p.total_backoff(), Duration::MAX);
    }

    #[test]
    fn error_kind_names_round_trip() {
        for kind in ErrorKind::ALL {
            assert_eq!(kind.as_str().parse::<ErrorKind>().unwrap(), kind);
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(json, format!("\"{}\"", kind.as_str()));
        }
        assert_eq!("timeout".parse::<ErrorKind>().unwrap(), ErrorKind::Timeout);
        assert!("HTTP_418".parse::<ErrorKind>().is_err());
    }
}
