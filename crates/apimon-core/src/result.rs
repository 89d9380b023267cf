//! Per-interface probe outcome and the request/response captures attached to it.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use crate::interface::InterfaceRef;
use crate::retry::{Classification, ErrorKind};

/// Final verdict for one interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
    Success,
    Failed,
}

/// What was actually sent for an attempt.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RequestSnapshot {
    pub method: String,
    /// Full URL including the encoded query string.
    pub url: String,
    pub headers: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
}

/// Body capture of a response: parsed JSON when possible, raw text otherwise.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum ResponseBody {
    #[default]
    Empty,
    Json(Value),
    Text(String),
}

/// What came back for an attempt. Absent when no response was received.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct ResponseSnapshot {
    pub status_code: u16,
    pub headers: BTreeMap<String, String>,
    pub body: ResponseBody,
}

/// Classified outcome of probing one interface, including all retries.
///
/// `status == Success` exactly when `error_kind` is `None`, which in turn only
/// happens for a received status code below 400.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonitorResult {
    pub interface: InterfaceRef,
    pub status: Status,
    pub status_code: Option<u16>,
    /// Elapsed time of the final attempt in milliseconds; 0 if never attempted.
    pub response_time_ms: f64,
    pub error_kind: Option<ErrorKind>,
    pub error_message: Option<String>,
    pub request: Option<RequestSnapshot>,
    pub response: Option<ResponseSnapshot>,
    pub timestamp: DateTime<Utc>,
    /// Attempts performed beyond the first.
    pub retry_count: u32,
}

impl MonitorResult {
    /// Build a result from a classification. Status is derived from the error kind.
    pub fn from_classification(
        interface: InterfaceRef,
        classification: Classification,
        elapsed: Duration,
        request: Option<RequestSnapshot>,
    ) -> Self {
        let status = if classification.error_kind.is_none() {
            Status::Success
        } else {
            Status::Failed
        };
        Self {
            interface,
            status,
            status_code: classification.status_code,
            response_time_ms: duration_ms(elapsed),
            error_kind: classification.error_kind,
            error_message: classification.error_message,
            request,
            response: classification.response,
            timestamp: Utc::now(),
            retry_count: 0,
        }
    }

    /// Failure produced inside the engine rather than by the probed service.
    pub fn unknown_error(
        interface: InterfaceRef,
        message: impl Into<String>,
        elapsed: Duration,
        request: Option<RequestSnapshot>,
    ) -> Self {
        Self {
            interface,
            status: Status::Failed,
            status_code: None,
            response_time_ms: duration_ms(elapsed),
            error_kind: Some(ErrorKind::UnknownError),
            error_message: Some(message.into()),
            request,
            response: None,
            timestamp: Utc::now(),
            retry_count: 0,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == Status::Success
    }

    pub fn is_failed(&self) -> bool {
        self.status == Status::Failed
    }

    /// `"OK"` on success, otherwise `[KIND] message (HTTP code)` with absent parts omitted.
    pub fn error_summary(&self) -> String {
        if self.is_success() {
            return "OK".to_string();
        }
        let mut parts = Vec::new();
        if let Some(kind) = self.error_kind {
            parts.push(format!("[{}]", kind));
        }
        if let Some(msg) = self.error_message.as_deref() {
            parts.push(msg.to_string());
        }
        if let Some(code) = self.status_code {
            parts.push(format!("(HTTP {})", code));
        }
        if parts.is_empty() {
            "unknown error".to_string()
        } else {
            parts.join(" ")
        }
    }
}

impl fmt::Display for MonitorResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_success() {
            write!(
                f,
                "{}: SUCCESS ({:.2}ms)",
                self.interface.name, self.response_time_ms
            )
        } else {
            write!(f, "{}: FAILED - {}", self.interface.name, self.error_summary())
        }
    }
}

pub(crate) fn duration_ms(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}
