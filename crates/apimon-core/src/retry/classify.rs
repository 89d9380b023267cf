//! Classify HTTP responses and transport failures into error kinds.

use std::collections::BTreeMap;
use std::time::Duration;

use super::error::TransportError;
use super::policy::ErrorKind;
use crate::result::{ResponseBody, ResponseSnapshot, Status};

/// Raw response as handed back by a transport.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawResponse {
    pub status_code: u32,
    /// Header lines of the final response, in arrival order.
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

/// Outcome of classifying one attempt, before timing and request capture are attached.
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub status_code: Option<u16>,
    /// `None` means success.
    pub error_kind: Option<ErrorKind>,
    pub error_message: Option<String>,
    pub response: Option<ResponseSnapshot>,
}

impl Classification {
    pub fn status(&self) -> Status {
        if self.error_kind.is_none() {
            Status::Success
        } else {
            Status::Failed
        }
    }

    fn failed(kind: ErrorKind, message: String) -> Self {
        Self {
            status_code: None,
            error_kind: Some(kind),
            error_message: Some(message),
            response: None,
        }
    }
}

/// Classify an HTTP status code. `None` means success.
///
/// Codes outside the HTTP range (below 100, or too large to be a status) are `UnknownError`.
pub fn classify_http_status(code: u32) -> Option<ErrorKind> {
    match code {
        100..=399 => None,
        404 => Some(ErrorKind::Http404),
        500 => Some(ErrorKind::Http500),
        503 => Some(ErrorKind::Http503),
        400..=499 => Some(ErrorKind::ValidationError),
        500..=999 => Some(ErrorKind::Http500),
        _ => Some(ErrorKind::UnknownError),
    }
}

/// Classify a received response and capture its snapshot.
pub fn classify_response(response: &RawResponse) -> Classification {
    let kind = classify_http_status(response.status_code);
    // Codes outside the HTTP range are not reported as a status code.
    let status_code = match response.status_code {
        100..=999 => u16::try_from(response.status_code).ok(),
        _ => None,
    };
    let error_message = kind.map(|k| match k {
        ErrorKind::ValidationError => format!("client error (HTTP {})", response.status_code),
        ErrorKind::Http500 if response.status_code != 500 => {
            format!("server error (HTTP {})", response.status_code)
        }
        ErrorKind::UnknownError => format!("not an HTTP status code: {}", response.status_code),
        other => format!("{} (HTTP {})", other.description(), response.status_code),
    });
    Classification {
        status_code,
        error_kind: kind,
        error_message,
        response: Some(snapshot_response(response)),
    }
}

/// Classification for an attempt that exceeded its timeout.
pub fn classify_timeout(elapsed: Duration) -> Classification {
    Classification::failed(
        ErrorKind::Timeout,
        format!("request timed out after {:.2}ms", elapsed.as_secs_f64() * 1000.0),
    )
}

/// Map a transport failure to an error kind.
///
/// Tagged variants map directly; free-form messages fall back to substring
/// matching ("timeout", "connection", "dns"/"resolve"), defaulting to `NetworkError`.
pub fn classify_transport_error(err: &TransportError) -> ErrorKind {
    match err {
        TransportError::TimedOut => ErrorKind::Timeout,
        TransportError::Refused(_) => ErrorKind::ConnectionError,
        TransportError::DnsFailure(_) => ErrorKind::DnsError,
        TransportError::TlsFailure(_) => ErrorKind::NetworkError,
        TransportError::Cancelled => ErrorKind::UnknownError,
        TransportError::Other(msg) => classify_error_message(msg),
    }
}

fn classify_error_message(msg: &str) -> ErrorKind {
    let lower = msg.to_ascii_lowercase();
    if lower.contains("timeout") || lower.contains("timed out") {
        ErrorKind::Timeout
    } else if lower.contains("connection") {
        ErrorKind::ConnectionError
    } else if lower.contains("dns") || lower.contains("resolve") {
        ErrorKind::DnsError
    } else {
        ErrorKind::NetworkError
    }
}

/// Classification for a transport failure. No response snapshot is captured.
pub fn classify_transport(err: &TransportError, elapsed: Duration) -> Classification {
    match classify_transport_error(err) {
        ErrorKind::Timeout => classify_timeout(elapsed),
        kind => Classification::failed(kind, err.to_string()),
    }
}

/// Capture status, headers, and body. Never fails: an unreadable body degrades to `Empty`.
fn snapshot_response(response: &RawResponse) -> ResponseSnapshot {
    let headers: BTreeMap<String, String> = response.headers.iter().cloned().collect();
    ResponseSnapshot {
        status_code: u16::try_from(response.status_code).unwrap_or(0),
        headers,
        body: capture_body(&response.body),
    }
}

fn capture_body(bytes: &[u8]) -> ResponseBody {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return ResponseBody::Empty;
    }
    if let Ok(value) = serde_json::from_slice(bytes) {
        return ResponseBody::Json(value);
    }
    match std::str::from_utf8(bytes) {
        Ok(text) => ResponseBody::Text(text.to_string()),
        Err(e) => {
            tracing::debug!("response body not captured: {}", e);
            ResponseBody::Empty
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn response(code: u32, body: &[u8]) -> RawResponse {
        RawResponse {
            status_code: code,
            headers: vec![("Content-Type".into(), "application/json".into())],
            body: body.to_vec(),
        }
    }

    #[test]
    fn status_code_taxonomy() {
        assert_eq!(classify_http_status(200), None);
        assert_eq!(classify_http_status(302), None);
        assert_eq!(classify_http_status(404), Some(ErrorKind::Http404));
        assert_eq!(classify_http_status(500), Some(ErrorKind::Http500));
        assert_eq!(classify_http_status(503), Some(ErrorKind::Http503));
        assert_eq!(classify_http_status(430), Some(ErrorKind::ValidationError));
        assert_eq!(classify_http_status(401), Some(ErrorKind::ValidationError));
        assert_eq!(classify_http_status(599), Some(ErrorKind::Http500));
        assert_eq!(classify_http_status(502), Some(ErrorKind::Http500));
        assert_eq!(classify_http_status(0), Some(ErrorKind::UnknownError));
    }

    #[test]
    fn status_code_agrees_with_outcome() {
        for code in [0u32, 99, 200, 404, 1000] {
            let c = classify_response(&response(code, b""));
            let success = c.status() == Status::Success;
            assert_eq!(success, c.error_kind.is_none(), "code {}", code);
            assert_eq!(success, c.status_code.is_some_and(|s| s < 400), "code {}", code);
        }
        let c = classify_response(&response(0, b""));
        assert_eq!(c.status_code, None);
        assert_eq!(c.error_kind, Some(ErrorKind::UnknownError));
        assert_eq!(classify_response(&response(1000, b"")).status_code, None);
        assert_eq!(classify_response(&response(404, b"")).status_code, Some(404));
    }

    #[test]
    fn success_has_no_kind_or_message() {
        let c = classify_response(&response(200, br#"{"ok": true}"#));
        assert_eq!(c.status(), Status::Success);
        assert_eq!(c.status_code, Some(200));
        assert!(c.error_kind.is_none());
        assert!(c.error_message.is_none());
        let snap = c.response.unwrap();
        assert_eq!(snap.body, ResponseBody::Json(json!({"ok": true})));
        assert_eq!(snap.headers["Content-Type"], "application/json");
    }

    #[test]
    fn failure_keeps_snapshot() {
        let c = classify_response(&response(503, b"down for maintenance"));
        assert_eq!(c.status(), Status::Failed);
        assert_eq!(c.error_kind, Some(ErrorKind::Http503));
        assert_eq!(c.error_message.as_deref(), Some("service unavailable (HTTP 503)"));
        assert_eq!(
            c.response.unwrap().body,
            ResponseBody::Text("down for maintenance".into())
        );
    }

    #[test]
    fn unreadable_body_degrades_to_empty() {
        let c = classify_response(&response(200, &[0xff, 0xfe, 0x00, 0x80]));
        assert_eq!(c.response.unwrap().body, ResponseBody::Empty);
        let c = classify_response(&response(204, b""));
        assert_eq!(c.response.unwrap().body, ResponseBody::Empty);
    }

    #[test]
    fn timeout_message_embeds_elapsed() {
        let c = classify_timeout(Duration::from_millis(1500));
        assert_eq!(c.error_kind, Some(ErrorKind::Timeout));
        assert!(c.error_message.unwrap().contains("1500.00ms"));
        assert!(c.response.is_none());
    }

    #[test]
    fn transport_errors_by_tag() {
        assert_eq!(classify_transport_error(&TransportError::TimedOut), ErrorKind::Timeout);
        assert_eq!(
            classify_transport_error(&TransportError::Refused("127.0.0.1:1".into())),
            ErrorKind::ConnectionError
        );
        assert_eq!(
            classify_transport_error(&TransportError::DnsFailure("nope.invalid".into())),
            ErrorKind::DnsError
        );
        assert_eq!(
            classify_transport_error(&TransportError::TlsFailure("bad cert".into())),
            ErrorKind::NetworkError
        );
    }

    #[test]
    fn transport_errors_by_message() {
        let other = |m: &str| classify_transport_error(&TransportError::Other(m.into()));
        assert_eq!(other("read timeout"), ErrorKind::Timeout);
        assert_eq!(other("Connection reset by peer"), ErrorKind::ConnectionError);
        assert_eq!(other("failed to resolve name"), ErrorKind::DnsError);
        assert_eq!(other("DNS lookup failed"), ErrorKind::DnsError);
        assert_eq!(other("unexpected EOF"), ErrorKind::NetworkError);
    }

    #[test]
    fn transport_classification_has_no_response() {
        let c = classify_transport(
            &TransportError::Refused("refused".into()),
            Duration::from_millis(2),
        );
        assert_eq!(c.error_kind, Some(ErrorKind::ConnectionError));
        assert!(c.status_code.is_none());
        assert!(c.response.is_none());
    }
}
