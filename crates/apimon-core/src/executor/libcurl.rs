//! libcurl-backed transport.
//!
//! One `Easy` handle per attempt, run on the calling (worker) thread. A progress
//! callback watches the slot's cancel token so an abandoned transfer is aborted
//! rather than left running in the background.

use curl::easy::{Easy, List};
use std::str;
use std::time::Duration;

use super::Transport;
use crate::control::CancelToken;
use crate::interface::HttpMethod;
use crate::request::PreparedRequest;
use crate::retry::{RawResponse, TransportError};

/// Largest timeout handed to libcurl, which takes milliseconds as a C long.
const MAX_CURL_TIMEOUT: Duration = Duration::from_millis(i32::MAX as u64);

/// Blocking HTTP transport using the curl crate.
#[derive(Debug, Clone, Copy)]
pub struct CurlTransport {
    follow_redirects: bool,
}

impl Default for CurlTransport {
    fn default() -> Self {
        Self {
            follow_redirects: true,
        }
    }
}

impl CurlTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Report 3xx responses as-is instead of following them.
    pub fn without_redirects(mut self) -> Self {
        self.follow_redirects = false;
        self
    }

    fn configure(
        &self,
        easy: &mut Easy,
        request: &PreparedRequest,
        timeout: Duration,
    ) -> Result<(), curl::Error> {
        let timeout = timeout.min(MAX_CURL_TIMEOUT);
        easy.url(&request.url)?;
        easy.follow_location(self.follow_redirects)?;
        easy.timeout(timeout)?;
        easy.connect_timeout(timeout)?;
        // Timeouts must not rely on SIGALRM when transfers run on worker threads.
        easy.signal(false)?;
        easy.progress(true)?;

        match (request.method, request.body_bytes()) {
            (HttpMethod::Head, _) => easy.nobody(true)?,
            (HttpMethod::Get, None) => easy.get(true)?,
            (HttpMethod::Post, None) => easy.post_fields_copy(&[])?,
            (method, None) => easy.custom_request(method.as_str())?,
            (method, Some(bytes)) => {
                easy.post_fields_copy(&bytes)?;
                if method != HttpMethod::Post {
                    easy.custom_request(method.as_str())?;
                }
            }
        }

        let mut list = List::new();
        for (k, v) in &request.headers {
            list.append(&format!("{}: {}", k.trim(), v.trim()))?;
        }
        // Send small bodies immediately instead of waiting on 100-continue.
        list.append("Expect:")?;
        easy.http_headers(list)?;
        Ok(())
    }
}

impl Transport for CurlTransport {
    fn send(
        &self,
        request: &PreparedRequest,
        timeout: Duration,
        cancel: &CancelToken,
    ) -> Result<RawResponse, TransportError> {
        let mut easy = Easy::new();
        self.configure(&mut easy, request, timeout)
            .map_err(transport_error_from_curl)?;

        let mut header_lines: Vec<String> = Vec::new();
        let mut body: Vec<u8> = Vec::new();
        {
            let mut transfer = easy.transfer();
            transfer
                .header_function(|data| {
                    if let Ok(s) = str::from_utf8(data) {
                        header_lines.push(s.trim_end().to_string());
                    }
                    true
                })
                .map_err(transport_error_from_curl)?;
            transfer
                .write_function(|data| {
                    body.extend_from_slice(data);
                    Ok(data.len())
                })
                .map_err(transport_error_from_curl)?;
            transfer
                .progress_function(|_, _, _, _| !cancel.is_cancelled())
                .map_err(transport_error_from_curl)?;
            transfer.perform().map_err(transport_error_from_curl)?;
        }

        let status_code = easy.response_code().map_err(transport_error_from_curl)?;
        Ok(RawResponse {
            status_code,
            headers: parse_header_lines(&header_lines),
            body,
        })
    }
}

/// Normalize a curl error into the transport taxonomy.
pub fn transport_error_from_curl(e: curl::Error) -> TransportError {
    if e.is_operation_timedout() {
        return TransportError::TimedOut;
    }
    if e.is_aborted_by_callback() {
        return TransportError::Cancelled;
    }
    if e.is_couldnt_resolve_host() || e.is_couldnt_resolve_proxy() {
        return TransportError::DnsFailure(e.to_string());
    }
    if e.is_couldnt_connect() {
        return TransportError::Refused(e.to_string());
    }
    if e.is_ssl_connect_error() || e.is_peer_failed_verification() || e.is_ssl_certproblem() {
        return TransportError::TlsFailure(e.to_string());
    }
    TransportError::Other(e.to_string())
}

/// Parse raw header lines into `(name, value)` pairs.
///
/// Each status line starts a new header block, so after redirects only the
/// final response's headers remain.
pub(crate) fn parse_header_lines(lines: &[String]) -> Vec<(String, String)> {
    let mut headers = Vec::new();
    for line in lines {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line.starts_with("HTTP/") {
            headers.clear();
            continue;
        }
        if let Some((name, value)) = line.split_once(':') {
            headers.push((name.trim().to_string(), value.trim().to_string()));
        }
    }
    headers
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn parse_header_lines_basic() {
        let h = parse_header_lines(&lines(&[
            "HTTP/1.1 200 OK",
            "Content-Type: application/json",
            "X-Request-Id:  abc ",
            "",
        ]));
        assert_eq!(
            h,
            vec![
                ("Content-Type".to_string(), "application/json".to_string()),
                ("X-Request-Id".to_string(), "abc".to_string()),
            ]
        );
    }

    #[test]
    fn parse_header_lines_keeps_final_block_after_redirect() {
        let h = parse_header_lines(&lines(&[
            "HTTP/1.1 302 Found",
            "Location: /elsewhere",
            "",
            "HTTP/1.1 200 OK",
            "Content-Length: 2",
        ]));
        assert_eq!(h, vec![("Content-Length".to_string(), "2".to_string())]);
    }
}
