//! Header merging and auth injection.

use std::collections::BTreeMap;

/// User-Agent sent when the descriptor does not set one.
pub const DEFAULT_USER_AGENT: &str = concat!("apimon/", env!("CARGO_PKG_VERSION"));

/// Header names treated as carrying credentials, in injection priority order.
pub const AUTH_HEADER_NAMES: [&str; 3] = ["Authorization", "authorization", "Auth-Token"];

fn has_header(headers: &BTreeMap<String, String>, name: &str) -> bool {
    headers.keys().any(|k| k.eq_ignore_ascii_case(name))
}

/// Merge defaults and the bearer token into the descriptor's headers.
///
/// `Content-Type: application/json` and `User-Agent` are added only when absent.
/// A non-empty token is injected as `Bearer <token>` under the first auth header
/// name not already present. Header names compare case-insensitively, so any
/// existing auth header suppresses injection and is never overwritten.
pub fn build_headers(
    base: &BTreeMap<String, String>,
    token: Option<&str>,
) -> BTreeMap<String, String> {
    let mut headers = base.clone();
    if !has_header(&headers, "Content-Type") {
        headers.insert("Content-Type".to_string(), "application/json".to_string());
    }
    if !has_header(&headers, "User-Agent") {
        headers.insert("User-Agent".to_string(), DEFAULT_USER_AGENT.to_string());
    }
    let token = token.map(str::trim).filter(|t| !t.is_empty());
    if let Some(token) = token {
        let already_authenticated = AUTH_HEADER_NAMES.iter().any(|n| has_header(&headers, n));
        if !already_authenticated {
            if let Some(name) = AUTH_HEADER_NAMES.iter().find(|n| !has_header(&headers, n)) {
                headers.insert((*name).to_string(), format!("Bearer {}", token));
            }
        }
    }
    headers
}
