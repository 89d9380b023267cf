//! Request building.
//!
//! Turns a descriptor plus an optional token into a ready-to-send request:
//! URL join against the base URL, query encoding, header defaults, and auth
//! injection.

mod headers;
mod join;

pub use self::headers::{build_headers, AUTH_HEADER_NAMES, DEFAULT_USER_AGENT};
pub use self::join::{append_query, build_url, is_absolute};

use serde_json::Value;
use std::collections::BTreeMap;

use crate::interface::{HttpMethod, InterfaceDescriptor};
use crate::result::RequestSnapshot;

/// Fully resolved request for one attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedRequest {
    pub method: HttpMethod,
    /// Absolute URL (when a base is configured) with the query string appended.
    pub url: String,
    pub headers: BTreeMap<String, String>,
    pub body: Option<Value>,
}

impl PreparedRequest {
    pub fn snapshot(&self) -> RequestSnapshot {
        RequestSnapshot {
            method: self.method.as_str().to_string(),
            url: self.url.clone(),
            headers: self.headers.clone(),
            body: self.body.clone(),
        }
    }

    /// Serialized body bytes, if any.
    pub fn body_bytes(&self) -> Option<Vec<u8>> {
        self.body.as_ref().map(|v| v.to_string().into_bytes())
    }
}

/// Builds requests relative to an optional base URL.
#[derive(Debug, Clone, Default)]
pub struct RequestBuilder {
    base_url: Option<String>,
}

impl RequestBuilder {
    pub fn new(base_url: Option<String>) -> Self {
        Self { base_url }
    }

    pub fn base_url(&self) -> Option<&str> {
        self.base_url.as_deref()
    }

    pub fn build(&self, interface: &InterfaceDescriptor, token: Option<&str>) -> PreparedRequest {
        let url = build_url(self.base_url.as_deref(), &interface.url);
        PreparedRequest {
            method: interface.method,
            url: append_query(&url, &interface.params),
            headers: build_headers(&interface.headers, token),
            body: interface.has_body().then(|| interface.body.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn build_resolves_everything() {
        let iface = InterfaceDescriptor::new("create", HttpMethod::Post, "/v1/items")
            .with_param("dry_run", json!(true))
            .with_header("X-Trace", "1")
            .with_body(json!({"name": "widget"}));
        let req = RequestBuilder::new(Some("https://api.example.com/".into())).build(&iface, Some("tok"));
        assert_eq!(req.method, HttpMethod::Post);
        assert_eq!(req.url, "https://api.example.com/v1/items?dry_run=true");
        assert_eq!(req.headers["Authorization"], "Bearer tok");
        assert_eq!(req.headers["X-Trace"], "1");
        assert_eq!(req.body, Some(json!({"name": "widget"})));
        assert_eq!(req.body_bytes().unwrap(), br#"{"name":"widget"}"#.to_vec());

        let snap = req.snapshot();
        assert_eq!(snap.method, "POST");
        assert_eq!(snap.url, req.url);
    }

    #[test]
    fn empty_body_not_sent() {
        let iface = InterfaceDescriptor::new("list", HttpMethod::Get, "https://h/x").with_body(json!({}));
        let req = RequestBuilder::default().build(&iface, None);
        assert!(req.body.is_none());
        assert!(req.body_bytes().is_none());
    }
}
