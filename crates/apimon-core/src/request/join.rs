//! URL joining and query-string encoding.

use serde_json::Value;
use std::collections::BTreeMap;
use ::url::form_urlencoded;

/// True if `url` starts with `scheme://`.
pub fn is_absolute(url: &str) -> bool {
    let Some((scheme, _)) = url.split_once("://") else {
        return false;
    };
    let mut chars = scheme.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}

/// Join an interface URL onto an optional base.
///
/// Absolute interface URLs are returned unchanged. Otherwise the base (without
/// trailing slashes) and the path (without leading slashes) are joined with one
/// `/`. Without a base the interface URL is returned as written.
pub fn build_url(base: Option<&str>, interface_url: &str) -> String {
    let interface_url = interface_url.trim();
    if is_absolute(interface_url) {
        return interface_url.to_string();
    }
    match base.map(str::trim).filter(|b| !b.is_empty()) {
        Some(base) => format!(
            "{}/{}",
            base.trim_end_matches('/'),
            interface_url.trim_start_matches('/')
        ),
        None => interface_url.to_string(),
    }
}

/// Append form-urlencoded `params` to `url`.
///
/// Strings are sent verbatim, other scalars in their JSON form, arrays as
/// repeated keys; nulls are skipped.
pub fn append_query(url: &str, params: &BTreeMap<String, Value>) -> String {
    let mut serializer = form_urlencoded::Serializer::new(String::new());
    let mut any = false;
    for (key, value) in params {
        let values: Vec<&Value> = match value {
            Value::Array(items) => items.iter().collect(),
            other => vec![other],
        };
        for v in values {
            if let Some(s) = scalar_to_query(v) {
                serializer.append_pair(key, &s);
                any = true;
            }
        }
    }
    if !any {
        return url.to_string();
    }
    let query = serializer.finish();
    let sep = if url.contains('?') { '&' } else { '?' };
    format!("{}{}{}", url, sep, query)
}

fn scalar_to_query(v: &Value) -> Option<String> {
    match v {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn absolute_detection() {
        assert!(is_absolute("https://api.example.com/x"));
        assert!(is_absolute("http://localhost:8080"));
        assert!(!is_absolute("/users"));
        assert!(!is_absolute("users?next=http://x"));
        assert!(!is_absolute("1http://x"));
    }

    #[test]
    fn join_trims_slashes() {
        assert_eq!(
            build_url(Some("https://api.example.com/"), "/v1/users"),
            "https://api.example.com/v1/users"
        );
        assert_eq!(
            build_url(Some("https://api.example.com"), "v1/users"),
            "https://api.example.com/v1/users"
        );
        assert_eq!(
            build_url(Some("https://api.example.com/base//"), "//v1"),
            "https://api.example.com/base/v1"
        );
    }

    #[test]
    fn absolute_interface_url_wins() {
        assert_eq!(
            build_url(Some("https://api.example.com"), "https://other.example.com/ping"),
            "https://other.example.com/ping"
        );
    }

    #[test]
    fn no_base_keeps_url() {
        assert_eq!(build_url(None, "/health"), "/health");
        assert_eq!(build_url(Some("  "), "/health"), "/health");
    }

    #[test]
    fn query_encoding() {
        let mut params = BTreeMap::new();
        params.insert("q".to_string(), json!("a b&c"));
        params.insert("page".to_string(), json!(2));
        params.insert("tag".to_string(), json!(["x", "y"]));
        params.insert("skip".to_string(), Value::Null);
        assert_eq!(
            append_query("https://h/s", &params),
            "https://h/s?page=2&q=a+b%26c&tag=x&tag=y"
        );
        assert_eq!(append_query("https://h/s?v=1", &params).matches('?').count(), 1);
        assert_eq!(append_query("https://h/s", &BTreeMap::new()), "https://h/s");
    }
}
