//! Interface descriptors: the endpoints a batch probes.
//!
//! Descriptors are validated once at ingestion (`validate`, `load_interfaces`)
//! so request building can assume a well-formed method and a non-empty URL.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use crate::error::DescriptorError;

/// Service name to bearer token. A missing entry means "probe unauthenticated".
pub type TokenMap = HashMap<String, String>;

/// HTTP methods a descriptor may use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Head,
    Options,
}

impl HttpMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Head => "HEAD",
            HttpMethod::Options => "OPTIONS",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HttpMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "GET" => Ok(HttpMethod::Get),
            "POST" => Ok(HttpMethod::Post),
            "PUT" => Ok(HttpMethod::Put),
            "PATCH" => Ok(HttpMethod::Patch),
            "DELETE" => Ok(HttpMethod::Delete),
            "HEAD" => Ok(HttpMethod::Head),
            "OPTIONS" => Ok(HttpMethod::Options),
            _ => Err(format!("unsupported HTTP method {:?}", s)),
        }
    }
}

impl TryFrom<String> for HttpMethod {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<HttpMethod> for String {
    fn from(m: HttpMethod) -> Self {
        m.as_str().to_string()
    }
}

/// One HTTP endpoint to probe. Read-only for the duration of a batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterfaceDescriptor {
    pub name: String,
    pub method: HttpMethod,
    /// Absolute URL, or a path joined onto the engine's base URL.
    pub url: String,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    /// Query parameters. Arrays become repeated keys; null values are skipped.
    #[serde(default)]
    pub params: BTreeMap<String, Value>,
    /// JSON body. `null` (the default) or an empty object/array sends no body.
    #[serde(default)]
    pub body: Value,
    /// Key into the token map.
    #[serde(default)]
    pub service: String,
}

impl InterfaceDescriptor {
    /// Minimal descriptor; the remaining fields start empty.
    pub fn new(name: impl Into<String>, method: HttpMethod, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            method,
            url: url.into(),
            headers: BTreeMap::new(),
            params: BTreeMap::new(),
            body: Value::Null,
            service: String::new(),
        }
    }

    pub fn with_service(mut self, service: impl Into<String>) -> Self {
        self.service = service.into();
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn with_param(mut self, name: impl Into<String>, value: Value) -> Self {
        self.params.insert(name.into(), value);
        self
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = body;
        self
    }

    pub fn validate(&self) -> Result<(), DescriptorError> {
        if self.url.trim().is_empty() {
            return Err(DescriptorError::EmptyUrl {
                name: self.name.clone(),
            });
        }
        Ok(())
    }

    /// True when the body is set and not empty or falsy (`0`, `false`, `""`).
    pub fn has_body(&self) -> bool {
        match &self.body {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
            Value::String(s) => !s.is_empty(),
            Value::Object(m) => !m.is_empty(),
            Value::Array(a) => !a.is_empty(),
        }
    }

    /// Identifying fields carried on each result, tagged with the input position.
    pub fn reference(&self, index: usize) -> InterfaceRef {
        InterfaceRef {
            index,
            name: self.name.clone(),
            method: self.method,
            url: self.url.clone(),
            service: self.service.clone(),
        }
    }
}

/// Back-reference from a result to the descriptor it was produced for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InterfaceRef {
    /// Position of the descriptor in the batch input.
    pub index: usize,
    pub name: String,
    pub method: HttpMethod,
    pub url: String,
    pub service: String,
}

/// Raw on-disk shape; method is kept as a string so a bad value reports which interface it came from.
#[derive(Debug, Deserialize)]
struct RawDescriptor {
    #[serde(default)]
    name: String,
    #[serde(default)]
    method: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    headers: BTreeMap<String, String>,
    #[serde(default)]
    params: BTreeMap<String, Value>,
    #[serde(default)]
    body: Value,
    #[serde(default)]
    service: String,
}

impl TryFrom<RawDescriptor> for InterfaceDescriptor {
    type Error = DescriptorError;

    fn try_from(raw: RawDescriptor) -> Result<Self, Self::Error> {
        if raw.method.trim().is_empty() {
            return Err(DescriptorError::EmptyMethod { name: raw.name });
        }
        let method = raw
            .method
            .parse::<HttpMethod>()
            .map_err(|_| DescriptorError::UnsupportedMethod {
                name: raw.name.clone(),
                method: raw.method.clone(),
            })?;
        let descriptor = InterfaceDescriptor {
            name: raw.name,
            method,
            url: raw.url.trim().to_string(),
            headers: raw.headers,
            params: raw.params,
            body: raw.body,
            service: raw.service,
        };
        descriptor.validate()?;
        Ok(descriptor)
    }
}

/// Parse and validate a JSON array of descriptors.
pub fn parse_interfaces(json: &str) -> Result<Vec<InterfaceDescriptor>> {
    let raw: Vec<RawDescriptor> = serde_json::from_str(json).context("parse interface list")?;
    raw.into_iter()
        .enumerate()
        .map(|(i, r)| {
            InterfaceDescriptor::try_from(r).with_context(|| format!("interface #{}", i))
        })
        .collect()
}

/// Load and validate descriptors from a JSON file.
pub fn load_interfaces(path: &Path) -> Result<Vec<InterfaceDescriptor>> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("read interfaces file: {}", path.display()))?;
    let interfaces = parse_interfaces(&data)
        .with_context(|| format!("load interfaces from {}", path.display()))?;
    tracing::debug!(count = interfaces.len(), path = %path.display(), "loaded interfaces");
    Ok(interfaces)
}

/// Load a `{ "service": "token" }` JSON object.
pub fn load_token_map(path: &Path) -> Result<TokenMap> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("read token file: {}", path.display()))?;
    let tokens: TokenMap =
        serde_json::from_str(&data).with_context(|| format!("parse token file: {}", path.display()))?;
    Ok(tokens)
}
