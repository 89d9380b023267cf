use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::engine::EngineSettings;
use crate::error::ConfigError;
use crate::retry::{ErrorKind, RetryPolicy};

/// Retry policy parameters (optional `[retry]` section in config.toml).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of attempts per interface (including the first).
    pub max_attempts: u32,
    /// Backoff table in seconds; the last entry is reused for later retries.
    #[serde(default)]
    pub backoff_secs: Vec<f64>,
    /// Kinds to retry, by wire name (e.g. "TIMEOUT"). Missing = transient kinds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retryable_kinds: Option<Vec<String>>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_secs: vec![1.0, 2.0, 4.0],
            retryable_kinds: None,
        }
    }
}

impl RetryConfig {
    pub fn to_policy(&self) -> Result<RetryPolicy, ConfigError> {
        let mut steps = Vec::with_capacity(self.backoff_secs.len());
        for secs in &self.backoff_secs {
            let step = Duration::try_from_secs_f64(*secs)
                .map_err(|_| ConfigError::Backoff(secs.to_string()))?;
            steps.push(step);
        }
        let policy = RetryPolicy::new(self.max_attempts, steps)?;
        match &self.retryable_kinds {
            None => Ok(policy),
            Some(names) => {
                let kinds = names
                    .iter()
                    .map(|n| n.parse::<ErrorKind>())
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(policy.with_retryable_kinds(kinds))
            }
        }
    }
}

/// Global configuration loaded from `~/.config/apimon/config.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Worker pool size for a batch.
    pub concurrency: usize,
    /// Per-attempt timeout in seconds.
    pub timeout_secs: u64,
    /// Base URL that relative interface URLs are joined onto.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// Pause between requests when running with concurrency 1.
    #[serde(default)]
    pub request_interval_ms: u64,
    /// Optional retry policy; if missing, built-in defaults are used.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry: Option<RetryConfig>,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            concurrency: 5,
            timeout_secs: 10,
            base_url: None,
            request_interval_ms: 0,
            retry: None,
        }
    }
}

impl MonitorConfig {
    pub fn engine_settings(&self) -> Result<EngineSettings, ConfigError> {
        let settings = EngineSettings {
            concurrency: self.concurrency,
            timeout: Duration::from_secs(self.timeout_secs),
            base_url: self.base_url.clone().filter(|b| !b.trim().is_empty()),
            request_interval: Duration::from_millis(self.request_interval_ms),
        };
        settings.validate()?;
        Ok(settings)
    }

    pub fn retry_policy(&self) -> Result<RetryPolicy, ConfigError> {
        self.retry.clone().unwrap_or_default().to_policy()
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("apimon")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<MonitorConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = MonitorConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }
    load_from_path(&path)
}

pub fn load_from_path(path: &Path) -> Result<MonitorConfig> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("reading config {}", path.display()))?;
    let cfg: MonitorConfig =
        toml::from_str(&data).with_context(|| format!("parsing config {}", path.display()))?;
    Ok(cfg)
}
