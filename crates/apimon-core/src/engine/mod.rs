//! Batch scheduler.
//!
//! [`MonitorEngine`] probes a list of interfaces, either serially with a fixed
//! pause between requests or on a bounded worker pool, and returns one result
//! per interface in input order together with aggregate statistics.

mod pool;
mod sizing;
mod stats;

pub use self::sizing::{optimize_for_load, suggest_concurrency, MAX_SUGGESTED_CONCURRENCY};
pub use self::stats::{percentile, BatchStatistics};

use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::control::CancelToken;
use crate::error::ConfigError;
use crate::executor::{CurlTransport, RetryingExecutor, SingleAttemptExecutor, Transport};
use crate::interface::{InterfaceDescriptor, TokenMap};
use crate::request::RequestBuilder;
use crate::result::MonitorResult;
use crate::retry::{RetryPolicy, Sleeper, ThreadSleeper};

use self::pool::{cancelled_result, run_guarded, run_parallel, SharedBatch};

/// Scheduler knobs, validated before any interface is touched.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineSettings {
    pub concurrency: usize,
    /// Per-attempt timeout.
    pub timeout: Duration,
    pub base_url: Option<String>,
    /// Pause between interfaces; only honoured when `concurrency == 1`.
    pub request_interval: Duration,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            concurrency: 5,
            timeout: Duration::from_secs(10),
            base_url: None,
            request_interval: Duration::ZERO,
        }
    }
}

impl EngineSettings {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.concurrency == 0 {
            return Err(ConfigError::Concurrency(self.concurrency));
        }
        if self.timeout.is_zero() {
            return Err(ConfigError::Timeout);
        }
        Ok(())
    }

    fn is_serial(&self) -> bool {
        self.concurrency == 1 && !self.request_interval.is_zero()
    }
}

/// Everything a batch produces.
#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    /// Same length and order as the input interfaces.
    pub results: Vec<MonitorResult>,
    pub statistics: BatchStatistics,
    pub elapsed_ms: f64,
}

impl BatchReport {
    fn empty() -> Self {
        Self {
            results: Vec::new(),
            statistics: BatchStatistics::default(),
            elapsed_ms: 0.0,
        }
    }
}

pub struct MonitorEngine {
    settings: EngineSettings,
    policy: RetryPolicy,
    transport: Arc<dyn Transport>,
    sleeper: Arc<dyn Sleeper>,
}

impl MonitorEngine {
    /// Engine over the curl transport. Fails fast on invalid settings.
    pub fn new(settings: EngineSettings, policy: RetryPolicy) -> Result<Self, ConfigError> {
        Self::with_transport(settings, policy, Arc::new(CurlTransport::default()))
    }

    pub fn with_transport(
        settings: EngineSettings,
        policy: RetryPolicy,
        transport: Arc<dyn Transport>,
    ) -> Result<Self, ConfigError> {
        settings.validate()?;
        Ok(Self {
            settings,
            policy,
            transport,
            sleeper: Arc::new(ThreadSleeper),
        })
    }

    /// Replace the sleeper used for backoff and serial pacing.
    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn set_concurrency(&mut self, concurrency: usize) -> Result<(), ConfigError> {
        if concurrency == 0 {
            return Err(ConfigError::Concurrency(concurrency));
        }
        self.settings.concurrency = concurrency;
        Ok(())
    }

    pub fn set_timeout(&mut self, timeout: Duration) -> Result<(), ConfigError> {
        if timeout.is_zero() {
            return Err(ConfigError::Timeout);
        }
        self.settings.timeout = timeout;
        Ok(())
    }

    /// Suggested worker count for a batch of `expected_interfaces` on this machine.
    pub fn optimize_for_load(&self, expected_interfaces: usize) -> usize {
        optimize_for_load(expected_interfaces)
    }

    /// How long the collector waits for any one slot before giving up on it.
    ///
    /// Twice the worst case of a fully retried probe: every attempt timing out
    /// plus every backoff sleep. This is wider than a flat `2 × timeout`, which
    /// would abandon slots that are still inside their retry budget. Saturates at
    /// `Duration::MAX`, in which case the collector waits without a deadline.
    pub fn collect_bound(&self) -> Duration {
        let worst = self
            .settings
            .timeout
            .saturating_mul(self.policy.max_attempts())
            .saturating_add(self.policy.total_backoff());
        worst.saturating_mul(2)
    }

    fn executor(&self) -> RetryingExecutor {
        let single = SingleAttemptExecutor::new(
            RequestBuilder::new(self.settings.base_url.clone()),
            Arc::clone(&self.transport),
            self.settings.timeout,
        );
        RetryingExecutor::new(single, self.policy.clone()).with_sleeper(Arc::clone(&self.sleeper))
    }

    /// Probe one interface through the retrying path.
    pub fn execute_single(&self, interface: &InterfaceDescriptor, token: Option<&str>) -> MonitorResult {
        let token = token.filter(|t| !t.is_empty());
        run_guarded(&self.executor(), interface, 0, token, &CancelToken::new())
    }

    /// Probe every interface. Never fails: per-interface problems are in the results.
    pub fn execute(&self, interfaces: &[InterfaceDescriptor], tokens: &TokenMap) -> BatchReport {
        self.execute_with_cancel(interfaces, tokens, &CancelToken::new())
    }

    /// [`execute`](Self::execute) that stops early once `cancel` fires.
    ///
    /// In-flight probes are aborted and unstarted interfaces are reported as
    /// `UnknownError`, so the report still has one result per interface.
    pub fn execute_with_cancel(
        &self,
        interfaces: &[InterfaceDescriptor],
        tokens: &TokenMap,
        cancel: &CancelToken,
    ) -> BatchReport {
        if interfaces.is_empty() {
            return BatchReport::empty();
        }
        let start = Instant::now();
        let serial = self.settings.is_serial();
        tracing::info!(
            total = interfaces.len(),
            concurrency = self.settings.concurrency,
            serial,
            "starting batch"
        );

        let resolved: Vec<Option<String>> = interfaces
            .iter()
            .map(|i| tokens.get(&i.service).filter(|t| !t.is_empty()).cloned())
            .collect();

        let results = if serial {
            self.run_serial(interfaces, &resolved, cancel)
        } else {
            let batch = SharedBatch {
                interfaces: interfaces.into(),
                tokens: resolved.into(),
            };
            run_parallel(
                Arc::new(self.executor()),
                batch,
                self.settings.concurrency,
                self.collect_bound(),
                cancel,
            )
        };

        let statistics = BatchStatistics::from_results(&results);
        let elapsed_ms = crate::result::duration_ms(start.elapsed());
        tracing::info!(
            total = statistics.total,
            success = statistics.success,
            failed = statistics.failed,
            elapsed_ms,
            "batch finished"
        );
        BatchReport {
            results,
            statistics,
            elapsed_ms,
        }
    }

    fn run_serial(
        &self,
        interfaces: &[InterfaceDescriptor],
        tokens: &[Option<String>],
        cancel: &CancelToken,
    ) -> Vec<MonitorResult> {
        let executor = self.executor();
        let mut results = Vec::with_capacity(interfaces.len());
        for (index, interface) in interfaces.iter().enumerate() {
            if index > 0 && !cancel.is_cancelled() {
                self.sleeper.sleep(self.settings.request_interval, cancel);
            }
            if cancel.is_cancelled() {
                results.push(cancelled_result(interface, index));
                continue;
            }
            results.push(run_guarded(
                &executor,
                interface,
                index,
                tokens[index].as_deref(),
                cancel,
            ));
        }
        results
    }
}
