//! `apimon run` – probe a batch of interfaces, once or on a fixed period.

use anyhow::{Context, Result};
use apimon_core::config::MonitorConfig;
use apimon_core::control::CancelToken;
use apimon_core::engine::{optimize_for_load, BatchReport, MonitorEngine};
use apimon_core::interface::{load_interfaces, load_token_map, InterfaceDescriptor, TokenMap};
use std::fmt::Write as _;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct RunOptions {
    pub interfaces: PathBuf,
    pub tokens: Option<PathBuf>,
    pub auto_tune: bool,
    pub json: bool,
    /// Repeat period in minutes.
    pub every: Option<u64>,
}

pub async fn run_monitor(cfg: &MonitorConfig, opts: RunOptions) -> Result<()> {
    let interfaces: Arc<[InterfaceDescriptor]> = load_interfaces(&opts.interfaces)?.into();
    let tokens = Arc::new(match &opts.tokens {
        Some(path) => load_token_map(path)?,
        None => TokenMap::new(),
    });

    let mut settings = cfg.engine_settings()?;
    if opts.auto_tune {
        settings.concurrency = optimize_for_load(interfaces.len());
        tracing::info!(concurrency = settings.concurrency, "auto-tuned concurrency");
    }
    let engine = Arc::new(MonitorEngine::new(settings, cfg.retry_policy()?)?);

    let Some(minutes) = opts.every else {
        let report = run_batch(&engine, &interfaces, &tokens, CancelToken::new()).await?;
        return print_report(&report, opts.json);
    };

    let period = Duration::from_secs(minutes.max(1).saturating_mul(60));
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);
    tracing::info!(minutes, "repeating batch until interrupted");

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                tracing::info!("interrupted, stopping");
                break;
            }
            _ = ticker.tick() => {}
        }

        let cancel = CancelToken::new();
        let batch = run_batch(&engine, &interfaces, &tokens, cancel.clone());
        tokio::pin!(batch);
        tokio::select! {
            report = &mut batch => print_report(&report?, opts.json)?,
            _ = &mut shutdown => {
                tracing::info!("interrupted during a batch, cancelling in-flight probes");
                cancel.cancel();
                // Wait for the blocking task so the runtime can shut down promptly.
                if let Err(err) = batch.await {
                    tracing::warn!("cancelled batch failed: {:#}", err);
                }
                break;
            }
        }
    }
    Ok(())
}

/// The engine blocks on worker threads; keep it off the async runtime.
async fn run_batch(
    engine: &Arc<MonitorEngine>,
    interfaces: &Arc<[InterfaceDescriptor]>,
    tokens: &Arc<TokenMap>,
    cancel: CancelToken,
) -> Result<BatchReport> {
    let engine = Arc::clone(engine);
    let interfaces = Arc::clone(interfaces);
    let tokens = Arc::clone(tokens);
    tokio::task::spawn_blocking(move || engine.execute_with_cancel(&interfaces, &tokens, &cancel))
        .await
        .context("monitor batch task failed")
}

fn print_report(report: &BatchReport, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
    } else {
        print!("{}", render_table(report));
    }
    Ok(())
}

pub(crate) fn render_table(report: &BatchReport) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<4} {:<24} {:<8} {:<5} {:>10} {:>5}  {}",
        "#", "INTERFACE", "STATUS", "CODE", "TIME(ms)", "RETRY", "ERROR"
    );
    for r in &report.results {
        let code = r
            .status_code
            .map(|c| c.to_string())
            .unwrap_or_else(|| "-".to_string());
        let error = if r.is_success() {
            String::new()
        } else {
            r.error_summary()
        };
        let _ = writeln!(
            out,
            "{:<4} {:<24} {:<8} {:<5} {:>10.2} {:>5}  {}",
            r.interface.index,
            r.interface.name,
            if r.is_success() { "SUCCESS" } else { "FAILED" },
            code,
            r.response_time_ms,
            r.retry_count,
            error
        );
    }

    let s = &report.statistics;
    let _ = writeln!(
        out,
        "\n{} total, {} succeeded, {} failed ({:.2}% success) in {:.0}ms",
        s.total, s.success, s.failed, s.success_rate, report.elapsed_ms
    );
    let _ = writeln!(
        out,
        "response time: avg {:.2}ms, min {:.2}ms, max {:.2}ms, p95 {:.2}ms",
        s.avg_response_time_ms, s.min_response_time_ms, s.max_response_time_ms, s.p95_response_time_ms
    );
    for (kind, count) in &s.error_kinds {
        let _ = writeln!(out, "  {:<18} {}", kind.as_str(), count);
    }
    out
}
