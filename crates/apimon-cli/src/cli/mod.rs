//! CLI for the apimon API health monitor.

mod commands;

use anyhow::Result;
use apimon_core::config::{self, MonitorConfig};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use commands::{run_config, run_monitor, run_suggest, run_validate, RunOptions};

/// Top-level CLI for apimon.
#[derive(Debug, Parser)]
#[command(name = "apimon")]
#[command(about = "apimon: concurrent HTTP API health monitor", long_about = None)]
pub struct Cli {
    /// Config file to use instead of ~/.config/apimon/config.toml.
    #[arg(long = "config", value_name = "FILE", global = true)]
    pub config_path: Option<PathBuf>,

    #[command(subcommand)]
    pub command: CliCommand,
}

/// Per-run overrides of config file values.
#[derive(Debug, Clone, Default, PartialEq, Eq, Args)]
pub struct Overrides {
    /// Number of interfaces probed at once.
    #[arg(long, value_name = "N")]
    pub concurrency: Option<usize>,
    /// Per-attempt timeout in seconds.
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,
    /// Base URL joined onto relative interface URLs.
    #[arg(long, value_name = "URL")]
    pub base_url: Option<String>,
    /// Pause between requests in milliseconds (used when concurrency is 1).
    #[arg(long, value_name = "MS")]
    pub interval_ms: Option<u64>,
    /// Maximum attempts per interface, including the first.
    #[arg(long, value_name = "N")]
    pub max_attempts: Option<u32>,
}

impl Overrides {
    pub fn apply(&self, cfg: &mut MonitorConfig) {
        if let Some(n) = self.concurrency {
            cfg.concurrency = n;
        }
        if let Some(secs) = self.timeout {
            cfg.timeout_secs = secs;
        }
        if let Some(url) = &self.base_url {
            cfg.base_url = Some(url.clone());
        }
        if let Some(ms) = self.interval_ms {
            cfg.request_interval_ms = ms;
        }
        if let Some(n) = self.max_attempts {
            cfg.retry.get_or_insert_with(Default::default).max_attempts = n;
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Probe every interface in a descriptor file and print the results.
    Run {
        /// JSON array of interface descriptors.
        #[arg(long, value_name = "FILE")]
        interfaces: PathBuf,
        /// JSON object mapping service name to bearer token.
        #[arg(long, value_name = "FILE")]
        tokens: Option<PathBuf>,
        #[command(flatten)]
        overrides: Overrides,
        /// Size the worker pool from the number of interfaces and CPUs.
        #[arg(long)]
        auto_tune: bool,
        /// Print the full report as JSON instead of a table.
        #[arg(long)]
        json: bool,
        /// Repeat the batch every N minutes until Ctrl-C.
        #[arg(long, value_name = "MINUTES")]
        every: Option<u64>,
    },

    /// Check that a descriptor file parses and every interface is probeable.
    Validate {
        /// JSON array of interface descriptors.
        #[arg(long, value_name = "FILE")]
        interfaces: PathBuf,
    },

    /// Show the config file path and the effective configuration.
    Config,

    /// Suggest a concurrency level for a batch of the given size.
    Suggest {
        /// Expected number of interfaces.
        #[arg(long, value_name = "N")]
        count: usize,
    },
}

impl CliCommand {
    pub async fn run_from_args() -> Result<()> {
        let cli = Cli::parse();
        let (cfg, cfg_path) = match &cli.config_path {
            Some(path) => (config::load_from_path(path)?, path.clone()),
            None => (config::load_or_init()?, config::config_path()?),
        };
        tracing::debug!("loaded config from {}: {:?}", cfg_path.display(), cfg);

        match cli.command {
            CliCommand::Run {
                interfaces,
                tokens,
                overrides,
                auto_tune,
                json,
                every,
            } => {
                let mut cfg = cfg;
                overrides.apply(&mut cfg);
                let opts = RunOptions {
                    interfaces,
                    tokens,
                    auto_tune,
                    json,
                    every,
                };
                run_monitor(&cfg, opts).await?;
            }
            CliCommand::Validate { interfaces } => run_validate(&interfaces)?,
            CliCommand::Config => run_config(&cfg, &cfg_path)?,
            CliCommand::Suggest { count } => run_suggest(count),
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests;
