//! `apimon config` – where the config lives and what is in effect.

use anyhow::Result;
use apimon_core::config::MonitorConfig;
use std::path::Path;

pub fn run_config(cfg: &MonitorConfig, path: &Path) -> Result<()> {
    // Surface invalid values here rather than on the next run.
    cfg.engine_settings()?;
    cfg.retry_policy()?;

    println!("# {}", path.display());
    print!("{}", toml::to_string_pretty(cfg)?);
    if cfg.retry.is_none() {
        println!("# [retry] not set: 3 attempts, backoff 1s, 2s, 4s");
    }
    Ok(())
}
