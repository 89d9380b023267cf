//! `apimon validate` – ingestion checks only, nothing is sent.

use anyhow::Result;
use apimon_core::interface::load_interfaces;
use std::path::Path;

pub fn run_validate(path: &Path) -> Result<()> {
    let interfaces = load_interfaces(path)?;
    println!("{} interface(s) OK in {}", interfaces.len(), path.display());
    for (i, iface) in interfaces.iter().enumerate() {
        let service = if iface.service.is_empty() {
            "-"
        } else {
            iface.service.as_str()
        };
        println!(
            "{:>4}  {:<8} {:<24} {:<12} {}",
            i,
            iface.method.as_str(),
            iface.name,
            service,
            iface.url
        );
    }
    Ok(())
}
