//! CLI command handlers, one file per command.

mod config;
mod run;
mod suggest;
mod validate;

pub use config::run_config;
pub use run::{run_monitor, RunOptions};
pub use suggest::run_suggest;
pub use validate::run_validate;
