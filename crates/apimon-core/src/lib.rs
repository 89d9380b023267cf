//! Concurrent HTTP API health probing.
//!
//! Interfaces are probed through a retry policy on a bounded worker pool; every
//! probe ends as a classified [`MonitorResult`], and a batch always yields one
//! result per interface, in input order, plus aggregate statistics.

pub mod config;
pub mod control;
pub mod engine;
pub mod error;
pub mod executor;
pub mod interface;
pub mod logging;
pub mod request;
pub mod result;
pub mod retry;

pub use crate::control::CancelToken;
pub use crate::engine::{BatchReport, BatchStatistics, EngineSettings, MonitorEngine};
pub use crate::error::{ConfigError, DescriptorError};
pub use crate::interface::{HttpMethod, InterfaceDescriptor, InterfaceRef, TokenMap};
pub use crate::result::{MonitorResult, Status};
pub use crate::retry::{ErrorKind, RetryPolicy};
