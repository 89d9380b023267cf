//! Concurrency sizing heuristic for large batches.

use std::num::NonZeroUsize;
use std::thread;

/// Upper bound on any suggested worker count.
pub const MAX_SUGGESTED_CONCURRENCY: usize = 50;

/// Fallback when the CPU count cannot be determined.
const DEFAULT_CPU_COUNT: usize = 4;

/// One worker per ten interfaces, at least 1, at most `min(cpu_count * 2, 50)`.
pub fn suggest_concurrency(expected_interfaces: usize, cpu_count: usize) -> usize {
    let cap = cpu_count
        .max(1)
        .saturating_mul(2)
        .min(MAX_SUGGESTED_CONCURRENCY);
    (expected_interfaces / 10).clamp(1, cap)
}

/// [`suggest_concurrency`] with this machine's available parallelism.
pub fn optimize_for_load(expected_interfaces: usize) -> usize {
    let cpus = thread::available_parallelism()
        .map(NonZeroUsize::get)
        .unwrap_or(DEFAULT_CPU_COUNT);
    let suggested = suggest_concurrency(expected_interfaces, cpus);
    tracing::debug!(expected_interfaces, cpus, suggested, "suggested concurrency");
    suggested
}
