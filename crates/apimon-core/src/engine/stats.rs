//! Aggregate statistics over a finished batch.
//!
//! Computed once from the collected result list; workers never touch it.

use serde::Serialize;
use std::collections::BTreeMap;

use crate::result::MonitorResult;
use crate::retry::ErrorKind;

/// Batch-level summary handed to the analyzer alongside the results.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BatchStatistics {
    pub total: usize,
    pub success: usize,
    pub failed: usize,
    /// Percentage in `0.0..=100.0`; 0 for an empty batch.
    pub success_rate: f64,
    /// Mean over results with a positive response time.
    pub avg_response_time_ms: f64,
    pub min_response_time_ms: f64,
    pub max_response_time_ms: f64,
    pub p95_response_time_ms: f64,
    pub error_kinds: BTreeMap<ErrorKind, usize>,
}

impl BatchStatistics {
    pub fn from_results(results: &[MonitorResult]) -> Self {
        let total = results.len();
        if total == 0 {
            return Self::default();
        }
        let success = results.iter().filter(|r| r.is_success()).count();

        let mut times: Vec<f64> = results
            .iter()
            .map(|r| r.response_time_ms)
            .filter(|t| *t > 0.0)
            .collect();
        times.sort_by(f64::total_cmp);

        let mut error_kinds = BTreeMap::new();
        for kind in results.iter().filter_map(|r| r.error_kind) {
            *error_kinds.entry(kind).or_insert(0) += 1;
        }

        let avg = if times.is_empty() {
            0.0
        } else {
            times.iter().sum::<f64>() / times.len() as f64
        };

        Self {
            total,
            success,
            failed: total - success,
            success_rate: success as f64 / total as f64 * 100.0,
            avg_response_time_ms: avg,
            min_response_time_ms: times.first().copied().unwrap_or(0.0),
            max_response_time_ms: times.last().copied().unwrap_or(0.0),
            p95_response_time_ms: percentile(&times, 0.95),
            error_kinds,
        }
    }
}

/// Value at index `floor(n * q)` of an ascending sample, clamped to the last element.
/// Returns 0 for an empty sample.
pub fn percentile(sorted: &[f64], q: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let idx = ((sorted.len() as f64) * q).floor() as usize;
    sorted[idx.min(sorted.len() - 1)]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interface::{HttpMethod, InterfaceDescriptor};
    use crate::result::Status;
    use std::time::Duration;

    fn result(ms: f64, kind: Option<ErrorKind>) -> MonitorResult {
        let iface = InterfaceDescriptor::new("x", HttpMethod::Get, "/x").reference(0);
        let mut r = MonitorResult::unknown_error(iface, "x", Duration::ZERO, None);
        r.response_time_ms = ms;
        r.error_kind = kind;
        if kind.is_none() {
            r.status = Status::Success;
            r.status_code = Some(200);
            r.error_message = None;
        }
        r
    }

    #[test]
    fn p95_of_hundred_values() {
        let sample: Vec<f64> = (1..=100).map(|i| i as f64 / 10.0).collect();
        assert!((percentile(&sample, 0.95) - 9.6).abs() < 1e-9);
    }

    #[test]
    fn percentile_edges() {
        assert_eq!(percentile(&[], 0.95), 0.0);
        assert_eq!(percentile(&[4.0], 0.95), 4.0);
        assert_eq!(percentile(&[1.0, 2.0], 1.0), 2.0);
    }

    #[test]
    fn empty_batch_is_all_zero() {
        assert_eq!(BatchStatistics::from_results(&[]), BatchStatistics::default());
    }

    #[test]
    fn aggregates_counts_rates_and_histogram() {
        let results = vec![
            result(10.0, None),
            result(30.0, Some(ErrorKind::Http500)),
            result(0.0, Some(ErrorKind::Timeout)),
            result(20.0, Some(ErrorKind::Timeout)),
        ];
        let s = BatchStatistics::from_results(&results);
        assert_eq!(s.total, 4);
        assert_eq!(s.success, 1);
        assert_eq!(s.failed, 3);
        assert!((s.success_rate - 25.0).abs() < 1e-9);
        // zero response times are excluded from timing stats
        assert!((s.avg_response_time_ms - 20.0).abs() < 1e-9);
        assert_eq!(s.min_response_time_ms, 10.0);
        assert_eq!(s.max_response_time_ms, 30.0);
        assert_eq!(s.p95_response_time_ms, 30.0);
        assert_eq!(s.error_kinds[&ErrorKind::Timeout], 2);
        assert_eq!(s.error_kinds[&ErrorKind::Http500], 1);
        assert!(!s.error_kinds.contains_key(&ErrorKind::Http404));
    }

    #[test]
    fn histogram_serializes_with_wire_names() {
        let s = BatchStatistics::from_results(&[result(1.0, Some(ErrorKind::DnsError))]);
        let v = serde_json::to_value(&s).unwrap();
        assert_eq!(v["error_kinds"]["DNS_ERROR"], 1);
    }
}
