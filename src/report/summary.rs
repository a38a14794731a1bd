use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::engine::metrics::{LatencyStats, round_to_3};
use crate::http::response::ErrorKind;
use crate::testing::{Category, TestResult};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryTally {
    pub passed: usize,
    pub total: usize,
}

impl CategoryTally {
    pub fn success_rate(&self) -> f64 {
        success_rate(self.passed, self.total)
    }
}

/// Pass/fail and latency statistics derived from a run's results.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunSummary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    /// Percentage of passed results, 0.0 for an empty run.
    pub success_rate: f64,
    pub per_category: BTreeMap<Category, CategoryTally>,
    /// Latencies in seconds, excluding cases that never completed a dispatch.
    pub per_endpoint_latency: BTreeMap<String, Vec<f64>>,
    pub endpoint_stats: BTreeMap<String, LatencyStats>,
    pub error_kinds: BTreeMap<ErrorKind, usize>,
    pub failed_tests: Vec<String>,
    pub duration_seconds: f64,
}

impl RunSummary {
    pub fn from_results(results: &[TestResult], duration: Duration) -> Self {
        let mut summary = RunSummary {
            total: results.len(),
            duration_seconds: round_to_3(duration.as_secs_f64()),
            ..Default::default()
        };

        for result in results {
            let tally = summary.per_category.entry(result.category).or_default();
            tally.total += 1;

            if result.success {
                summary.passed += 1;
                tally.passed += 1;
            } else {
                summary.failed += 1;
                summary.failed_tests.push(result.test_name.clone());
            }

            if let Some(kind) = result.error_kind {
                *summary.error_kinds.entry(kind).or_insert(0) += 1;
            }

            if !result.is_cancelled() {
                summary
                    .per_endpoint_latency
                    .entry(result.endpoint.clone())
                    .or_default()
                    .push(result.latency_seconds);
            }
        }

        summary.success_rate = success_rate(summary.passed, summary.total);
        summary.endpoint_stats = summary
            .per_endpoint_latency
            .iter()
            .map(|(endpoint, samples)| (endpoint.clone(), LatencyStats::from_seconds(samples)))
            .collect();

        summary
    }

    /// CI gate: true when no result failed (an empty run passes).
    pub fn all_passed(&self) -> bool {
        self.failed == 0
    }

    pub fn average_latency_seconds(&self, endpoint: &str) -> Option<f64> {
        let samples = self.per_endpoint_latency.get(endpoint)?;
        if samples.is_empty() {
            return None;
        }
        Some(samples.iter().sum::<f64>() / samples.len() as f64)
    }
}

fn success_rate(passed: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    round_to_3(passed as f64 / total as f64 * 100.0)
}
