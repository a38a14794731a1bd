use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError};

use hdrhistogram::Histogram;
use serde::Serialize;

/// Per-endpoint latency lists, shared between the dispatcher and concurrent workers.
#[derive(Debug, Clone, Default)]
pub struct LatencyRecorder {
    samples: Arc<Mutex<BTreeMap<String, Vec<f64>>>>,
}

impl LatencyRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, endpoint: &str, latency_seconds: f64) {
        let mut samples = self.samples.lock().unwrap_or_else(PoisonError::into_inner);
        samples
            .entry(endpoint.to_string())
            .or_default()
            .push(latency_seconds);
    }

    /// Copy of the latency lists recorded so far, keyed by endpoint.
    pub fn snapshot(&self) -> BTreeMap<String, Vec<f64>> {
        self.samples
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn total_samples(&self) -> usize {
        self.samples
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .map(Vec::len)
            .sum()
    }

    pub fn clear(&self) {
        self.samples
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

#[derive(Default)]
struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    fn add(&mut self, value: f64) {
        if self.count == 0 {
            self.min = value;
            self.max = value;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);
        }

        self.count += 1;
        let delta = value - self.mean;
        self.mean += delta / self.count as f64;
        let delta2 = value - self.mean;
        self.m2 += delta * delta2;
    }

    fn stddev(&self) -> f64 {
        if self.count < 2 {
            return 0.0;
        }
        (self.m2 / (self.count as f64 - 1.0)).sqrt()
    }
}

/// Summary statistics over one endpoint's latency list, in milliseconds.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LatencyStats {
    pub count: u64,
    pub min_ms: f64,
    pub avg_ms: f64,
    pub max_ms: f64,
    pub stddev_ms: f64,
    pub p50_ms: f64,
    pub p95_ms: f64,
    pub p99_ms: f64,
}

// Microsecond resolution, capped at ten minutes.
const HISTOGRAM_MAX_US: u64 = 600_000_000;

impl LatencyStats {
    pub fn from_seconds(samples: &[f64]) -> Self {
        if samples.is_empty() {
            return Self::default();
        }

        let mut stats = RunningStats::default();
        let mut histogram = Histogram::<u64>::new_with_bounds(1, HISTOGRAM_MAX_US, 3).ok();

        for seconds in samples {
            let latency_ms = seconds * 1000.0;
            stats.add(latency_ms);
            if let Some(histogram) = histogram.as_mut() {
                let latency_us = (latency_ms * 1000.0).round().max(1.0) as u64;
                let _ = histogram.record(latency_us.min(HISTOGRAM_MAX_US));
            }
        }

        let quantile = |q: f64| {
            histogram
                .as_ref()
                .map(|histogram| round_to_3(histogram.value_at_quantile(q) as f64 / 1000.0))
                .unwrap_or_default()
        };

        Self {
            count: stats.count,
            min_ms: round_to_3(stats.min),
            avg_ms: round_to_3(stats.mean),
            max_ms: round_to_3(stats.max),
            stddev_ms: round_to_3(stats.stddev()),
            p50_ms: quantile(0.50),
            p95_ms: quantile(0.95),
            p99_ms: quantile(0.99),
        }
    }
}

pub(crate) fn round_to_3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}
