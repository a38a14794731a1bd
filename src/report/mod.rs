//! # Reporting
//!
//! Aggregates test results into a [`RunSummary`] and renders it as text or
//! JSON. The same [`RunReport`] is what the results-file sink persists.

pub mod render;
pub mod summary;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::engine::RunOutput;
use crate::testing::TestResult;

pub use render::{render_json, render_text};
pub use summary::{CategoryTally, RunSummary};

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suite: Option<String>,
    pub base_url: String,
    pub started_at: DateTime<Utc>,
    pub summary: RunSummary,
    pub results: Vec<TestResult>,
}

impl RunReport {
    pub fn new(
        suite: Option<String>,
        base_url: impl Into<String>,
        started_at: DateTime<Utc>,
        summary: RunSummary,
        results: Vec<TestResult>,
    ) -> Self {
        Self {
            suite,
            base_url: base_url.into(),
            started_at,
            summary,
            results,
        }
    }

    pub fn from_output(suite: Option<String>, base_url: impl Into<String>, output: RunOutput) -> Self {
        let summary = RunSummary::from_results(&output.results, output.duration);
        Self::new(suite, base_url, output.started_at, summary, output.results)
    }
}
