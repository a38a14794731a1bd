//! Smoke-test harness for HTTP/JSON REST APIs.
//!
//! A run dispatches each declared [`TestCase`] against a base URL, records
//! per-endpoint latency, classifies every outcome against the case's
//! acceptable status set and aggregates the results into a [`RunSummary`].
//! Request failures never abort a run: timeouts and connection errors become
//! failed [`TestResult`]s so a partially broken target can still be probed
//! end to end.

pub mod auth;
pub mod cli;
pub mod config;
pub mod engine;
pub mod environment;
pub mod error;
pub mod http;
pub mod report;
pub mod storage;
pub mod suite;
pub mod testing;

use std::collections::HashMap;

pub use config::Config;
pub use engine::{CancelHandle, Harness, RunOutput};
pub use environment::Variables;
pub use error::{HarnessError, Result};
pub use http::{Dispatcher, ErrorKind, HttpMethod};
pub use report::{RunReport, RunSummary};
pub use suite::Suite;
pub use testing::{Category, CategoryRules, ExpectedStatus, TestCase, TestResult};

/// Build a harness from resolved configuration and run a whole suite.
pub async fn run_suite(
    config: &Config,
    suite: &Suite,
    overrides: HashMap<String, String>,
    cancel: &CancelHandle,
) -> Result<RunReport> {
    let base_url = config.resolve_base_url(suite.base_url.as_deref());
    let dispatcher = Dispatcher::new(
        &base_url,
        config.timeout(),
        config.target.auth.clone(),
        engine::LatencyRecorder::new(),
    )?;
    let variables = Variables::new(suite.variables.clone(), overrides);

    let mut harness = Harness::new(dispatcher, variables)
        .with_concurrency(config.run.concurrency)
        .with_run_timeout(config.run_timeout());

    let output = harness.run(&suite.cases, cancel).await;
    let report = RunReport::from_output(suite.name.clone(), harness.dispatcher().base_url(), output);

    if let Some(path) = &config.run.results_file {
        storage::save_report(path, &report)?;
    }

    Ok(report)
}
