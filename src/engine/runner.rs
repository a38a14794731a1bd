use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, warn};

use crate::environment::{VariableScope, Variables};
use crate::http::client::Dispatcher;
use crate::http::request::ResolvedRequest;
use crate::http::response::{ErrorKind, Outcome};
use crate::testing::capture;
use crate::testing::{Category, CategoryRules, TestCase, TestResult, classify, not_executed};

use super::cancel::{CancelHandle, cancel_requested};
use super::metrics::LatencyRecorder;

/// Results of one run in submission order, plus its wall-clock span.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub results: Vec<TestResult>,
    pub started_at: DateTime<Utc>,
    pub duration: Duration,
}

/// Owns everything a run mutates: dispatcher, latency metrics and variables.
#[derive(Debug)]
pub struct Harness {
    dispatcher: Dispatcher,
    rules: CategoryRules,
    variables: Variables,
    concurrency: usize,
    run_timeout: Option<Duration>,
}

#[derive(Debug)]
struct Job {
    index: usize,
    case: TestCase,
    request: ResolvedRequest,
    category: Category,
}

impl Harness {
    pub fn new(dispatcher: Dispatcher, variables: Variables) -> Self {
        Self {
            dispatcher,
            rules: CategoryRules::default(),
            variables,
            concurrency: 1,
            run_timeout: None,
        }
    }

    pub fn with_rules(mut self, rules: CategoryRules) -> Self {
        self.rules = rules;
        self
    }

    /// Number of concurrent workers; 1 runs cases sequentially.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn with_run_timeout(mut self, run_timeout: Option<Duration>) -> Self {
        self.run_timeout = run_timeout;
        self
    }

    pub fn metrics(&self) -> &LatencyRecorder {
        self.dispatcher.metrics()
    }

    pub fn variables(&self) -> &Variables {
        &self.variables
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Execute every case and return exactly one result per case.
    pub async fn run(&mut self, cases: &[TestCase], cancel: &CancelHandle) -> RunOutput {
        let started_at = Utc::now();
        let started = Instant::now();
        let mut cancel_rx = cancel.subscribe();
        let deadline = self.run_timeout.map(|timeout| cancel.cancel_after(timeout));

        info!(
            cases = cases.len(),
            concurrency = self.concurrency,
            base_url = self.dispatcher.base_url(),
            "starting run"
        );

        let results = if self.concurrency > 1 {
            self.run_concurrent(cases, cancel, &mut cancel_rx).await
        } else {
            self.run_sequential(cases, cancel, &mut cancel_rx).await
        };

        if let Some(deadline) = deadline {
            deadline.abort();
        }

        let passed = results.iter().filter(|result| result.success).count();
        info!(
            total = results.len(),
            passed,
            failed = results.len() - passed,
            "run finished"
        );

        RunOutput {
            results,
            started_at,
            duration: started.elapsed(),
        }
    }

    async fn run_sequential(
        &mut self,
        cases: &[TestCase],
        cancel: &CancelHandle,
        cancel_rx: &mut broadcast::Receiver<()>,
    ) -> Vec<TestResult> {
        let mut results = Vec::with_capacity(cases.len());
        let mut cancelled = false;

        for case in cases {
            let category = self.rules.categorize(case);
            if !cancelled && (cancel.is_cancelled() || cancel_requested(cancel_rx)) {
                cancelled = true;
            }
            if cancelled {
                results.push(not_executed(
                    case,
                    category,
                    ErrorKind::Cancelled,
                    "run cancelled before this case started",
                ));
                continue;
            }

            let request = case.resolve(&self.variables);
            warn_unresolved(case, &request);

            let outcome = self.dispatcher.dispatch(&request, cancel_rx).await;
            if matches!(
                outcome,
                Outcome::NoResponse {
                    kind: ErrorKind::Cancelled,
                    ..
                }
            ) {
                cancelled = true;
            }

            let result = classify(case, category, &outcome);
            log_result(&result);
            if result.success {
                self.apply_captures(case, &outcome);
            }
            results.push(result);
        }

        results
    }

    async fn run_concurrent(
        &mut self,
        cases: &[TestCase],
        cancel: &CancelHandle,
        cancel_rx: &mut broadcast::Receiver<()>,
    ) -> Vec<TestResult> {
        if cases.iter().any(|case| !case.capture.is_empty()) {
            warn!("captures are ignored when running with concurrency > 1");
        }

        let jobs: Arc<Vec<Job>> = Arc::new(
            cases
                .iter()
                .enumerate()
                .map(|(index, case)| {
                    let request = case.resolve(&self.variables);
                    warn_unresolved(case, &request);
                    Job {
                        index,
                        case: case.clone(),
                        request,
                        category: self.rules.categorize(case),
                    }
                })
                .collect(),
        );

        let worker_count = self.concurrency.min(jobs.len()).max(1);
        let next_job = Arc::new(AtomicUsize::new(0));
        let cancelled = Arc::new(AtomicBool::new(false));
        let (result_tx, mut result_rx) = mpsc::unbounded_channel::<(usize, TestResult)>();

        let mut handles = Vec::with_capacity(worker_count);
        for _ in 0..worker_count {
            let jobs = jobs.clone();
            let dispatcher = self.dispatcher.clone();
            let next_job = next_job.clone();
            let cancelled = cancelled.clone();
            let result_tx = result_tx.clone();
            let cancel = cancel.clone();
            let mut worker_cancel_rx = cancel_rx.resubscribe();

            handles.push(tokio::spawn(async move {
                loop {
                    let idx = next_job.fetch_add(1, Ordering::Relaxed);
                    let Some(job) = jobs.get(idx) else {
                        break;
                    };

                    if cancelled.load(Ordering::Relaxed)
                        || cancel.is_cancelled()
                        || cancel_requested(&mut worker_cancel_rx)
                    {
                        cancelled.store(true, Ordering::Relaxed);
                        let result = not_executed(
                            &job.case,
                            job.category,
                            ErrorKind::Cancelled,
                            "run cancelled before this case started",
                        );
                        let _ = result_tx.send((job.index, result));
                        continue;
                    }

                    let outcome = dispatcher.dispatch(&job.request, &mut worker_cancel_rx).await;
                    if matches!(
                        outcome,
                        Outcome::NoResponse {
                            kind: ErrorKind::Cancelled,
                            ..
                        }
                    ) {
                        cancelled.store(true, Ordering::Relaxed);
                    }

                    let result = classify(&job.case, job.category, &outcome);
                    log_result(&result);
                    let _ = result_tx.send((job.index, result));
                }
            }));
        }
        drop(result_tx);

        for handle in handles {
            if let Err(err) = handle.await {
                warn!(error = %err, "worker terminated abnormally");
            }
        }

        let mut slots: Vec<Option<TestResult>> = vec![None; jobs.len()];
        while let Some((index, result)) = result_rx.recv().await {
            slots[index] = Some(result);
        }

        slots
            .into_iter()
            .zip(jobs.iter())
            .map(|(slot, job)| {
                slot.unwrap_or_else(|| {
                    not_executed(
                        &job.case,
                        job.category,
                        ErrorKind::TransportError,
                        "worker terminated before recording a result",
                    )
                })
            })
            .collect()
    }

    fn apply_captures(&mut self, case: &TestCase, outcome: &Outcome) {
        if case.capture.is_empty() {
            return;
        }
        let Outcome::Response(response) = outcome else {
            return;
        };
        let Some(body) = response.body.as_json() else {
            warn!(test = %case.name, "cannot capture variables from a non-JSON body");
            return;
        };

        for (variable, path) in &case.capture {
            match capture::extract(body, path) {
                Some(value) => {
                    debug!(test = %case.name, %variable, %value, "captured variable");
                    self.variables
                        .set(VariableScope::Captured, variable.clone(), value);
                }
                None => warn!(test = %case.name, %variable, %path, "capture path not found"),
            }
        }
    }
}

fn warn_unresolved(case: &TestCase, request: &ResolvedRequest) {
    let unresolved = crate::environment::unresolved_placeholders(&request.path);
    if !unresolved.is_empty() {
        warn!(
            test = %case.name,
            variables = ?unresolved,
            "path still contains unresolved placeholders"
        );
    }
}

fn log_result(result: &TestResult) {
    if result.success {
        debug!(test = %result.test_name, status = ?result.status_code, "passed");
    } else {
        info!(
            test = %result.test_name,
            status = ?result.status_code,
            detail = %result.detail_message,
            "failed"
        );
    }
}
