use std::fmt::Write;

use crate::testing::TestResult;

use super::RunReport;

/// Human-readable report. The layout is for people, not parsers.
pub fn render_text(report: &RunReport) -> String {
    let mut out = String::new();
    let summary = &report.summary;

    let title = report.suite.as_deref().unwrap_or("API smoke test");
    let _ = writeln!(out, "{title} against {}", report.base_url);
    let _ = writeln!(out, "started {}", report.started_at.to_rfc3339());
    let _ = writeln!(out);

    for result in &report.results {
        let _ = writeln!(out, "{}", result_line(result));
    }

    if !summary.per_category.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "By category:");
        for (category, tally) in &summary.per_category {
            let _ = writeln!(
                out,
                "  {:<14} {:>3}/{:<3} ({:.1}%)",
                category.label(),
                tally.passed,
                tally.total,
                tally.success_rate()
            );
        }
    }

    if !summary.endpoint_stats.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "Latency by endpoint (ms):");
        let width = summary
            .endpoint_stats
            .keys()
            .map(String::len)
            .max()
            .unwrap_or(0);
        for (endpoint, stats) in &summary.endpoint_stats {
            let _ = writeln!(
                out,
                "  {endpoint:<width$}  n={:<3} avg={:>9.1} p95={:>9.1} max={:>9.1}",
                stats.count, stats.avg_ms, stats.p95_ms, stats.max_ms
            );
        }
    }

    if !summary.error_kinds.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "Failures by kind:");
        for (kind, count) in &summary.error_kinds {
            let _ = writeln!(out, "  {kind:<20} {count}");
        }
    }

    let _ = writeln!(out);
    let _ = writeln!(
        out,
        "Total: {}  Passed: {}  Failed: {}  Success rate: {:.1}%  Duration: {:.2}s",
        summary.total,
        summary.passed,
        summary.failed,
        summary.success_rate,
        summary.duration_seconds
    );

    out
}

pub fn render_json(report: &RunReport) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(report)
}

fn result_line(result: &TestResult) -> String {
    let verdict = if result.success { "PASS" } else { "FAIL" };
    let status = result
        .status_code
        .map(|code| code.to_string())
        .unwrap_or_else(|| "---".to_string());
    format!(
        "[{verdict}] {} ({} {}) {status} {:.1}ms - {}",
        result.test_name,
        result.method,
        result.endpoint.split_once(' ').map_or(result.endpoint.as_str(), |(_, path)| path),
        result.latency_seconds * 1000.0,
        result.detail_message
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::method::HttpMethod;
    use crate::http::response::ErrorKind;
    use crate::report::RunSummary;
    use crate::testing::Category;
    use chrono::Utc;
    use std::time::Duration;

    fn report() -> RunReport {
        let results = vec![
            TestResult {
                test_name: "Get Friends".to_string(),
                method: HttpMethod::Get,
                endpoint: "GET /friendships".to_string(),
                category: Category::Friendships,
                success: true,
                status_code: Some(404),
                latency_seconds: 0.012,
                detail_message: "status 404 (expected one of [200, 400, 404])".to_string(),
                error_kind: None,
                timestamp: Utc::now(),
            },
            TestResult {
                test_name: "Send Message".to_string(),
                method: HttpMethod::Post,
                endpoint: "POST /messages".to_string(),
                category: Category::Messaging,
                success: false,
                status_code: None,
                latency_seconds: 30.0,
                detail_message: "TIMEOUT: operation timed out (expected 201)".to_string(),
                error_kind: Some(ErrorKind::Timeout),
                timestamp: Utc::now(),
            },
        ];
        RunReport::new(
            Some("social".to_string()),
            "http://localhost:3000",
            Utc::now(),
            RunSummary::from_results(&results, Duration::from_secs(31)),
            results,
        )
    }

    #[test]
    fn text_report_lists_results_and_totals() {
        let text = render_text(&report());
        assert!(text.starts_with("social against http://localhost:3000"));
        assert!(text.contains("[PASS] Get Friends (GET /friendships) 404"));
        assert!(text.contains("[FAIL] Send Message (POST /messages) ---"));
        assert!(text.contains("Friendships"));
        assert!(text.contains("TIMEOUT"));
        assert!(text.contains("Total: 2  Passed: 1  Failed: 1  Success rate: 50.0%"));
    }

    #[test]
    fn json_report_is_machine_readable() {
        let raw = render_json(&report()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["summary"]["total"], 2);
        assert_eq!(value["summary"]["per_category"]["FRIENDSHIPS"]["passed"], 1);
        assert_eq!(value["summary"]["error_kinds"]["TIMEOUT"], 1);
        assert_eq!(value["results"][1]["error_kind"], "TIMEOUT");
        assert_eq!(value["results"][0]["status_code"], 404);
    }
}
