use chrono::Utc;
use serde_json::Value;

use crate::http::response::{ErrorKind, Outcome, ResponseBody};

use super::case::TestCase;
use super::category::Category;
use super::result::TestResult;

const MAX_ERROR_SNIPPET_CHARS: usize = 120;

/// Turn a dispatch outcome into the case's single [`TestResult`].
pub fn classify(case: &TestCase, category: Category, outcome: &Outcome) -> TestResult {
    let latency_seconds = outcome.elapsed().as_secs_f64();

    let (success, error_kind, detail_message) = match outcome {
        Outcome::Response(response) => {
            let status_ok = case.expected_status.accepts(response.status);
            let json_ok = !case.expect_json || matches!(response.body, ResponseBody::Json(_));

            let mut detail = format!(
                "status {} (expected {})",
                response.status, case.expected_status
            );
            describe_body(&response.body, &mut detail);

            let error_kind = if !status_ok {
                Some(ErrorKind::UnexpectedStatus)
            } else if !json_ok {
                detail.push_str("; JSON body required");
                Some(ErrorKind::MalformedResponse)
            } else {
                None
            };

            (status_ok && json_ok, error_kind, detail)
        }
        Outcome::NoResponse { kind, message, .. } => (
            false,
            Some(*kind),
            format!(
                "{kind}: {message} (expected {})",
                case.expected_status
            ),
        ),
    };

    TestResult {
        test_name: case.name.clone(),
        method: case.method,
        endpoint: case.endpoint(),
        category,
        success,
        status_code: outcome.status(),
        latency_seconds,
        detail_message,
        error_kind,
        timestamp: Utc::now(),
    }
}

/// Result for a case that never reached the wire because the run was cancelled
/// or its worker died.
pub fn not_executed(
    case: &TestCase,
    category: Category,
    kind: ErrorKind,
    reason: &str,
) -> TestResult {
    TestResult {
        test_name: case.name.clone(),
        method: case.method,
        endpoint: case.endpoint(),
        category,
        success: false,
        status_code: None,
        latency_seconds: 0.0,
        detail_message: format!("{kind}: {reason}"),
        error_kind: Some(kind),
        timestamp: Utc::now(),
    }
}

fn describe_body(body: &ResponseBody, detail: &mut String) {
    match body {
        ResponseBody::Json(value) => {
            match value.get("success") {
                Some(flag) => detail.push_str(&format!(
                    "; success field present, truthy: {}",
                    is_truthy(flag)
                )),
                None => detail.push_str("; no success field"),
            }
            if let Some(error) = value
                .get("error")
                .or_else(|| value.get("message"))
                .and_then(Value::as_str)
            {
                detail.push_str("; error: ");
                detail.push_str(&truncate(error, MAX_ERROR_SNIPPET_CHARS));
            }
        }
        ResponseBody::Text(text) => {
            detail.push_str(&format!("; non-JSON body ({} bytes)", text.len()));
        }
        ResponseBody::Empty => detail.push_str("; empty body"),
    }
}

/// Loose truthiness: false, null, 0, "" and empty containers are false.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().is_some_and(|n| n != 0.0),
        Value::String(text) => !text.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut cut: String = text.chars().take(max_chars).collect();
    cut.push('…');
    cut
}
