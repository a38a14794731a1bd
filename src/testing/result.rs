use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::http::method::HttpMethod;
use crate::http::response::ErrorKind;

use super::category::Category;

/// Recorded outcome of one executed test case. Built once by the classifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestResult {
    pub test_name: String,
    pub method: HttpMethod,
    pub endpoint: String,
    pub category: Category,
    pub success: bool,
    pub status_code: Option<u16>,
    pub latency_seconds: f64,
    pub detail_message: String,
    pub error_kind: Option<ErrorKind>,
    pub timestamp: DateTime<Utc>,
}

impl TestResult {
    pub fn is_cancelled(&self) -> bool {
        self.error_kind == Some(ErrorKind::Cancelled)
    }
}
