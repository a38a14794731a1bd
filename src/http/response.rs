use std::fmt::{self, Display};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Failure taxonomy attached to unsuccessful test results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    Timeout,
    ConnectionError,
    MalformedResponse,
    UnexpectedStatus,
    TransportError,
    Cancelled,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Timeout => "TIMEOUT",
            ErrorKind::ConnectionError => "CONNECTION_ERROR",
            ErrorKind::MalformedResponse => "MALFORMED_RESPONSE",
            ErrorKind::UnexpectedStatus => "UNEXPECTED_STATUS",
            ErrorKind::TransportError => "TRANSPORT_ERROR",
            ErrorKind::Cancelled => "CANCELLED",
        }
    }
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Response body, decoded once when the response arrives.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseBody {
    Json(Value),
    Text(String),
    Empty,
}

impl ResponseBody {
    pub fn from_bytes(bytes: &[u8]) -> Self {
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return ResponseBody::Empty;
        }
        match serde_json::from_slice::<Value>(bytes) {
            Ok(value) => ResponseBody::Json(value),
            Err(_) => ResponseBody::Text(String::from_utf8_lossy(bytes).into_owned()),
        }
    }

    pub fn as_json(&self) -> Option<&Value> {
        match self {
            ResponseBody::Json(value) => Some(value),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: ResponseBody,
    pub elapsed: Duration,
}

/// Normalized result of one dispatch. Transport failures are values, never errors.
#[derive(Debug, Clone)]
pub enum Outcome {
    Response(HttpResponse),
    NoResponse {
        kind: ErrorKind,
        message: String,
        elapsed: Duration,
    },
}

impl Outcome {
    pub fn elapsed(&self) -> Duration {
        match self {
            Outcome::Response(response) => response.elapsed,
            Outcome::NoResponse { elapsed, .. } => *elapsed,
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            Outcome::Response(response) => Some(response.status),
            Outcome::NoResponse { .. } => None,
        }
    }
}
