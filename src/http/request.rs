use std::collections::BTreeMap;

use serde_json::Value;

use super::method::HttpMethod;

/// A test case after variable interpolation, ready to dispatch.
#[derive(Debug, Clone)]
pub struct ResolvedRequest {
    pub method: HttpMethod,
    pub path: String,
    /// Latency bucket key, e.g. `GET /friendships`.
    pub endpoint: String,
    pub query: Vec<(String, String)>,
    pub headers: BTreeMap<String, String>,
    pub body: Option<Value>,
}

impl ResolvedRequest {
    pub fn new(method: HttpMethod, path: impl Into<String>) -> Self {
        let path = path.into();
        Self {
            method,
            endpoint: endpoint_key(method, &path),
            path,
            query: Vec::new(),
            headers: BTreeMap::new(),
            body: None,
        }
    }
}

/// Endpoint key used to group latencies: the verb plus the path without its query string.
pub fn endpoint_key(method: HttpMethod, path: &str) -> String {
    let path = path.split_once('?').map_or(path, |(path, _)| path);
    format!("{method} {path}")
}
