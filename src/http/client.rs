use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use reqwest::header::{ACCEPT, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, RequestBuilder, Url};
use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::auth::AuthMethod;
use crate::engine::metrics::LatencyRecorder;
use crate::error::{HarnessError, Result};

use super::request::ResolvedRequest;
use super::response::{ErrorKind, HttpResponse, Outcome, ResponseBody};

const APPLICATION_JSON: &str = "application/json";

/// Executes single requests against the target base URL.
///
/// The dispatcher never fails: transport problems come back as
/// [`Outcome::NoResponse`] so the run keeps going.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    client: Client,
    base_url: String,
    auth: AuthMethod,
    metrics: LatencyRecorder,
}

impl Dispatcher {
    pub fn new(
        base_url: &str,
        timeout: Duration,
        auth: AuthMethod,
        metrics: LatencyRecorder,
    ) -> Result<Self> {
        let base_url = validate_base_url(base_url)?;
        let client = Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()?;

        Ok(Self {
            client,
            base_url,
            auth,
            metrics,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn metrics(&self) -> &LatencyRecorder {
        &self.metrics
    }

    /// Join a case path onto the base URL. Absolute `http(s)://` paths are used as is.
    pub fn resolve_url(&self, path: &str) -> std::result::Result<Url, String> {
        let raw = if path.starts_with("http://") || path.starts_with("https://") {
            path.to_string()
        } else {
            format!(
                "{}/{}",
                self.base_url.trim_end_matches('/'),
                path.trim_start_matches('/')
            )
        };
        Url::parse(&raw).map_err(|e| format!("Invalid URL `{raw}`: {e}"))
    }

    pub async fn dispatch(
        &self,
        request: &ResolvedRequest,
        cancel_rx: &mut broadcast::Receiver<()>,
    ) -> Outcome {
        let started = Instant::now();
        let builder = match self.build_request(request) {
            Ok(builder) => builder,
            Err(message) => {
                warn!(endpoint = %request.endpoint, %message, "request could not be built");
                let elapsed = started.elapsed();
                self.metrics.record(&request.endpoint, elapsed.as_secs_f64());
                return Outcome::NoResponse {
                    kind: ErrorKind::TransportError,
                    message,
                    elapsed,
                };
            }
        };

        debug!(method = %request.method, path = %request.path, "dispatching request");

        let outcome = tokio::select! {
            outcome = execute(builder, started) => outcome,
            _ = cancel_rx.recv() => {
                return Outcome::NoResponse {
                    kind: ErrorKind::Cancelled,
                    message: "Run cancelled before the response arrived".to_string(),
                    elapsed: started.elapsed(),
                };
            }
        };

        self.metrics
            .record(&request.endpoint, outcome.elapsed().as_secs_f64());

        match &outcome {
            Outcome::Response(response) => debug!(
                endpoint = %request.endpoint,
                status = response.status,
                latency_ms = response.elapsed.as_millis() as u64,
                "response received"
            ),
            Outcome::NoResponse { kind, message, .. } => warn!(
                endpoint = %request.endpoint,
                kind = %kind,
                %message,
                "request failed"
            ),
        }

        outcome
    }

    fn build_request(&self, request: &ResolvedRequest) -> std::result::Result<RequestBuilder, String> {
        let mut url = self.resolve_url(&request.path)?;
        if !request.query.is_empty() {
            let mut query_pairs = url.query_pairs_mut();
            for (key, value) in &request.query {
                query_pairs.append_pair(key, value);
            }
        }

        let mut req_builder = self
            .client
            .request(request.method.into(), url)
            .header(CONTENT_TYPE, APPLICATION_JSON)
            .header(ACCEPT, APPLICATION_JSON);
        req_builder = self.auth.apply(req_builder)?;
        req_builder = req_builder.headers(build_headers(&request.headers)?);

        if let Some(body) = &request.body {
            if request.method.sends_body() {
                req_builder = req_builder.json(body);
            }
        }

        Ok(req_builder)
    }
}

async fn execute(req_builder: RequestBuilder, started: Instant) -> Outcome {
    let response = match req_builder.send().await {
        Ok(response) => response,
        Err(err) => return transport_failure(&err, started),
    };

    let status = response.status().as_u16();
    match response.bytes().await {
        Ok(bytes) => Outcome::Response(HttpResponse {
            status,
            body: ResponseBody::from_bytes(&bytes),
            elapsed: started.elapsed(),
        }),
        Err(err) => transport_failure(&err, started),
    }
}

fn transport_failure(err: &reqwest::Error, started: Instant) -> Outcome {
    Outcome::NoResponse {
        kind: classify_reqwest_error(err),
        message: err.to_string(),
        elapsed: started.elapsed(),
    }
}

fn classify_reqwest_error(err: &reqwest::Error) -> ErrorKind {
    if err.is_timeout() {
        return ErrorKind::Timeout;
    }
    if err.is_connect() {
        return ErrorKind::ConnectionError;
    }

    let message = err.to_string().to_ascii_lowercase();
    if message.contains("dns") || message.contains("failed to lookup address") {
        return ErrorKind::ConnectionError;
    }

    ErrorKind::TransportError
}

pub fn build_headers(input: &BTreeMap<String, String>) -> std::result::Result<HeaderMap, String> {
    let mut headers = HeaderMap::new();

    for (key, value) in input {
        if key.is_empty() {
            continue;
        }

        let header_name = HeaderName::from_bytes(key.as_bytes())
            .map_err(|err| format!("Invalid header name `{key}`: {err}"))?;
        let header_value = HeaderValue::from_str(value)
            .map_err(|err| format!("Invalid header value for `{key}`: {err}"))?;
        headers.insert(header_name, header_value);
    }

    Ok(headers)
}

fn validate_base_url(raw: &str) -> Result<String> {
    let trimmed = raw.trim();
    let url = Url::parse(trimmed).map_err(|e| HarnessError::BaseUrl {
        url: trimmed.to_string(),
        reason: e.to_string(),
    })?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(HarnessError::BaseUrl {
            url: trimmed.to_string(),
            reason: format!("unsupported scheme `{}`", url.scheme()),
        });
    }
    Ok(trimmed.trim_end_matches('/').to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::method::HttpMethod;

    fn dispatcher(base_url: &str) -> Dispatcher {
        Dispatcher::new(
            base_url,
            Duration::from_secs(1),
            AuthMethod::None,
            LatencyRecorder::new(),
        )
        .expect("dispatcher")
    }

    #[test]
    fn rejects_non_http_base_urls() {
        let err = Dispatcher::new(
            "ftp://example.com",
            Duration::from_secs(1),
            AuthMethod::None,
            LatencyRecorder::new(),
        )
        .unwrap_err();
        assert!(matches!(err, HarnessError::BaseUrl { .. }));
        assert!(
            Dispatcher::new(
                "not a url",
                Duration::from_secs(1),
                AuthMethod::None,
                LatencyRecorder::new()
            )
            .is_err()
        );
    }

    #[test]
    fn resolve_url_joins_paths_without_double_slashes() {
        let dispatcher = dispatcher("http://localhost:3000/api/");
        assert_eq!(
            dispatcher.resolve_url("/friendships").unwrap().as_str(),
            "http://localhost:3000/api/friendships"
        );
        assert_eq!(
            dispatcher.resolve_url("teams").unwrap().as_str(),
            "http://localhost:3000/api/teams"
        );
        assert_eq!(
            dispatcher.resolve_url("https://other.test/health").unwrap().as_str(),
            "https://other.test/health"
        );
    }

    #[test]
    fn build_request_sets_json_headers_and_query() {
        let dispatcher = dispatcher("http://localhost:3000");
        let mut request = ResolvedRequest::new(HttpMethod::Get, "/friendships");
        request.query.push(("user_id".to_string(), "42".to_string()));
        request
            .headers
            .insert("X-Trace".to_string(), "abc".to_string());

        let built = dispatcher.build_request(&request).unwrap().build().unwrap();
        assert_eq!(
            built.url().as_str(),
            "http://localhost:3000/friendships?user_id=42"
        );
        assert_eq!(built.headers().get(ACCEPT).unwrap(), APPLICATION_JSON);
        assert_eq!(built.headers().get(CONTENT_TYPE).unwrap(), APPLICATION_JSON);
        assert_eq!(built.headers().get("x-trace").unwrap(), "abc");
    }

    #[test]
    fn get_requests_drop_payloads() {
        let dispatcher = dispatcher("http://localhost:3000");
        let mut request = ResolvedRequest::new(HttpMethod::Get, "/messages");
        request.body = Some(serde_json::json!({"content": "hi"}));
        let built = dispatcher.build_request(&request).unwrap().build().unwrap();
        assert!(built.body().is_none());

        request.method = HttpMethod::Post;
        let built = dispatcher.build_request(&request).unwrap().build().unwrap();
        assert!(built.body().is_some());
    }

    #[test]
    fn invalid_header_is_reported() {
        let mut headers = BTreeMap::new();
        headers.insert("bad header".to_string(), "x".to_string());
        assert!(build_headers(&headers).is_err());
    }

    #[tokio::test]
    async fn connection_refused_becomes_connection_error() {
        // Bind then drop so the port is very likely closed.
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let dispatcher = dispatcher(&format!("http://127.0.0.1:{port}"));
        let (_tx, mut rx) = broadcast::channel(1);
        let outcome = dispatcher
            .dispatch(&ResolvedRequest::new(HttpMethod::Get, "/health"), &mut rx)
            .await;

        match outcome {
            Outcome::NoResponse { kind, .. } => assert_eq!(kind, ErrorKind::ConnectionError),
            Outcome::Response(response) => panic!("unexpected response {}", response.status),
        }
        assert_eq!(dispatcher.metrics().total_samples(), 1);
    }

    #[tokio::test]
    async fn unbuildable_request_still_records_latency() {
        let dispatcher = dispatcher("http://localhost:3000");
        let mut request = ResolvedRequest::new(HttpMethod::Get, "/health");
        request
            .headers
            .insert("bad header".to_string(), "x".to_string());

        let (_tx, mut rx) = broadcast::channel(1);
        let outcome = dispatcher.dispatch(&request, &mut rx).await;

        match outcome {
            Outcome::NoResponse { kind, .. } => assert_eq!(kind, ErrorKind::TransportError),
            Outcome::Response(response) => panic!("unexpected response {}", response.status),
        }
        assert_eq!(dispatcher.metrics().snapshot()["GET /health"].len(), 1);
    }
}
