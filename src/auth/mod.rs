//! # Authentication
//!
//! Credentials attached to every dispatched request when a run simulates an
//! authenticated caller. The harness never performs login flows itself; the
//! token or key is supplied up front through config, env or CLI.

use reqwest::header::{HeaderName, HeaderValue};
use serde::{Deserialize, Serialize};

/// Supported authentication methods.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuthMethod {
    #[default]
    None,
    Bearer {
        token: String,
    },
    Basic {
        username: String,
        #[serde(default)]
        password: String,
    },
    ApiKey {
        header: String,
        value: String,
    },
}

impl AuthMethod {
    /// Bearer auth from an optional token; blank tokens mean no auth.
    pub fn bearer(token: Option<&str>) -> Self {
        match token.map(str::trim).filter(|token| !token.is_empty()) {
            Some(token) => AuthMethod::Bearer {
                token: token.to_string(),
            },
            None => AuthMethod::None,
        }
    }

    pub fn apply(
        &self,
        mut req_builder: reqwest::RequestBuilder,
    ) -> Result<reqwest::RequestBuilder, String> {
        match self {
            AuthMethod::None => {}
            AuthMethod::Bearer { token } => {
                let token = token.trim();
                if token.is_empty() {
                    return Err("Bearer token cannot be empty".to_string());
                }
                req_builder = req_builder.bearer_auth(token);
            }
            AuthMethod::Basic { username, password } => {
                let username = username.trim();
                if username.is_empty() {
                    return Err("Basic auth username cannot be empty".to_string());
                }
                req_builder = req_builder.basic_auth(username, Some(password.trim()));
            }
            AuthMethod::ApiKey { header, value } => {
                let header = header.trim();
                if header.is_empty() {
                    return Err("API key header name cannot be empty".to_string());
                }
                let header_name = HeaderName::from_bytes(header.as_bytes())
                    .map_err(|e| format!("Invalid API key header `{header}`: {e}"))?;
                let header_value = HeaderValue::from_str(value.trim())
                    .map_err(|e| format!("Invalid API key header value: {e}"))?;
                req_builder = req_builder.header(header_name, header_value);
            }
        }

        Ok(req_builder)
    }
}
