use std::collections::{BTreeMap, BTreeSet};
use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::environment::Variables;
use crate::http::method::HttpMethod;
use crate::http::request::{ResolvedRequest, endpoint_key};

use super::category::Category;

/// Status codes a case accepts as a pass.
///
/// Absent from a suite file means any 2xx. A set may include 4xx codes when
/// they prove the endpoint exists but rejected the probe's input.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "ExpectedStatusRepr", into = "ExpectedStatusRepr")]
pub enum ExpectedStatus {
    #[default]
    AnySuccess,
    OneOf(BTreeSet<u16>),
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum ExpectedStatusRepr {
    One(u16),
    Many(Vec<u16>),
    Class(String),
}

impl TryFrom<ExpectedStatusRepr> for ExpectedStatus {
    type Error = String;

    fn try_from(repr: ExpectedStatusRepr) -> Result<Self, Self::Error> {
        let codes = match repr {
            ExpectedStatusRepr::Class(class) if class.eq_ignore_ascii_case("2xx") => {
                return Ok(ExpectedStatus::AnySuccess);
            }
            ExpectedStatusRepr::Class(class) => {
                return Err(format!("Unknown status class `{class}`, expected `2xx`"));
            }
            ExpectedStatusRepr::One(code) => vec![code],
            ExpectedStatusRepr::Many(codes) => codes,
        };

        if codes.is_empty() {
            return Err("expected_status cannot be an empty list".to_string());
        }
        if let Some(code) = codes.iter().find(|code| !(100..=599).contains(*code)) {
            return Err(format!("Invalid HTTP status code {code}"));
        }
        Ok(ExpectedStatus::OneOf(codes.into_iter().collect()))
    }
}

impl From<ExpectedStatus> for ExpectedStatusRepr {
    fn from(expected: ExpectedStatus) -> Self {
        match expected {
            ExpectedStatus::AnySuccess => ExpectedStatusRepr::Class("2xx".to_string()),
            ExpectedStatus::OneOf(codes) if codes.len() == 1 => {
                ExpectedStatusRepr::One(*codes.iter().next().unwrap_or(&200))
            }
            ExpectedStatus::OneOf(codes) => ExpectedStatusRepr::Many(codes.into_iter().collect()),
        }
    }
}

impl ExpectedStatus {
    pub fn one(code: u16) -> Self {
        ExpectedStatus::OneOf(BTreeSet::from([code]))
    }

    pub fn set(codes: impl IntoIterator<Item = u16>) -> Self {
        ExpectedStatus::OneOf(codes.into_iter().collect())
    }

    pub fn accepts(&self, status: u16) -> bool {
        match self {
            ExpectedStatus::AnySuccess => (200..300).contains(&status),
            ExpectedStatus::OneOf(codes) => codes.contains(&status),
        }
    }
}

impl Display for ExpectedStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExpectedStatus::AnySuccess => f.write_str("2xx"),
            ExpectedStatus::OneOf(codes) if codes.len() == 1 => {
                write!(f, "{}", codes.iter().next().copied().unwrap_or_default())
            }
            ExpectedStatus::OneOf(codes) => {
                let joined = codes
                    .iter()
                    .map(u16::to_string)
                    .collect::<Vec<_>>()
                    .join(", ");
                write!(f, "one of [{joined}]")
            }
        }
    }
}

/// A declared HTTP probe with its expected outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestCase {
    pub name: String,
    pub method: HttpMethod,
    pub path: String,
    #[serde(default)]
    pub expected_status: ExpectedStatus,
    #[serde(default, alias = "body", skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
    #[serde(default, alias = "params", skip_serializing_if = "BTreeMap::is_empty")]
    pub query_params: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<Category>,
    /// Fail with MALFORMED_RESPONSE when the body is not JSON.
    #[serde(default)]
    pub expect_json: bool,
    /// Variable name to dotted JSON path, read from the response on success.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub capture: BTreeMap<String, String>,
}

impl TestCase {
    pub fn new(name: impl Into<String>, method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            method,
            path: path.into(),
            expected_status: ExpectedStatus::default(),
            payload: None,
            query_params: BTreeMap::new(),
            headers: BTreeMap::new(),
            category: None,
            expect_json: false,
            capture: BTreeMap::new(),
        }
    }

    pub fn expect(mut self, expected: ExpectedStatus) -> Self {
        self.expected_status = expected;
        self
    }

    pub fn with_payload(mut self, payload: Value) -> Self {
        self.payload = Some(payload);
        self
    }

    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query_params.insert(key.into(), value.into());
        self
    }

    pub fn with_capture(mut self, variable: impl Into<String>, path: impl Into<String>) -> Self {
        self.capture.insert(variable.into(), path.into());
        self
    }

    pub fn in_category(mut self, category: Category) -> Self {
        self.category = Some(category);
        self
    }

    pub fn require_json(mut self) -> Self {
        self.expect_json = true;
        self
    }

    /// Latency bucket for this case, taken from the path template so
    /// interpolated ids share one bucket.
    pub fn endpoint(&self) -> String {
        endpoint_key(self.method, &self.path)
    }

    pub fn resolve(&self, variables: &Variables) -> ResolvedRequest {
        let path = variables.interpolate_path(&self.path);
        let mut request = ResolvedRequest::new(self.method, path);
        request.endpoint = self.endpoint();
        request.query = self
            .query_params
            .iter()
            .map(|(key, value)| (key.clone(), variables.interpolate(value)))
            .collect();
        request.headers = self
            .headers
            .iter()
            .map(|(key, value)| (key.clone(), variables.interpolate(value)))
            .collect();
        request.body = self
            .payload
            .as_ref()
            .map(|payload| variables.interpolate_json(payload));
        request
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::VariableScope;
    use serde_json::json;

    #[test]
    fn expected_set_accepts_listed_codes_only() {
        let expected = ExpectedStatus::set([200, 400, 404]);
        assert!(expected.accepts(400));
        assert!(expected.accepts(404));
        assert!(!expected.accepts(500));
        assert!(!expected.accepts(201));
    }

    #[test]
    fn default_expectation_is_any_2xx() {
        let expected = ExpectedStatus::default();
        assert!(expected.accepts(200));
        assert!(expected.accepts(204));
        assert!(!expected.accepts(302));
        assert!(!expected.accepts(404));
    }

    #[test]
    fn expected_status_deserializes_single_list_and_class() {
        #[derive(Deserialize)]
        struct Wrapper {
            expected_status: ExpectedStatus,
        }

        let single: Wrapper = toml::from_str("expected_status = 201").unwrap();
        assert_eq!(single.expected_status, ExpectedStatus::one(201));

        let many: Wrapper = toml::from_str("expected_status = [200, 404]").unwrap();
        assert_eq!(many.expected_status, ExpectedStatus::set([200, 404]));

        let class: Wrapper = toml::from_str("expected_status = \"2xx\"").unwrap();
        assert_eq!(class.expected_status, ExpectedStatus::AnySuccess);

        assert!(toml::from_str::<Wrapper>("expected_status = []").is_err());
        assert!(toml::from_str::<Wrapper>("expected_status = 999").is_err());
        assert!(toml::from_str::<Wrapper>("expected_status = \"5xx\"").is_err());
    }

    #[test]
    fn expected_status_display() {
        assert_eq!(ExpectedStatus::one(200).to_string(), "200");
        assert_eq!(
            ExpectedStatus::set([404, 200, 400]).to_string(),
            "one of [200, 400, 404]"
        );
        assert_eq!(ExpectedStatus::AnySuccess.to_string(), "2xx");
    }

    #[test]
    fn resolve_interpolates_path_query_and_payload() {
        let mut variables = Variables::default();
        variables.set(VariableScope::Suite, "user_id", "u-1");
        variables.set(VariableScope::Captured, "friendship_id", "f-9");

        let case = TestCase::new(
            "Accept Friendship",
            HttpMethod::Put,
            "/friendships/{{friendship_id}}",
        )
        .with_query("user_id", "{{user_id}}")
        .with_payload(json!({"status": "accepted", "by": "{{user_id}}"}));

        let request = case.resolve(&variables);
        assert_eq!(request.path, "/friendships/f-9");
        assert_eq!(request.endpoint, "PUT /friendships/{{friendship_id}}");
        assert_eq!(
            request.query,
            vec![("user_id".to_string(), "u-1".to_string())]
        );
        assert_eq!(
            request.body,
            Some(json!({"status": "accepted", "by": "u-1"}))
        );
    }

    #[test]
    fn path_values_are_encoded_but_query_values_are_not() {
        let mut variables = Variables::default();
        variables.set(VariableScope::Captured, "id", "a#b/c");

        let case = TestCase::new("Get Item", HttpMethod::Get, "/items/{{id}}")
            .with_query("ref", "{{id}}");

        let request = case.resolve(&variables);
        assert_eq!(request.path, "/items/a%23b%2Fc");
        assert_eq!(request.query, vec![("ref".to_string(), "a#b/c".to_string())]);
    }
}
