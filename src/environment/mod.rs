//! # Variables
//!
//! Layered variables with `{{name}}` interpolation in paths, query values,
//! headers and JSON payloads. Values substituted into paths are
//! percent-encoded; the other positions are encoded by the HTTP client.
//!
//! Precedence (higher overrides lower): suite < override (`--var`) < captured.
//! Captured values come from earlier responses in the same run, so the most
//! recent fact about the target wins.

use std::borrow::Cow;
use std::collections::HashMap;

use serde_json::Value;

/// Scope at which a variable is defined.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariableScope {
    Suite,
    Override,
    Captured,
}

#[derive(Debug, Clone, Default)]
pub struct Variables {
    suite: HashMap<String, String>,
    overrides: HashMap<String, String>,
    captured: HashMap<String, String>,
}

impl Variables {
    pub fn new(suite: HashMap<String, String>, overrides: HashMap<String, String>) -> Self {
        Self {
            suite,
            overrides,
            captured: HashMap::new(),
        }
    }

    pub fn set(&mut self, scope: VariableScope, key: impl Into<String>, value: impl Into<String>) {
        let target = match scope {
            VariableScope::Suite => &mut self.suite,
            VariableScope::Override => &mut self.overrides,
            VariableScope::Captured => &mut self.captured,
        };
        target.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.captured
            .get(key)
            .or_else(|| self.overrides.get(key))
            .or_else(|| self.suite.get(key))
            .map(String::as_str)
    }

    /// Flatten all scopes into one map, respecting precedence.
    pub fn resolve(&self) -> HashMap<String, String> {
        let mut resolved = self.suite.clone();
        resolved.extend(self.overrides.clone());
        resolved.extend(self.captured.clone());
        resolved
    }

    /// Replace `{{name}}` placeholders. Unknown names are left verbatim.
    pub fn interpolate(&self, text: &str) -> String {
        self.interpolate_with(text, Cow::Borrowed)
    }

    /// Like [`Variables::interpolate`], but each value is percent-encoded as
    /// a single path segment so `/`, `?` and `#` cannot reshape the URL.
    pub fn interpolate_path(&self, text: &str) -> String {
        self.interpolate_with(text, urlencoding::encode)
    }

    fn interpolate_with<'v>(
        &'v self,
        text: &str,
        encode: impl Fn(&'v str) -> Cow<'v, str>,
    ) -> String {
        let mut result = String::with_capacity(text.len());
        let mut rest = text;

        while let Some(start) = rest.find("{{") {
            let Some(len) = rest[start + 2..].find("}}") else {
                break;
            };
            let end = start + 2 + len;
            let name = rest[start + 2..end].trim();

            result.push_str(&rest[..start]);
            match self.get(name) {
                Some(value) => result.push_str(&encode(value)),
                None => result.push_str(&rest[start..end + 2]),
            }
            rest = &rest[end + 2..];
        }

        result.push_str(rest);
        result
    }

    /// Interpolate every string inside a JSON value, keys included.
    pub fn interpolate_json(&self, value: &Value) -> Value {
        match value {
            Value::String(text) => Value::String(self.interpolate(text)),
            Value::Array(items) => {
                Value::Array(items.iter().map(|item| self.interpolate_json(item)).collect())
            }
            Value::Object(map) => Value::Object(
                map.iter()
                    .map(|(key, item)| (self.interpolate(key), self.interpolate_json(item)))
                    .collect(),
            ),
            other => other.clone(),
        }
    }
}

/// Names of placeholders still present in `text`.
pub fn unresolved_placeholders(text: &str) -> Vec<String> {
    let mut names = Vec::new();
    let mut rest = text;
    while let Some(start) = rest.find("{{") {
        let Some(len) = rest[start + 2..].find("}}") else {
            break;
        };
        names.push(rest[start + 2..start + 2 + len].trim().to_string());
        rest = &rest[start + 2 + len + 2..];
    }
    names
}
