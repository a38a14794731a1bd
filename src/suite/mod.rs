//! # Suites
//!
//! A suite file declares variables and an ordered list of test cases. TOML
//! and JSON are accepted, chosen by file extension (`.json` is JSON,
//! everything else is TOML).
//!
//! ```toml
//! name = "social"
//!
//! [variables]
//! user_id = "8f14e45f-ceea-467f-a8c4-6b7c1f0d2e11"
//!
//! [[cases]]
//! name = "Get Friends"
//! method = "GET"
//! path = "/friendships"
//! expected_status = [200, 400, 404]
//! query_params = { user_id = "{{user_id}}" }
//! ```

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{HarnessError, Result};
use crate::testing::TestCase;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Suite {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Used when neither config, env nor CLI set a base URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(default)]
    pub variables: HashMap<String, String>,
    #[serde(default, alias = "case")]
    pub cases: Vec<TestCase>,
}

impl Suite {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|source| HarnessError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let is_json = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

        if is_json {
            Self::from_json_str(&raw)
        } else {
            Self::from_toml_str(&raw)
        }
    }

    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let suite: Suite = toml::from_str(raw)?;
        suite.validate()?;
        Ok(suite)
    }

    pub fn from_json_str(raw: &str) -> Result<Self> {
        let suite: Suite = serde_json::from_str(raw)?;
        suite.validate()?;
        Ok(suite)
    }

    fn validate(&self) -> Result<()> {
        for (idx, case) in self.cases.iter().enumerate() {
            if case.name.trim().is_empty() {
                return Err(HarnessError::Suite(format!("case #{} has an empty name", idx + 1)));
            }
            if case.path.trim().is_empty() {
                return Err(HarnessError::Suite(format!(
                    "case `{}` has an empty path",
                    case.name
                )));
            }
            if let Some((variable, _)) = case.capture.iter().find(|(_, path)| path.trim().is_empty()) {
                return Err(HarnessError::Suite(format!(
                    "case `{}` captures `{variable}` from an empty path",
                    case.name
                )));
            }
        }
        Ok(())
    }
}
