//! Configuration management.
//!
//! Sources, lowest priority first:
//! 1. Built-in defaults
//! 2. `apismoke.toml` in the working directory, or an explicit `--config` file
//! 3. `APISMOKE_*` environment variables
//! 4. Command-line flags (applied by the binary)

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::auth::AuthMethod;
use crate::cli::OutputFormat;
use crate::error::{HarnessError, Result};

mod defaults;

pub use defaults::*;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub target: TargetConfig,
    pub run: RunConfig,
}

/// Where requests go and how they authenticate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TargetConfig {
    /// Left unset so a suite's own base URL can apply.
    pub base_url: Option<String>,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
    pub auth: AuthMethod,
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            auth: AuthMethod::None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub concurrency: usize,
    /// Overall deadline for the whole run, in seconds.
    pub run_timeout_secs: Option<u64>,
    pub output: OutputFormat,
    pub results_file: Option<PathBuf>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            run_timeout_secs: None,
            output: OutputFormat::Text,
            results_file: None,
        }
    }
}

impl Config {
    /// Load from an explicit file, else `./apismoke.toml` if present, else
    /// defaults. Environment overrides are applied in every case.
    ///
    /// Not validated here: CLI flags may still correct a lower layer, so
    /// call [`Config::validate`] once every layer is applied.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let mut config = match explicit {
            Some(path) => Self::from_file(path)?,
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => Self::from_file(DEFAULT_CONFIG_FILE)?,
            None => Self::default(),
        };

        config.apply_env_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| HarnessError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(toml::from_str(&content)?)
    }

    /// Apply `APISMOKE_*` overrides read through `lookup`.
    pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(url) = lookup(ENV_BASE_URL).filter(|url| !url.trim().is_empty()) {
            self.target.base_url = Some(url);
        }
        if let Some(raw) = lookup(ENV_TIMEOUT_SECS) {
            self.target.timeout_secs = parse_env(ENV_TIMEOUT_SECS, &raw)?;
        }
        if let Some(raw) = lookup(ENV_CONCURRENCY) {
            self.run.concurrency = parse_env(ENV_CONCURRENCY, &raw)?;
        }
        if let Some(raw) = lookup(ENV_RUN_TIMEOUT_SECS) {
            self.run.run_timeout_secs = Some(parse_env(ENV_RUN_TIMEOUT_SECS, &raw)?);
        }
        if let Some(token) = lookup(ENV_TOKEN) {
            let auth = AuthMethod::bearer(Some(&token));
            if auth != AuthMethod::None {
                self.target.auth = auth;
            }
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.target.timeout_secs == 0 {
            return Err(HarnessError::Config(
                "timeout_secs must be greater than 0".to_string(),
            ));
        }
        if self.run.concurrency == 0 {
            return Err(HarnessError::Config(
                "concurrency must be greater than 0".to_string(),
            ));
        }
        if self.run.run_timeout_secs == Some(0) {
            return Err(HarnessError::Config(
                "run_timeout_secs must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.target.timeout_secs)
    }

    pub fn run_timeout(&self) -> Option<Duration> {
        self.run.run_timeout_secs.map(Duration::from_secs)
    }

    /// Base URL precedence: config/env/CLI, then the suite's, then the built-in default.
    pub fn resolve_base_url(&self, suite_base_url: Option<&str>) -> String {
        self.target
            .base_url
            .as_deref()
            .or(suite_base_url)
            .unwrap_or(DEFAULT_BASE_URL)
            .to_string()
    }

    pub fn default_config_string() -> String {
        toml::to_string_pretty(&Config::default()).unwrap_or_default()
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, raw: &str) -> Result<T> {
    raw.trim()
        .parse()
        .map_err(|_| HarnessError::Config(format!("{key} has an invalid value `{raw}`")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_are_valid() {
        let config = Config::default();
        assert_eq!(config.target.timeout_secs, DEFAULT_TIMEOUT_SECS);
        assert_eq!(config.run.concurrency, 1);
        assert_eq!(config.run.output, OutputFormat::Text);
        assert!(config.validate().is_ok());
        assert_eq!(config.resolve_base_url(None), DEFAULT_BASE_URL);
    }

    #[test]
    fn parses_toml_sections() {
        let config: Config = toml::from_str(
            r#"
[target]
base_url = "https://staging.example.com"
timeout_secs = 10
auth = { type = "bearer", token = "abc" }

[run]
concurrency = 5
output = "json"
results_file = "out/results.json"
"#,
        )
        .unwrap();

        assert_eq!(config.target.base_url.as_deref(), Some("https://staging.example.com"));
        assert_eq!(config.timeout(), Duration::from_secs(10));
        assert_eq!(
            config.target.auth,
            AuthMethod::Bearer {
                token: "abc".to_string()
            }
        );
        assert_eq!(config.run.concurrency, 5);
        assert_eq!(config.run.output, OutputFormat::Json);
        assert_eq!(config.run.results_file, Some(PathBuf::from("out/results.json")));
    }

    #[test]
    fn env_overrides_file_values() {
        let mut config = Config::default();
        config
            .apply_env_overrides(lookup(&[
                (ENV_BASE_URL, "http://env.test"),
                (ENV_TIMEOUT_SECS, "12"),
                (ENV_CONCURRENCY, "5"),
                (ENV_RUN_TIMEOUT_SECS, "120"),
                (ENV_TOKEN, "tok"),
            ]))
            .unwrap();

        assert_eq!(config.resolve_base_url(Some("http://suite.test")), "http://env.test");
        assert_eq!(config.target.timeout_secs, 12);
        assert_eq!(config.run.concurrency, 5);
        assert_eq!(config.run_timeout(), Some(Duration::from_secs(120)));
        assert_eq!(
            config.target.auth,
            AuthMethod::Bearer {
                token: "tok".to_string()
            }
        );
    }

    #[test]
    fn invalid_env_values_are_rejected() {
        let mut config = Config::default();
        let err = config
            .apply_env_overrides(lookup(&[(ENV_CONCURRENCY, "many")]))
            .unwrap_err();
        assert!(err.to_string().contains(ENV_CONCURRENCY));
    }

    #[test]
    fn suite_base_url_applies_when_unset() {
        let config = Config::default();
        assert_eq!(config.resolve_base_url(Some("http://suite.test")), "http://suite.test");
    }

    #[test]
    fn zero_values_fail_validation() {
        let mut config = Config::default();
        config.run.concurrency = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.target.timeout_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn loads_explicit_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[run]\nconcurrency = 3").unwrap();
        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.run.concurrency, 3);
        assert_eq!(config.target.timeout_secs, DEFAULT_TIMEOUT_SECS);
    }

    #[test]
    fn default_config_round_trips_through_toml() {
        let raw = Config::default_config_string();
        assert!(raw.contains("[target]"));
        assert!(raw.contains("[run]"));
        let parsed: Config = toml::from_str(&raw).unwrap();
        assert_eq!(parsed, Config::default());
    }
}
