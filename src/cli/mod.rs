//! # CLI
//!
//! Command-line surface for running a suite in CI: flags override config and
//! environment, the exit code reports whether every case passed.

use std::collections::HashMap;
use std::fmt::{self, Display};
use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use serde::{Deserialize, Serialize};
use tracing::Level;

use crate::auth::AuthMethod;
use crate::config::Config;

/// Output format for reports.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            OutputFormat::Text => "text",
            OutputFormat::Json => "json",
        };
        write!(f, "{label}")
    }
}

/// Smoke-test an HTTP/JSON API from a suite file.
#[derive(Parser, Debug)]
#[command(name = "apismoke", author, version, about, long_about = None)]
pub struct Cli {
    /// Suite file (TOML, or JSON by `.json` extension)
    pub suite: PathBuf,

    /// Base URL of the API under test
    #[arg(long)]
    pub base_url: Option<String>,

    /// Per-request timeout in seconds
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Number of concurrent workers (1 = sequential)
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// Report format written to stdout
    #[arg(long, value_enum)]
    pub output: Option<OutputFormat>,

    /// Overall deadline for the run in seconds
    #[arg(long)]
    pub run_timeout: Option<u64>,

    /// Bearer token sent as `Authorization: Bearer <token>`
    #[arg(long)]
    pub token: Option<String>,

    /// Variable override, repeatable (`--var user_id=42`)
    #[arg(long = "var", value_name = "KEY=VALUE", value_parser = parse_var)]
    pub vars: Vec<(String, String)>,

    /// Also write the JSON report to this file
    #[arg(long)]
    pub results_file: Option<PathBuf>,

    /// Config file (defaults to ./apismoke.toml when present)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Log level for diagnostics on stderr (error, warn, info, debug, trace)
    #[arg(long, default_value = "warn")]
    pub log_level: Level,
}

impl Cli {
    /// Flags win over whatever config and environment provided.
    pub fn apply_to(&self, config: &mut Config) {
        if let Some(base_url) = &self.base_url {
            config.target.base_url = Some(base_url.clone());
        }
        if let Some(timeout) = self.timeout {
            config.target.timeout_secs = timeout;
        }
        if let Some(concurrency) = self.concurrency {
            config.run.concurrency = concurrency;
        }
        if let Some(output) = self.output {
            config.run.output = output;
        }
        if let Some(run_timeout) = self.run_timeout {
            config.run.run_timeout_secs = Some(run_timeout);
        }
        if let Some(results_file) = &self.results_file {
            config.run.results_file = Some(results_file.clone());
        }
        let auth = AuthMethod::bearer(self.token.as_deref());
        if auth != AuthMethod::None {
            config.target.auth = auth;
        }
    }

    pub fn variable_overrides(&self) -> HashMap<String, String> {
        self.vars.iter().cloned().collect()
    }
}

fn parse_var(raw: &str) -> Result<(String, String), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("Invalid variable `{raw}`, expected KEY=VALUE"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("Variable name cannot be empty: `{raw}`"));
    }
    Ok((key.to_string(), value.trim().to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ENV_TIMEOUT_SECS;

    #[test]
    fn parses_full_flag_set() {
        let cli = Cli::try_parse_from([
            "apismoke",
            "suite.toml",
            "--base-url",
            "http://api.test",
            "--timeout",
            "5",
            "--concurrency",
            "5",
            "--output",
            "json",
            "--run-timeout",
            "60",
            "--token",
            "abc",
            "--var",
            "user_id=42",
            "--var",
            "team = red",
        ])
        .unwrap();

        assert_eq!(cli.suite, PathBuf::from("suite.toml"));
        assert_eq!(cli.output, Some(OutputFormat::Json));
        assert_eq!(cli.variable_overrides()["user_id"], "42");
        assert_eq!(cli.variable_overrides()["team"], "red");

        let mut config = Config::default();
        cli.apply_to(&mut config);
        assert_eq!(config.target.base_url.as_deref(), Some("http://api.test"));
        assert_eq!(config.target.timeout_secs, 5);
        assert_eq!(config.run.concurrency, 5);
        assert_eq!(config.run.run_timeout_secs, Some(60));
        assert_eq!(
            config.target.auth,
            AuthMethod::Bearer {
                token: "abc".to_string()
            }
        );
    }

    #[test]
    fn absent_flags_leave_config_untouched() {
        let cli = Cli::try_parse_from(["apismoke", "suite.toml"]).unwrap();
        let mut config = Config::default();
        config.run.concurrency = 3;
        cli.apply_to(&mut config);
        assert_eq!(config.run.concurrency, 3);
        assert_eq!(config.target.auth, AuthMethod::None);
        assert_eq!(cli.log_level, Level::WARN);
    }

    #[test]
    fn rejects_malformed_vars() {
        assert!(Cli::try_parse_from(["apismoke", "s.toml", "--var", "novalue"]).is_err());
        assert!(Cli::try_parse_from(["apismoke", "s.toml", "--var", "=x"]).is_err());
        assert!(Cli::try_parse_from(["apismoke", "s.toml", "--output", "xml"]).is_err());
    }

    #[test]
    fn log_level_is_parsed_and_checked() {
        let cli = Cli::try_parse_from(["apismoke", "s.toml", "--log-level", "debug"]).unwrap();
        assert_eq!(cli.log_level, Level::DEBUG);
        assert!(Cli::try_parse_from(["apismoke", "s.toml", "--log-level", "loud"]).is_err());
    }

    #[test]
    fn flags_correct_invalid_lower_layers() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("apismoke.toml");
        std::fs::write(&path, "[run]\nconcurrency = 0\n").unwrap();

        let mut config = Config::load(Some(path.as_path())).unwrap();
        config
            .apply_env_overrides(|key| (key == ENV_TIMEOUT_SECS).then(|| "0".to_string()))
            .unwrap();
        assert!(config.validate().is_err());

        let cli = Cli::try_parse_from([
            "apismoke",
            "s.toml",
            "--concurrency",
            "5",
            "--timeout",
            "10",
        ])
        .unwrap();
        cli.apply_to(&mut config);
        assert!(config.validate().is_ok());
        assert_eq!(config.run.concurrency, 5);
        assert_eq!(config.target.timeout_secs, 10);
    }
}
