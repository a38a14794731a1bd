//! Default configuration values.

pub const DEFAULT_BASE_URL: &str = "http://localhost:3000";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_CONCURRENCY: usize = 1;
pub const DEFAULT_CONFIG_FILE: &str = "apismoke.toml";

pub const ENV_BASE_URL: &str = "APISMOKE_BASE_URL";
pub const ENV_TIMEOUT_SECS: &str = "APISMOKE_TIMEOUT_SECS";
pub const ENV_CONCURRENCY: &str = "APISMOKE_CONCURRENCY";
pub const ENV_RUN_TIMEOUT_SECS: &str = "APISMOKE_RUN_TIMEOUT_SECS";
pub const ENV_TOKEN: &str = "APISMOKE_TOKEN";
