//! Optional results-file sink.

use std::fs;
use std::path::Path;

use crate::error::{HarnessError, Result};
use crate::report::RunReport;

/// Write the JSON report to `path`, creating parent directories as needed.
pub fn save_report(path: &Path, report: &RunReport) -> Result<()> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|source| HarnessError::Write {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    let raw = serde_json::to_string_pretty(report)?;
    fs::write(path, raw).map_err(|source| HarnessError::Write {
        path: path.to_path_buf(),
        source,
    })
}
