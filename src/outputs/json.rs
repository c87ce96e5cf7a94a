//! JSON report output.
//!
//! Files are organized by the local date of generation, named after the
//! report's slug:
//! ```text
//! json_output_dir/
//! └── 2025-05-06/
//!     └── react-hooks.json
//! ```
//!
//! A second run for the same input on the same day overwrites the file.

use chrono::Local;
use std::error::Error;
use std::path::PathBuf;
use tokio::fs;
use tracing::{error, info, instrument};

use super::Report;

/// Write a [`Report`] to a JSON file with date-based directory structure.
///
/// # Arguments
///
/// * `report` - The report to serialize
/// * `json_output_dir` - Base directory for JSON output
///
/// # Returns
///
/// The path written, or an error if directory creation or file writing fails.
///
/// # Output Path
///
/// `{json_output_dir}/{YYYY-MM-DD}/{slug}.json`
#[instrument(level = "info", skip_all, fields(json_output_dir = %json_output_dir))]
pub async fn write_report(report: &Report, json_output_dir: &str) -> Result<PathBuf, Box<dyn Error>> {
    let json = serde_json::to_string_pretty(report)?;

    let local_date = report.generated_at.with_timezone(&Local).date_naive();
    let full_json_dir = PathBuf::from(json_output_dir).join(local_date.to_string());

    info!(full_json_dir = %full_json_dir.display(), "Ensuring JSON directory exists");
    if let Err(e) = fs::create_dir_all(&full_json_dir).await {
        error!(full_json_dir = %full_json_dir.display(), error = %e, "Failed to create JSON dir");
        return Err(e.into());
    }

    let path = full_json_dir.join(format!("{}.json", report.slug()));
    fs::write(&path, json).await?;
    info!(path = %path.display(), "Wrote JSON report");

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DiscoveryResult, Tier};

    #[tokio::test]
    async fn test_write_report_dated_layout() {
        let tmp = tempfile::tempdir().unwrap();
        let mut report = Report::new("React Hooks");
        report.discovery = Some(DiscoveryResult::found("React Hooks", Vec::new(), Tier::Static));

        let path = write_report(&report, tmp.path().to_str().unwrap()).await.unwrap();

        let date = report.generated_at.with_timezone(&Local).date_naive().to_string();
        assert_eq!(path, tmp.path().join(date).join("react-hooks.json"));

        let written: Report = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written, report);
    }
}
