//! JSON results file written after each run.

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use dashprobe_engine::RunReport;

/// `dashprobe-results-<YYYYMMDD-HHMMSS>.json`
pub fn results_file_name(timestamp: DateTime<Utc>) -> String {
    format!("dashprobe-results-{}.json", timestamp.format("%Y%m%d-%H%M%S"))
}

/// Serialize `report` into `output_dir`, creating the directory if needed.
pub fn write_results_file(report: &RunReport, output_dir: &Path) -> Result<PathBuf> {
    fs::create_dir_all(output_dir).with_context(|| format!("failed to create output directory: {}", output_dir.display()))?;
    let path = output_dir.join(results_file_name(report.started_at));
    let json = serde_json::to_string_pretty(report).context("failed to serialize run report")?;
    fs::write(&path, json).with_context(|| format!("failed to write results file: {}", path.display()))?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn file_name_embeds_timestamp() {
        let timestamp = Utc.with_ymd_and_hms(2024, 3, 7, 9, 5, 1).unwrap();
        assert_eq!(results_file_name(timestamp), "dashprobe-results-20240307-090501.json");
    }

    #[test]
    fn writes_report_into_nested_directory() {
        let temp_dir = tempfile::tempdir().unwrap();
        let output_dir = temp_dir.path().join("runs").join("today");
        let now = Utc::now();
        let report = RunReport::from_results(vec![], now, now);

        let path = write_results_file(&report, &output_dir).expect("write results");
        let written: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written["exitCode"], serde_json::json!(0));
        assert!(path.file_name().unwrap().to_string_lossy().starts_with("dashprobe-results-"));
    }
}
