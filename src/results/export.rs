//! One-shot export of a finished run
//!
//! JSON exports wrap the run with a generated id, an export timestamp and
//! host information; CSV exports hold one row per result.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use tracing::info;

use crate::models::AutoTestResult;
use crate::output::{csv_record, CSV_HEADER};

/// JSON export document
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ExportedRun {
    /// Unique run ID
    pub id: String,

    /// When the export was written
    pub exported_at: DateTime<Utc>,

    pub environment: EnvironmentInfo,

    pub run: AutoTestResult,
}

impl ExportedRun {
    pub fn new(run: AutoTestResult) -> Self {
        Self {
            id: generate_run_id(),
            exported_at: Utc::now(),
            environment: EnvironmentInfo::default(),
            run,
        }
    }
}

/// Host the run was executed on
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EnvironmentInfo {
    pub os: String,
    pub arch: String,
    pub tool_version: String,
}

impl Default for EnvironmentInfo {
    fn default() -> Self {
        Self {
            os: std::env::consts::OS.to_string(),
            arch: std::env::consts::ARCH.to_string(),
            tool_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Generate unique run ID
fn generate_run_id() -> String {
    let timestamp = Utc::now().format("%Y%m%d_%H%M%S");
    let random: u32 = rand::random::<u32>() % 10000;
    format!("{timestamp}_{random:04}")
}

/// Export format
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExportFormat {
    Json,
    Csv,
}

impl ExportFormat {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "json" => Some(ExportFormat::Json),
            "csv" => Some(ExportFormat::Csv),
            _ => None,
        }
    }

    pub fn from_extension(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_str)
    }
}

/// Write `run` to `path`; returns the run id for JSON exports
pub fn export(run: &AutoTestResult, path: &Path, format: ExportFormat) -> Result<Option<String>> {
    let run_id = match format {
        ExportFormat::Json => {
            let document = ExportedRun::new(run.clone());
            let file = File::create(path)
                .with_context(|| format!("Failed to create {}", path.display()))?;
            serde_json::to_writer_pretty(BufWriter::new(file), &document)
                .context("Failed to write JSON export")?;
            Some(document.id)
        }
        ExportFormat::Csv => {
            let model_count = run.summary.model_results.len();
            let mut writer = csv::Writer::from_path(path)
                .with_context(|| format!("Failed to create {}", path.display()))?;
            writer.write_record(CSV_HEADER)?;
            for (index, result) in run.results.iter().enumerate() {
                writer.write_record(csv_record(index, model_count, result))?;
            }
            writer.flush()?;
            None
        }
    };

    info!("Exported results to {}", path.display());
    Ok(run_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::aggregate;
    use crate::models::{EvaluationScore, TestCase, TestResult, TokenUsage, WorkItem};
    use tempfile::tempdir;

    fn run() -> AutoTestResult {
        let case = TestCase::new("tc_1").with_input("topic", "tides");
        let item = WorkItem::new(case.clone(), "m1");
        let results = vec![TestResult::new(
            &item,
            "Model One",
            "The moon pulls the ocean.",
            EvaluationScore::fast("The moon pulls the ocean."),
            40,
            TokenUsage::new(10, 6),
        )];
        let summary = aggregate(&results, &["m1".to_string()]);
        AutoTestResult {
            prompt: "Explain {{topic}}".to_string(),
            test_cases: vec![case],
            results,
            summary,
        }
    }

    #[test]
    fn test_generate_run_id() {
        let id = generate_run_id();
        assert_eq!(id.len(), "20260101_120000_0000".len());
    }

    #[test]
    fn test_export_format() {
        assert_eq!(ExportFormat::from_str("JSON"), Some(ExportFormat::Json));
        assert_eq!(
            ExportFormat::from_extension(Path::new("out/run.csv")),
            Some(ExportFormat::Csv)
        );
        assert!(ExportFormat::from_extension(Path::new("run.txt")).is_none());
    }

    #[test]
    fn test_export_json() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("run.json");

        let id = export(&run(), &path, ExportFormat::Json).unwrap().unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let loaded: ExportedRun = serde_json::from_str(&content).unwrap();
        assert_eq!(loaded.id, id);
        assert_eq!(loaded.run.results.len(), 1);
        assert_eq!(loaded.run.summary.average_score, 75.0);
        assert_eq!(loaded.environment.tool_version, env!("CARGO_PKG_VERSION"));
    }

    #[test]
    fn test_export_csv() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("run.csv");

        assert!(export(&run(), &path, ExportFormat::Csv).unwrap().is_none());

        let mut reader = csv::Reader::from_path(&path).unwrap();
        let headers = reader.headers().unwrap().clone();
        assert_eq!(headers.len(), CSV_HEADER.len());

        let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 1);
        assert_eq!(&rows[0][3], "Model One");
        assert_eq!(&rows[0][10], "16");
    }
}
