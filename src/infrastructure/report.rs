//! Report writer
//!
//! Serializes a finished [`RunReport`] to one timestamped CSV file per run.
//! Columns are fixed: library, dataset_name, schedule_id, report_type,
//! vendor, frequency, recurring_until, last_fetch, enabled, has_error.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Local;
use tracing::info;

use crate::domain::RunReport;

const COLUMNS: [&str; 10] = [
    "library",
    "dataset_name",
    "schedule_id",
    "report_type",
    "vendor",
    "frequency",
    "recurring_until",
    "last_fetch",
    "enabled",
    "has_error",
];

pub struct ReportWriter {
    output_dir: PathBuf,
}

impl ReportWriter {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    /// Write the report, returning the path of the created file.
    pub fn write(&self, report: &RunReport) -> Result<PathBuf> {
        let filename = format!(
            "SUSHI_harvest_status_{}.csv",
            Local::now().format("%Y%m%d_%H%M%S")
        );
        let path = self.output_dir.join(filename);
        self.write_to(report, &path)?;

        info!(
            "Report saved to {:?} ({} records)",
            path,
            report.records().len()
        );
        Ok(path)
    }

    fn write_to(&self, report: &RunReport, path: &Path) -> Result<()> {
        std::fs::create_dir_all(&self.output_dir).with_context(|| {
            format!("failed to create output directory {:?}", self.output_dir)
        })?;

        // Header is written explicitly so an all-failures run still yields a
        // well-formed (if empty) report.
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_path(path)
            .with_context(|| format!("failed to create report file {path:?}"))?;

        writer
            .write_record(COLUMNS)
            .context("failed to write report header")?;

        for record in report.records() {
            writer
                .serialize(record)
                .context("failed to write report row")?;
        }

        writer.flush().context("failed to flush report file")?;
        Ok(())
    }
}
