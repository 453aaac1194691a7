//! Domain entities
//!
//! Core business types for a harvest audit run: the targets to visit, the
//! schedule rows extracted from the console, and the run-level report.

use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

/// One (dataset, platform, library) combination identifying a single console
/// page to audit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Target {
    pub dataset_id: u64,
    pub platform_id: u64,
    pub dataset_name: String,
    pub library_name: String,
}

impl Target {
    pub fn new(
        dataset_id: u64,
        platform_id: u64,
        dataset_name: impl Into<String>,
        library_name: impl Into<String>,
    ) -> Self {
        Self {
            dataset_id,
            platform_id,
            dataset_name: dataset_name.into(),
            library_name: library_name.into(),
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} - {} (dataset {}, platform {})",
            self.library_name, self.dataset_name, self.dataset_id, self.platform_id
        )
    }
}

/// Enabled state of a harvest schedule as shown by the console.
///
/// Unrecognized indicator text maps to `No`: a schedule whose state cannot be
/// read must never pass as healthy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnabledState {
    Yes,
    No,
    /// Was `No` at extraction time and this run successfully re-enabled it.
    AutoEnabled,
}

impl EnabledState {
    /// Normalize the raw status-cell text from the console.
    pub fn from_indicator(text: &str) -> Self {
        if text.trim().eq_ignore_ascii_case("yes") {
            Self::Yes
        } else {
            Self::No
        }
    }

    /// The literal string written to the report file.
    pub fn as_report_str(self) -> &'static str {
        match self {
            Self::Yes => "Yes",
            Self::No => "No",
            Self::AutoEnabled => "Yes (Auto-enabled)",
        }
    }

    pub fn is_enabled(self) -> bool {
        !matches!(self, Self::No)
    }
}

impl fmt::Display for EnabledState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_report_str())
    }
}

impl Serialize for EnabledState {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_report_str())
    }
}

/// The report file uses Python-style boolean literals for compatibility with
/// downstream consumers of the historical exports.
fn serialize_python_bool<S: Serializer>(value: &bool, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(if *value { "True" } else { "False" })
}

/// One row of the console's SUSHI schedule table, annotated with the library
/// and dataset the enclosing target identifies.
///
/// Field order matches the report column order exactly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScheduleRecord {
    pub library: String,
    pub dataset_name: String,
    pub schedule_id: String,
    pub report_type: String,
    pub vendor: String,
    pub frequency: String,
    pub recurring_until: String,
    /// Raw last-fetch cell text, preserved verbatim. May span multiple lines
    /// when the console embeds a fetch error message in the cell.
    pub last_fetch: String,
    pub enabled: EnabledState,
    #[serde(serialize_with = "serialize_python_bool")]
    pub has_error: bool,
}

impl ScheduleRecord {
    /// Derived once at extraction time and never recomputed.
    pub fn detect_error(last_fetch: &str) -> bool {
        last_fetch.to_lowercase().contains("error")
    }
}

/// Diagnostic note for a target (or a row on it) that could not be processed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureNote {
    pub dataset_id: u64,
    pub platform_id: u64,
    pub library_name: String,
    pub message: String,
}

impl FailureNote {
    pub fn for_target(target: &Target, message: impl Into<String>) -> Self {
        Self {
            dataset_id: target.dataset_id,
            platform_id: target.platform_id,
            library_name: target.library_name.clone(),
            message: message.into(),
        }
    }
}

impl fmt::Display for FailureNote {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[dataset {} / platform {} / {}] {}",
            self.dataset_id, self.platform_id, self.library_name, self.message
        )
    }
}

/// Everything that came out of processing one target.
///
/// A hard navigation/extraction failure yields zero records and a failure
/// note; remediation notes accumulate per affected row without suppressing
/// the row's extracted data.
#[derive(Debug, Clone)]
pub struct TargetOutcome {
    pub target: Target,
    pub records: Vec<ScheduleRecord>,
    pub failure: Option<FailureNote>,
    pub remediation_notes: Vec<FailureNote>,
}

impl TargetOutcome {
    pub fn success(target: Target, records: Vec<ScheduleRecord>) -> Self {
        Self {
            target,
            records,
            failure: None,
            remediation_notes: Vec::new(),
        }
    }

    pub fn failed(target: Target, message: impl Into<String>) -> Self {
        let failure = FailureNote::for_target(&target, message);
        Self {
            target,
            records: Vec::new(),
            failure: Some(failure),
            remediation_notes: Vec::new(),
        }
    }
}

/// Accumulated result of one full run: all extracted records in
/// target-processing then row order, plus diagnostic failure notes.
///
/// Append-only while the run loop is live; frozen afterwards. No
/// deduplication, no reordering, no cross-target aggregation.
#[derive(Debug, Default)]
pub struct RunReport {
    records: Vec<ScheduleRecord>,
    failures: Vec<FailureNote>,
}

impl RunReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one target's outcome into the report.
    pub fn absorb(&mut self, outcome: TargetOutcome) {
        self.records.extend(outcome.records);
        if let Some(failure) = outcome.failure {
            self.failures.push(failure);
        }
        self.failures.extend(outcome.remediation_notes);
    }

    pub fn records(&self) -> &[ScheduleRecord] {
        &self.records
    }

    pub fn failures(&self) -> &[FailureNote] {
        &self.failures
    }

    pub fn summary(&self) -> RunSummary {
        RunSummary {
            total_schedules: self.records.len(),
            schedules_with_errors: self.records.iter().filter(|r| r.has_error).count(),
            disabled_schedules: self
                .records
                .iter()
                .filter(|r| !r.enabled.is_enabled())
                .count(),
            failed_targets: self.failures.len(),
        }
    }
}

/// End-of-run totals, logged for operators and never written to the report
/// file itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub total_schedules: usize,
    pub schedules_with_errors: usize,
    pub disabled_schedules: usize,
    pub failed_targets: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, enabled: EnabledState, last_fetch: &str) -> ScheduleRecord {
        ScheduleRecord {
            library: "Alice Lloyd College".to_string(),
            dataset_name: "aca JSTOR".to_string(),
            schedule_id: id.to_string(),
            report_type: "TR_J1".to_string(),
            vendor: "JSTOR".to_string(),
            frequency: "Monthly".to_string(),
            recurring_until: "2026-12-31".to_string(),
            last_fetch: last_fetch.to_string(),
            enabled,
            has_error: ScheduleRecord::detect_error(last_fetch),
        }
    }

    #[test]
    fn enabled_state_normalizes_indicator_text() {
        assert_eq!(EnabledState::from_indicator("Yes"), EnabledState::Yes);
        assert_eq!(EnabledState::from_indicator("  yes "), EnabledState::Yes);
        assert_eq!(EnabledState::from_indicator("No"), EnabledState::No);
        // Unknown states must never be treated as healthy.
        assert_eq!(EnabledState::from_indicator("Paused"), EnabledState::No);
        assert_eq!(EnabledState::from_indicator(""), EnabledState::No);
    }

    #[test]
    fn enabled_state_report_literals() {
        assert_eq!(EnabledState::Yes.as_report_str(), "Yes");
        assert_eq!(EnabledState::No.as_report_str(), "No");
        assert_eq!(EnabledState::AutoEnabled.as_report_str(), "Yes (Auto-enabled)");
    }

    #[test]
    fn error_marker_detection_is_case_insensitive() {
        assert!(ScheduleRecord::detect_error("ERROR: 401 Unauthorized"));
        assert!(ScheduleRecord::detect_error("2026-08-01\nSushi Error (code 3030)"));
        assert!(!ScheduleRecord::detect_error("2026-08-01 Success"));
    }

    #[test]
    fn run_report_concatenates_in_absorb_order() {
        let t1 = Target::new(38772, 151, "aca JSTOR", "Alice Lloyd College");
        let t2 = Target::new(38772, 152, "aca JSTOR", "Berea College");

        let mut report = RunReport::new();
        report.absorb(TargetOutcome::success(
            t1,
            vec![record("101", EnabledState::Yes, "ok")],
        ));
        report.absorb(TargetOutcome::failed(t2.clone(), "table never rendered"));
        report.absorb(TargetOutcome::success(
            t2,
            vec![record("201", EnabledState::No, "Error: timeout")],
        ));

        let ids: Vec<&str> = report
            .records()
            .iter()
            .map(|r| r.schedule_id.as_str())
            .collect();
        assert_eq!(ids, vec!["101", "201"]);
        assert_eq!(report.failures().len(), 1);
        assert_eq!(report.failures()[0].platform_id, 152);

        let summary = report.summary();
        assert_eq!(summary.total_schedules, 2);
        assert_eq!(summary.schedules_with_errors, 1);
        assert_eq!(summary.disabled_schedules, 1);
        assert_eq!(summary.failed_targets, 1);
    }
}
