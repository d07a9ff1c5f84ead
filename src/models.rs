//! Data models for the lab report pipeline.
//!
//! Row types mirror what the loader reads from MySQL. Summary types are
//! derived fresh on every run and never persisted.

use chrono::{NaiveDate, NaiveDateTime};

// ---

/// One test result joined with its sample metadata.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct TestResult {
    // ---
    pub sample_date: NaiveDateTime,
    pub analyzer_id: String,
    pub sample_id: String,
    pub analyte_name: String,
    pub result_value: Option<f64>,
    pub reference_low: Option<f64>,
    pub reference_high: Option<f64>,
}

/// One QC run. Only the exact status `PASS` counts as a pass.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct QcLogEntry {
    // ---
    pub run_datetime: NaiveDateTime,
    pub status: Option<String>,
}

/// One calibration event for an analyzer/analyte pair.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct CalibrationLogEntry {
    // ---
    pub analyzer_id: String,
    pub analyte_name: String,
    pub calib_datetime: NaiveDateTime,
    pub slope: Option<f64>,
}

/// The three datasets a run works on.
#[derive(Debug, Clone, Default)]
pub struct Datasets {
    pub test_results: Vec<TestResult>,
    pub qc_logs: Vec<QcLogEntry>,
    pub calibration_logs: Vec<CalibrationLogEntry>,
}

/// A test result with its abnormal flag attached.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassifiedResult {
    pub result: TestResult,
    pub is_abnormal: bool,
}

/// Abnormal-result statistics for one (date, analyte) group.
#[derive(Debug, Clone, PartialEq)]
pub struct DailyAbnormalSummary {
    pub date: NaiveDate,
    pub analyte_name: String,
    pub total_tests: usize,
    pub abnormal_tests: usize,
    pub abnormal_pct: f64,
}

/// QC pass-rate statistics for one day.
#[derive(Debug, Clone, PartialEq)]
pub struct DailyQcSummary {
    pub date: NaiveDate,
    pub total_runs: usize,
    pub pass_runs: usize,
    pub pass_rate_pct: f64,
}

/// A calibration entry with the calendar date used for ordering and plotting.
#[derive(Debug, Clone, PartialEq)]
pub struct DatedCalibration {
    pub entry: CalibrationLogEntry,
    pub date: NaiveDate,
}

/// Time-ordered calibrations of one analyzer/analyte pair.
#[derive(Debug, Clone, PartialEq)]
pub struct CalibrationSeries {
    pub analyzer_id: String,
    pub analyte_name: String,
    pub points: Vec<DatedCalibration>,
}

impl TestResult {
    /// Whether the value lies outside the reference interval.
    ///
    /// Fails closed: a missing value or a missing bound cannot be evaluated
    /// and is reported as not abnormal.
    pub fn is_abnormal(&self) -> bool {
        // ---
        match (self.result_value, self.reference_low, self.reference_high) {
            (Some(value), Some(low), Some(high)) => value < low || value > high,
            _ => false,
        }
    }
}

impl QcLogEntry {
    pub fn is_pass(&self) -> bool {
        self.status.as_deref() == Some("PASS")
    }
}

impl CalibrationSeries {
    /// Legend label, `{analyzer_id}-{analyte_name}`.
    pub fn label(&self) -> String {
        format!("{}-{}", self.analyzer_id, self.analyte_name)
    }
}
