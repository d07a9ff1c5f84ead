//! Orchestration of one report run over in-memory datasets.
//!
//! Loading happens before this point and writing happens at the end; in
//! between everything is pure, so the pipeline can be driven from tests with
//! hand-built datasets.

use std::path::Path;

use crate::analysis;
use crate::error::ReportError;
use crate::models::Datasets;
use crate::report::{self, ChartPage};

// ---

/// Run the three analyses and turn their summaries into report pages.
pub fn build_report(data: &Datasets) -> Result<Vec<ChartPage>, ReportError> {
    // ---
    let classified = analysis::detect_abnormal(&data.test_results);
    let abnormal = analysis::daily_abnormal_trend(&classified)?;
    tracing::info!("Abnormal trend: {} daily groups", abnormal.len());

    let qc = analysis::qc_pass_rate(&data.qc_logs);
    tracing::info!("QC pass rate: {} days", qc.len());

    let series = analysis::calibration_series(analysis::calibration_drift(&data.calibration_logs));
    tracing::info!("Calibration drift: {} analyzer/analyte series", series.len());

    Ok(report::build_pages(&abnormal, &qc, &series))
}

/// Analyze `data` and write the finished PDF to `output_path`.
pub fn generate_report(data: &Datasets, output_path: &Path) -> Result<(), ReportError> {
    // ---
    let pages = build_report(data)?;
    report::write_report(&pages, output_path)
}
