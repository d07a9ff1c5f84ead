//! Report assembly: chart pages in, one PDF document out.
//!
//! The document always has exactly three pages, in this order:
//! 1. average % abnormal results per analyte (bar chart)
//! 2. QC pass rate over time (line chart)
//! 3. calibration slope drift over time (one line per analyzer/analyte)
//!
//! A page with no data still appears, with a "No data available" placeholder.
//! The document is complete or absent: it is rendered fully in memory and
//! then moved over the output path in one step.

use std::{
    io::Write,
    path::{Path, PathBuf},
};

use tempfile::NamedTempFile;

use crate::error::ReportError;
use crate::models::{CalibrationSeries, DailyAbnormalSummary, DailyQcSummary};

pub mod charts;
mod pdf;

pub use charts::ChartPage;
use pdf::render_pdf;

// ---

/// Build the three report pages from the run's summaries.
pub fn build_pages(
    abnormal: &[DailyAbnormalSummary],
    qc: &[DailyQcSummary],
    calibration: &[CalibrationSeries],
) -> Vec<ChartPage> {
    // ---
    vec![
        charts::abnormal_by_analyte(abnormal),
        charts::qc_pass_rate_over_time(qc),
        charts::calibration_drift_over_time(calibration),
    ]
}

/// Render `pages` and write them to `path`, replacing any existing file.
///
/// Missing parent directories are created. If rendering fails nothing is
/// written; if writing fails the previous file (if any) is left untouched.
pub fn write_report(pages: &[ChartPage], path: &Path) -> Result<(), ReportError> {
    // ---
    let bytes = render_pdf(pages)?;

    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let shown = path.display().to_string();

    std::fs::create_dir_all(&dir).map_err(|e| ReportError::io(&shown, e))?;

    let mut tmp = NamedTempFile::new_in(&dir).map_err(|e| ReportError::io(&shown, e))?;
    tmp.write_all(&bytes)
        .and_then(|_| tmp.as_file().sync_all())
        .map_err(|e| ReportError::io(&shown, e))?;
    tmp.persist(path)
        .map_err(|e| ReportError::io(&shown, e.error))?;

    tracing::info!("Wrote {} bytes to {}", bytes.len(), shown);
    Ok(())
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use chrono::NaiveDate;

    fn qc_day(d: u32, total: usize, pass: usize) -> DailyQcSummary {
        // ---
        DailyQcSummary {
            date: NaiveDate::from_ymd_opt(2024, 5, d).unwrap(),
            total_runs: total,
            pass_runs: pass,
            pass_rate_pct: crate::analysis::percentage(pass, total),
        }
    }

    #[test]
    fn test_three_pages_in_fixed_order() {
        // ---
        let pages = build_pages(&[], &[qc_day(1, 4, 3)], &[]);

        let titles: Vec<&str> = pages.iter().map(|p| p.title.as_str()).collect();
        assert_eq!(
            titles,
            vec![
                "Average % Abnormal Results per Analyte",
                "QC Pass Rate Over Time",
                "Calibration Slope Drift Over Time",
            ]
        );
    }

    #[test]
    fn test_empty_summaries_still_give_three_pages() {
        // ---
        let pages = build_pages(&[], &[], &[]);

        assert_eq!(pages.len(), 3);
        assert!(pages.iter().all(ChartPage::is_empty));
    }

    #[test]
    fn test_write_creates_dirs_and_overwrites() {
        // ---
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reports").join("lab_daily_report.pdf");
        let pages = build_pages(&[], &[qc_day(1, 4, 3), qc_day(2, 2, 1)], &[]);

        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, b"stale").unwrap();

        write_report(&pages, &path).unwrap();

        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(&bytes[0..4], b"%PDF");

        // only the report itself is left in the directory
        let entries = std::fs::read_dir(path.parent().unwrap()).unwrap().count();
        assert_eq!(entries, 1);
    }

    #[test]
    fn test_render_failure_writes_nothing() {
        // ---
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.pdf");

        let err = write_report(&[], &path).unwrap_err();

        assert!(matches!(err, ReportError::Render(_)));
        assert!(!path.exists());
    }
}
