//! Chart models built from the daily summaries.
//!
//! A [`ChartPage`] describes what one report page shows, independent of how
//! it is drawn. Building pages is pure, so identical summaries always give
//! identical pages.

use std::collections::BTreeMap;

use chrono::NaiveDate;

use crate::models::{CalibrationSeries, DailyAbnormalSummary, DailyQcSummary};

pub const ABNORMAL_TITLE: &str = "Average % Abnormal Results per Analyte";
pub const QC_TITLE: &str = "QC Pass Rate Over Time";
pub const CALIBRATION_TITLE: &str = "Calibration Slope Drift Over Time";

// ---

/// One page of the report.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartPage {
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub chart: Chart,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Chart {
    /// One bar per category, in the given order.
    Bar(Vec<Bar>),
    /// Date-indexed lines with point markers.
    Line {
        series: Vec<LineSeries>,
        show_legend: bool,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Bar {
    pub label: String,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LineSeries {
    pub label: String,
    /// Points in ascending date order.
    pub points: Vec<(NaiveDate, f64)>,
}

impl ChartPage {
    /// True when there is nothing to plot; such pages get a placeholder.
    pub fn is_empty(&self) -> bool {
        // ---
        match &self.chart {
            Chart::Bar(bars) => bars.is_empty(),
            Chart::Line { series, .. } => series.iter().all(|s| s.points.is_empty()),
        }
    }
}

/// Page 1: mean daily abnormal percentage per analyte, analytes ascending.
///
/// Days where an analyte had no measured values carry no percentage and are
/// left out of that analyte's mean.
pub fn abnormal_by_analyte(summary: &[DailyAbnormalSummary]) -> ChartPage {
    // ---
    let mut means: BTreeMap<&str, (f64, usize)> = BTreeMap::new();
    for day in summary.iter().filter(|d| d.total_tests > 0) {
        let (sum, n) = means.entry(day.analyte_name.as_str()).or_default();
        *sum += day.abnormal_pct;
        *n += 1;
    }

    let bars = means
        .into_iter()
        .map(|(analyte, (sum, n))| Bar {
            label: analyte.to_string(),
            value: sum / n as f64,
        })
        .collect();

    ChartPage {
        title: ABNORMAL_TITLE.to_string(),
        x_label: "Analyte".to_string(),
        y_label: "% Abnormal".to_string(),
        chart: Chart::Bar(bars),
    }
}

/// Page 2: one point per QC day, connected in date order.
pub fn qc_pass_rate_over_time(summary: &[DailyQcSummary]) -> ChartPage {
    // ---
    let points = summary
        .iter()
        .filter(|d| d.total_runs > 0)
        .map(|d| (d.date, d.pass_rate_pct))
        .collect();

    ChartPage {
        title: QC_TITLE.to_string(),
        x_label: "Date".to_string(),
        y_label: "Pass Rate (%)".to_string(),
        chart: Chart::Line {
            series: vec![LineSeries {
                label: "QC pass rate".to_string(),
                points,
            }],
            show_legend: false,
        },
    }
}

/// Page 3: one slope line per analyzer/analyte pair, labelled in a legend.
///
/// Calibrations without a recorded slope produce no point.
pub fn calibration_drift_over_time(series: &[CalibrationSeries]) -> ChartPage {
    // ---
    let lines = series
        .iter()
        .map(|s| LineSeries {
            label: s.label(),
            points: s
                .points
                .iter()
                .filter_map(|p| p.entry.slope.map(|slope| (p.date, slope)))
                .collect(),
        })
        .collect();

    ChartPage {
        title: CALIBRATION_TITLE.to_string(),
        x_label: "Date".to_string(),
        y_label: "Slope".to_string(),
        chart: Chart::Line {
            series: lines,
            show_legend: true,
        },
    }
}
