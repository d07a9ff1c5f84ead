//! Calibration drift ordering.

use crate::models::{CalibrationLogEntry, CalibrationSeries, DatedCalibration};

// ---

/// Attach the calendar date to each calibration and sort by
/// (analyzer, analyte, date). The sort is stable, so entries that tie on all
/// three keys keep their input order.
pub fn calibration_drift(logs: &[CalibrationLogEntry]) -> Vec<DatedCalibration> {
    // ---
    let mut ordered: Vec<DatedCalibration> = logs
        .iter()
        .map(|entry| DatedCalibration {
            date: entry.calib_datetime.date(),
            entry: entry.clone(),
        })
        .collect();

    ordered.sort_by(|a, b| {
        (&a.entry.analyzer_id, &a.entry.analyte_name, a.date).cmp(&(
            &b.entry.analyzer_id,
            &b.entry.analyte_name,
            b.date,
        ))
    });
    ordered
}

/// Split ordered calibrations into one series per (analyzer, analyte) pair.
///
/// Expects the output of [`calibration_drift`]; series come out in ascending
/// key order with points in date order.
pub fn calibration_series(ordered: Vec<DatedCalibration>) -> Vec<CalibrationSeries> {
    // ---
    let mut series: Vec<CalibrationSeries> = Vec::new();

    for point in ordered {
        match series.last_mut() {
            Some(s)
                if s.analyzer_id == point.entry.analyzer_id
                    && s.analyte_name == point.entry.analyte_name =>
            {
                s.points.push(point);
            }
            _ => series.push(CalibrationSeries {
                analyzer_id: point.entry.analyzer_id.clone(),
                analyte_name: point.entry.analyte_name.clone(),
                points: vec![point],
            }),
        }
    }
    series
}
