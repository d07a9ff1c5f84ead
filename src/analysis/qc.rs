//! Daily QC pass rate.

use std::collections::BTreeMap;

use chrono::NaiveDate;

use super::percentage;
use crate::models::{DailyQcSummary, QcLogEntry};

// ---

/// Group QC runs by calendar date and compute the pass rate of each day.
///
/// Runs with no recorded status are left out of `total_runs`. Empty input
/// yields an empty summary.
pub fn qc_pass_rate(logs: &[QcLogEntry]) -> Vec<DailyQcSummary> {
    // ---
    let mut days: BTreeMap<NaiveDate, (usize, usize)> = BTreeMap::new();

    for entry in logs {
        let (total, pass) = days.entry(entry.run_datetime.date()).or_default();
        if entry.status.is_none() {
            continue;
        }
        *total += 1;
        if entry.is_pass() {
            *pass += 1;
        }
    }

    days.into_iter()
        .map(|(date, (total_runs, pass_runs))| DailyQcSummary {
            date,
            total_runs,
            pass_runs,
            pass_rate_pct: percentage(pass_runs, total_runs),
        })
        .collect()
}
