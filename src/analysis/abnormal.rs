//! Abnormal detection and the daily abnormal-rate trend.

use std::collections::BTreeMap;

use chrono::NaiveDate;

use super::percentage;
use crate::error::ReportError;
use crate::models::{ClassifiedResult, DailyAbnormalSummary, TestResult};

// ---

/// Attach `is_abnormal` to every test result, preserving input order.
pub fn detect_abnormal(results: &[TestResult]) -> Vec<ClassifiedResult> {
    // ---
    results
        .iter()
        .map(|r| ClassifiedResult {
            result: r.clone(),
            is_abnormal: r.is_abnormal(),
        })
        .collect()
}

#[derive(Default)]
struct Tally {
    total: usize,
    abnormal: usize,
}

/// Group classified results by (sample calendar date, analyte) and compute
/// the share of abnormal results in each group.
///
/// Rows without a result value do not count toward `total_tests`. A value
/// that is not a finite number is rejected.
pub fn daily_abnormal_trend(
    classified: &[ClassifiedResult],
) -> Result<Vec<DailyAbnormalSummary>, ReportError> {
    // ---
    let mut groups: BTreeMap<(NaiveDate, String), Tally> = BTreeMap::new();

    for row in classified {
        let r = &row.result;
        let tally = groups
            .entry((r.sample_date.date(), r.analyte_name.clone()))
            .or_default();

        let Some(value) = r.result_value else {
            continue;
        };
        if !value.is_finite() {
            return Err(ReportError::Transform(format!(
                "sample {} analyte {} has non-finite result value {}",
                r.sample_id, r.analyte_name, value
            )));
        }

        tally.total += 1;
        if row.is_abnormal {
            tally.abnormal += 1;
        }
    }

    let summary: Vec<DailyAbnormalSummary> = groups
        .into_iter()
        .map(|((date, analyte_name), t)| DailyAbnormalSummary {
            date,
            analyte_name,
            total_tests: t.total,
            abnormal_tests: t.abnormal,
            abnormal_pct: percentage(t.abnormal, t.total),
        })
        .collect();

    tracing::debug!("Abnormal trend: {} (date, analyte) groups", summary.len());
    Ok(summary)
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;

    fn result_at(day: u32, analyte: &str, value: Option<f64>, low: f64, high: f64) -> TestResult {
        // ---
        TestResult {
            sample_date: NaiveDate::from_ymd_opt(2024, 1, day)
                .unwrap()
                .and_hms_opt(9, 15, 0)
                .unwrap(),
            analyzer_id: "A1".to_string(),
            sample_id: format!("S-{day}-{analyte}"),
            analyte_name: analyte.to_string(),
            result_value: value,
            reference_low: Some(low),
            reference_high: Some(high),
        }
    }

    #[test]
    fn test_detect_preserves_order_and_flags() {
        // ---
        let input = vec![
            result_at(1, "Glucose", Some(2.0), 3.9, 5.5),
            result_at(1, "Glucose", Some(4.0), 3.9, 5.5),
            result_at(1, "Na", Some(150.0), 135.0, 145.0),
        ];

        let out = detect_abnormal(&input);

        assert_eq!(out.len(), 3);
        assert_eq!(
            out.iter().map(|c| c.is_abnormal).collect::<Vec<_>>(),
            vec![true, false, true]
        );
        for (c, r) in out.iter().zip(&input) {
            assert_eq!(&c.result, r);
        }
    }

    #[test]
    fn test_one_of_three_glucose_abnormal() {
        // ---
        let input = vec![
            result_at(5, "Glucose", Some(3.1), 3.9, 5.5),
            result_at(5, "Glucose", Some(4.4), 3.9, 5.5),
            result_at(5, "Glucose", Some(5.0), 3.9, 5.5),
        ];

        let summary = daily_abnormal_trend(&detect_abnormal(&input)).unwrap();

        assert_eq!(summary.len(), 1);
        let s = &summary[0];
        assert_eq!(s.date, NaiveDate::from_ymd_opt(2024, 1, 5).unwrap());
        assert_eq!(s.analyte_name, "Glucose");
        assert_eq!(s.total_tests, 3);
        assert_eq!(s.abnormal_tests, 1);
        assert!((s.abnormal_pct - 33.33).abs() < 0.01);
    }

    #[test]
    fn test_groups_by_date_and_analyte_in_key_order() {
        // ---
        let input = vec![
            result_at(2, "Na", Some(140.0), 135.0, 145.0),
            result_at(1, "Na", Some(130.0), 135.0, 145.0),
            result_at(2, "Glucose", Some(9.0), 3.9, 5.5),
            result_at(1, "Na", Some(141.0), 135.0, 145.0),
        ];

        let summary = daily_abnormal_trend(&detect_abnormal(&input)).unwrap();

        let keys: Vec<(u32, &str)> = summary
            .iter()
            .map(|s| (chrono::Datelike::day(&s.date), s.analyte_name.as_str()))
            .collect();
        assert_eq!(keys, vec![(1, "Na"), (2, "Glucose"), (2, "Na")]);

        for s in &summary {
            assert!(s.abnormal_tests <= s.total_tests);
            assert!((0.0..=100.0).contains(&s.abnormal_pct));
        }
        assert_eq!(summary[0].total_tests, 2);
        assert_eq!(summary[0].abnormal_pct, 50.0);
    }

    #[test]
    fn test_missing_values_not_counted() {
        // ---
        let input = vec![
            result_at(3, "K", None, 3.5, 5.1),
            result_at(3, "K", Some(6.0), 3.5, 5.1),
            result_at(4, "K", None, 3.5, 5.1),
        ];

        let summary = daily_abnormal_trend(&detect_abnormal(&input)).unwrap();

        assert_eq!(summary.len(), 2);
        assert_eq!(summary[0].total_tests, 1);
        assert_eq!(summary[0].abnormal_pct, 100.0);
        // A group made only of missing values has a zero denominator
        assert_eq!(summary[1].total_tests, 0);
        assert_eq!(summary[1].abnormal_pct, 0.0);
    }

    #[test]
    fn test_non_finite_value_rejected() {
        // ---
        let input = vec![result_at(1, "Glucose", Some(f64::NAN), 3.9, 5.5)];

        let err = daily_abnormal_trend(&detect_abnormal(&input)).unwrap_err();
        assert!(matches!(err, ReportError::Transform(_)));
    }

    #[test]
    fn test_empty_input() {
        // ---
        assert!(detect_abnormal(&[]).is_empty());
        assert!(daily_abnormal_trend(&[]).unwrap().is_empty());
    }
}
