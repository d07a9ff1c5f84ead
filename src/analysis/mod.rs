//! Analytical transforms over the loaded datasets.
//!
//! Each transform is a pure function of its input. Grouped outputs are
//! emitted in ascending key order.

mod abnormal;
mod calibration;
mod qc;

pub use abnormal::{daily_abnormal_trend, detect_abnormal};
pub use calibration::{calibration_drift, calibration_series};
pub use qc::qc_pass_rate;

// ---

/// `part / total * 100`, defined as 0.0 when `total` is zero.
pub(crate) fn percentage(part: usize, total: usize) -> f64 {
    // ---
    if total == 0 {
        0.0
    } else {
        part as f64 / total as f64 * 100.0
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;

    #[test]
    fn test_percentage() {
        // ---
        assert_eq!(percentage(3, 4), 75.0);
        assert_eq!(percentage(0, 5), 0.0);
        assert_eq!(percentage(5, 5), 100.0);
    }

    #[test]
    fn test_percentage_zero_total() {
        // ---
        assert_eq!(percentage(0, 0), 0.0);
    }
}
