use std::process::Command;

use anyhow::Result;

const BIN: &str = env!("CARGO_BIN_EXE_lab-report");

/// Credentials and location variables the binary reads.
const DB_VARS: [&str; 7] = [
    "LAB_DB_HOST",
    "LAB_DB_PORT",
    "LAB_DB_USER",
    "LAB_DB_PASSWORD",
    "LAB_DB_NAME",
    "LAB_REPORT_PATH",
    "LAB_REPORT_CONFIG",
];

#[test]
fn missing_credentials_exit_non_zero() -> Result<()> {
    // ---
    let out_dir = tempfile::tempdir()?;
    let mut cmd = Command::new(BIN);
    for var in DB_VARS {
        cmd.env_remove(var);
    }
    let output = cmd.current_dir(out_dir.path()).output()?;

    assert!(!output.status.success(), "run without credentials succeeded");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("LAB_DB_USER"), "unexpected stderr: {}", stderr);
    Ok(())
}

#[test]
fn unreachable_database_leaves_no_report() -> Result<()> {
    // ---
    let out_dir = tempfile::tempdir()?;
    let report = out_dir.path().join("reports").join("lab_daily_report.pdf");

    let output = Command::new(BIN)
        .current_dir(out_dir.path())
        .env_remove("LAB_REPORT_CONFIG")
        .env("LAB_DB_HOST", "127.0.0.1")
        .env("LAB_DB_PORT", "1")
        .env("LAB_DB_USER", "lab")
        .env("LAB_DB_PASSWORD", "secret")
        .env("LAB_REPORT_PATH", &report)
        .output()?;

    assert!(!output.status.success());
    assert!(!report.exists(), "partial report written");
    Ok(())
}

/// Full run against a live `clinical_lab` database.
///
/// Only runs when `LAB_DB_USER` is set; point the usual `LAB_DB_*` variables
/// at a seeded database.
#[test]
fn live_database_report_generated() -> Result<()> {
    // ---
    if std::env::var("LAB_DB_USER").is_err() {
        eprintln!("LAB_DB_USER not set, skipping live database test");
        return Ok(());
    }

    let out_dir = tempfile::tempdir()?;
    let report = out_dir.path().join("lab_daily_report.pdf");

    let output = Command::new(BIN)
        .env("LAB_REPORT_PATH", &report)
        .output()?;

    assert!(
        output.status.success(),
        "run failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Loading data from MySQL..."));
    assert!(stdout.contains("PDF report saved at:"));

    let bytes = std::fs::read(&report)?;
    assert_eq!(&bytes[0..4], b"%PDF");
    Ok(())
}
