//! Application entry point for the `lab-report` clinical lab quality report.
//!
//! This binary runs the full report sequence once and exits:
//! - Loading configuration from a TOML file, environment variables or `.env`
//! - Initializing structured logging/tracing
//! - Loading test results, QC logs and calibration logs from MySQL
//! - Computing abnormal rates, QC pass rates and calibration drift
//! - Writing a three-page PDF report to the configured output path
//!
//! # Environment Variables
//! - `LAB_DB_USER`, `LAB_DB_PASSWORD` (**required**) – database credentials
//! - `LAB_DB_HOST`, `LAB_DB_PORT`, `LAB_DB_NAME` (optional) – database location
//! - `LAB_REPORT_PATH` (optional) – output PDF path
//! - `LAB_REPORT_CONFIG` (optional) – TOML config file
//! - `LAB_LOG_LEVEL` (optional) – log verbosity (default: `info`)
//! - `LAB_SPAN_EVENTS` (optional) – span event mode for tracing
//!
//! Progress messages go to stdout; diagnostics go to stderr. Any failure
//! exits non-zero without leaving a partial report behind.
use std::env;

use anyhow::{Context, Result};
use dotenvy::dotenv;
use is_terminal::IsTerminal;
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::fmt::format::FmtSpan;

mod analysis;
mod config;
mod error;
mod loader;
mod models;
mod pipeline;
mod report;

pub use config::Config;

use models::TestResult;

/// Number of joined test-result rows echoed before the report is built.
const PREVIEW_ROWS: usize = 5;

// ---

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // ---
    dotenv().ok();
    init_tracing();

    let cfg = config::load_from_env()?;
    cfg.log_config();

    println!("Loading data from MySQL...");
    let data = loader::load_all(&cfg)
        .await
        .with_context(|| format!("Failed to load data from database '{}'", cfg.database))?;

    println!("Sample Data:");
    print_preview(&data.test_results);

    println!("\nGenerating PDF report...");
    pipeline::generate_report(&data, &cfg.output_path).with_context(|| {
        format!(
            "Failed to generate report at '{}'",
            cfg.output_path.display()
        )
    })?;

    println!("PDF report saved at: {}", cfg.output_path.display());
    println!("Done!");
    Ok(())
}

/// Print the first few joined test-result rows as a plain table.
fn print_preview(rows: &[TestResult]) {
    // ---
    if rows.is_empty() {
        println!("  (no test results)");
        return;
    }

    println!(
        "  {:<19}  {:<10}  {:<12}  {:<14}  {:>10}  {:>10}  {:>10}",
        "sample_date", "analyzer", "sample_id", "analyte", "value", "ref_low", "ref_high"
    );
    for r in rows.iter().take(PREVIEW_ROWS) {
        println!(
            "  {:<19}  {:<10}  {:<12}  {:<14}  {:>10}  {:>10}  {:>10}",
            r.sample_date.format("%Y-%m-%d %H:%M:%S").to_string(),
            r.analyzer_id,
            r.sample_id,
            r.analyte_name,
            fmt_opt(r.result_value),
            fmt_opt(r.reference_low),
            fmt_opt(r.reference_high),
        );
    }
}

fn fmt_opt(v: Option<f64>) -> String {
    v.map_or_else(|| "-".to_string(), |v| v.to_string())
}

// ---

/// Initialize the global tracing subscriber for structured logging.
///
/// This function configures the [`tracing_subscriber`] with:
/// - Log target, file, and line number output enabled, written to stderr
/// - Color output controlled by TTY detection and `FORCE_COLOR` env var:
///   - `FORCE_COLOR=1|true|yes`: force colors on
///   - `FORCE_COLOR=0|false|no`: force colors off
///   - unset or other values: auto-detect TTY
/// - Span event emission mode controlled by the `LAB_SPAN_EVENTS` env var:
///   - `"full"`       : emit ENTER, EXIT, and CLOSE events with timing
///   - `"enter_exit"` : emit ENTER and EXIT only
///   - unset or other values: emit CLOSE events only (default)
/// - Log level controlled by `RUST_LOG`, else the `LAB_LOG_LEVEL` env var
///
/// Call once at startup before any logging macros are invoked.
fn init_tracing() {
    // ---
    let span_events = match env::var("LAB_SPAN_EVENTS").as_deref() {
        Ok("full") => FmtSpan::FULL,
        Ok("enter_exit") => FmtSpan::ENTER | FmtSpan::EXIT,
        _ => FmtSpan::CLOSE,
    };

    let use_color = match env::var("FORCE_COLOR").as_deref() {
        Ok("1") | Ok("true") | Ok("yes") => true,
        Ok("0") | Ok("false") | Ok("no") => false,
        _ => std::io::stderr().is_terminal(),
    };

    // Use RUST_LOG if available, otherwise fall back to LAB_LOG_LEVEL
    let env_filter = if env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        let level = match env::var("LAB_LOG_LEVEL").ok().as_deref() {
            Some("trace") => "trace",
            Some("debug") => "debug",
            Some("info") => "info",
            Some("warn") => "warn",
            Some("error") => "error",
            _ => "info",
        };
        EnvFilter::new(format!("{level},sqlx::query=warn"))
    };

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .with_span_events(span_events)
        .with_env_filter(env_filter)
        .with_ansi(use_color)
        .compact()
        .init();
}
