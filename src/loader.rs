//! Dataset loading from the `clinical_lab` MySQL database.
//!
//! Each dataset is read over its own connection, which is closed whether or
//! not the query succeeds. Timestamp columns are cast to `DATETIME` in SQL so
//! they arrive as [`chrono::NaiveDateTime`]; identifiers arrive as text and
//! measurements as `DOUBLE`.
//!
//! Rows whose grouping key or timestamp is NULL (or is not a valid date, which
//! `CAST` also turns into NULL) cannot be placed on a day or a series, so the
//! queries leave them out instead of failing the run.

use sqlx::mysql::{MySqlConnectOptions, MySqlRow};
use sqlx::{ConnectOptions, Connection, FromRow};

use crate::error::ReportError;
use crate::models::{CalibrationLogEntry, Datasets, QcLogEntry, TestResult};
use crate::Config;

const TEST_RESULTS_SQL: &str = r#"
    SELECT
        CAST(s.sample_date AS DATETIME)  AS sample_date,
        COALESCE(CAST(s.analyzer_id AS CHAR), '') AS analyzer_id,
        CAST(r.sample_id AS CHAR)        AS sample_id,
        CAST(r.analyte_name AS CHAR)     AS analyte_name,
        CAST(r.result_value AS DOUBLE)   AS result_value,
        CAST(r.reference_low AS DOUBLE)  AS reference_low,
        CAST(r.reference_high AS DOUBLE) AS reference_high
    FROM test_results r
    JOIN samples s ON r.sample_id = s.sample_id
    WHERE CAST(s.sample_date AS DATETIME) IS NOT NULL
      AND r.analyte_name IS NOT NULL
"#;

const QC_LOGS_SQL: &str = r#"
    SELECT
        CAST(run_datetime AS DATETIME) AS run_datetime,
        CAST(status AS CHAR)           AS status
    FROM qc_logs
    WHERE CAST(run_datetime AS DATETIME) IS NOT NULL
"#;

const CALIBRATION_LOGS_SQL: &str = r#"
    SELECT
        CAST(analyzer_id AS CHAR)        AS analyzer_id,
        CAST(analyte_name AS CHAR)       AS analyte_name,
        CAST(calib_datetime AS DATETIME) AS calib_datetime,
        CAST(slope AS DOUBLE)            AS slope
    FROM calibration_logs
    WHERE analyzer_id IS NOT NULL
      AND analyte_name IS NOT NULL
      AND CAST(calib_datetime AS DATETIME) IS NOT NULL
"#;

// ---

/// Test results joined with their sample metadata.
pub async fn load_test_results(cfg: &Config) -> Result<Vec<TestResult>, ReportError> {
    fetch_all(cfg, "test_results", TEST_RESULTS_SQL).await
}

pub async fn load_qc_logs(cfg: &Config) -> Result<Vec<QcLogEntry>, ReportError> {
    fetch_all(cfg, "qc_logs", QC_LOGS_SQL).await
}

pub async fn load_calibration_logs(cfg: &Config) -> Result<Vec<CalibrationLogEntry>, ReportError> {
    fetch_all(cfg, "calibration_logs", CALIBRATION_LOGS_SQL).await
}

/// Load all three datasets, one after the other.
pub async fn load_all(cfg: &Config) -> Result<Datasets, ReportError> {
    // ---
    Ok(Datasets {
        test_results: load_test_results(cfg).await?,
        qc_logs: load_qc_logs(cfg).await?,
        calibration_logs: load_calibration_logs(cfg).await?,
    })
}

fn connect_options(cfg: &Config) -> MySqlConnectOptions {
    // ---
    MySqlConnectOptions::new()
        .host(&cfg.host)
        .port(cfg.port)
        .username(&cfg.user)
        .password(&cfg.password)
        .database(&cfg.database)
}

/// Open a connection, run one query, and close the connection again.
async fn fetch_all<T>(
    cfg: &Config,
    dataset: &'static str,
    sql: &'static str,
) -> Result<Vec<T>, ReportError>
where
    T: for<'r> FromRow<'r, MySqlRow> + Send + Unpin,
{
    // ---
    tracing::debug!("Loading {} from {}:{}/{}", dataset, cfg.host, cfg.port, cfg.database);

    let mut conn = connect_options(cfg)
        .connect()
        .await
        .map_err(|e| ReportError::data_access(dataset, e))?;

    let rows = sqlx::query_as::<_, T>(sql).fetch_all(&mut conn).await;

    // Release the connection before looking at the query outcome
    if let Err(e) = conn.close().await {
        tracing::warn!("Failed to close connection after loading {}: {}", dataset, e);
    }

    let rows = rows.map_err(|e| ReportError::data_access(dataset, e))?;
    tracing::info!("Loaded {} rows from {}", rows.len(), dataset);
    Ok(rows)
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use std::path::PathBuf;

    fn test_config() -> Config {
        // ---
        Config {
            host: "127.0.0.1".to_string(),
            // nothing listens on port 1
            port: 1,
            user: "lab".to_string(),
            password: "secret".to_string(),
            database: "clinical_lab".to_string(),
            output_path: PathBuf::from("unused.pdf"),
        }
    }

    #[test]
    fn test_queries_read_expected_tables() {
        // ---
        assert!(TEST_RESULTS_SQL.contains("JOIN samples s ON r.sample_id = s.sample_id"));
        assert!(QC_LOGS_SQL.contains("FROM qc_logs"));
        assert!(CALIBRATION_LOGS_SQL.contains("FROM calibration_logs"));
    }

    #[test]
    fn test_queries_skip_rows_without_keys() {
        // ---
        // every non-Option field of the row types is either filtered or defaulted
        assert!(TEST_RESULTS_SQL.contains("WHERE CAST(s.sample_date AS DATETIME) IS NOT NULL"));
        assert!(TEST_RESULTS_SQL.contains("r.analyte_name IS NOT NULL"));
        assert!(TEST_RESULTS_SQL.contains("COALESCE(CAST(s.analyzer_id AS CHAR), '')"));
        assert!(QC_LOGS_SQL.contains("WHERE CAST(run_datetime AS DATETIME) IS NOT NULL"));
        for key in [
            "analyzer_id IS NOT NULL",
            "analyte_name IS NOT NULL",
            "CAST(calib_datetime AS DATETIME) IS NOT NULL",
        ] {
            assert!(CALIBRATION_LOGS_SQL.contains(key), "calibration query lacks {key}");
        }
    }

    #[tokio::test]
    async fn test_connection_failure_is_data_access_error() {
        // ---
        let err = load_qc_logs(&test_config()).await.unwrap_err();

        match err {
            ReportError::DataAccess { dataset, .. } => assert_eq!(dataset, "qc_logs"),
            other => panic!("unexpected error: {other}"),
        }
    }
}
