//! Configuration loader for the `lab-report` pipeline.
//!
//! This module centralizes all runtime configuration values and their defaults.
//! Values come from an optional TOML file (named by `LAB_REPORT_CONFIG`) and
//! from environment variables (with optional `.env` file support provided by
//! the caller). Environment variables win over the file; defaults fill the rest.
use std::{env, fs, path::PathBuf};

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;

const DEFAULT_HOST: &str = "localhost";
const DEFAULT_PORT: u16 = 3306;
const DEFAULT_DATABASE: &str = "clinical_lab";
const DEFAULT_OUTPUT_PATH: &str = "reports/lab_daily_report.pdf";

/// Read an optional environment variable, treating an empty value as unset.
macro_rules! optional_env {
    ($var_name:expr) => {
        env::var($var_name).ok().filter(|v| !v.is_empty())
    };
}

/// Parse an optional port environment variable.
macro_rules! parse_env_u16 {
    ($var_name:expr) => {
        optional_env!($var_name)
            .map(|v| v.parse::<u16>())
            .transpose()
            .map_err(|e| anyhow!("Invalid {}: {}", $var_name, e))?
    };
}

/// Strongly typed application configuration.
///
/// All fields are immutable after loading, ensuring a consistent configuration
/// snapshot for the lifetime of the run.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    // ---
    /// MySQL server host name.
    pub host: String,

    /// MySQL server port.
    pub port: u16,

    /// Database user.
    pub user: String,

    /// Database password.
    pub password: String,

    /// Schema holding `samples`, `test_results`, `qc_logs` and `calibration_logs`.
    pub database: String,

    /// Where the finished PDF is written. Any existing file is replaced.
    pub output_path: PathBuf,
}

/// Shape of the optional TOML config file. Every key may be omitted.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileConfig {
    host: Option<String>,
    port: Option<u16>,
    user: Option<String>,
    password: Option<String>,
    database: Option<String>,
    output_path: Option<PathBuf>,
}

/// Load configuration from the config file (if any) and environment variables.
///
/// Required (env or file):
/// - `LAB_DB_USER` / `user`
/// - `LAB_DB_PASSWORD` / `password`
///
/// Optional:
/// - `LAB_DB_HOST` / `host` (default: `localhost`)
/// - `LAB_DB_PORT` / `port` (default: 3306)
/// - `LAB_DB_NAME` / `database` (default: `clinical_lab`)
/// - `LAB_REPORT_PATH` / `output_path` (default: `reports/lab_daily_report.pdf`)
/// - `LAB_REPORT_CONFIG` – path to a TOML file with the keys above
///
/// Returns an error if any required value is missing or invalid.
pub fn load_from_env() -> Result<Config> {
    // ---
    let file = match optional_env!("LAB_REPORT_CONFIG") {
        Some(path) => {
            let raw = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read config file '{}'", path))?;
            parse_file_config(&raw).with_context(|| format!("Invalid config file '{}'", path))?
        }
        None => FileConfig::default(),
    };

    let overrides = FileConfig {
        host: optional_env!("LAB_DB_HOST"),
        port: parse_env_u16!("LAB_DB_PORT"),
        user: optional_env!("LAB_DB_USER"),
        password: optional_env!("LAB_DB_PASSWORD"),
        database: optional_env!("LAB_DB_NAME"),
        output_path: optional_env!("LAB_REPORT_PATH").map(PathBuf::from),
    };

    resolve(file, overrides)
}

fn parse_file_config(raw: &str) -> Result<FileConfig> {
    // ---
    Ok(toml::from_str(raw)?)
}

/// Merge file values under environment values and apply defaults.
fn resolve(file: FileConfig, env: FileConfig) -> Result<Config> {
    // ---
    let user = env
        .user
        .or(file.user)
        .ok_or_else(|| anyhow!("LAB_DB_USER must be set in .env, environment, or config file"))?;
    let password = env.password.or(file.password).ok_or_else(|| {
        anyhow!("LAB_DB_PASSWORD must be set in .env, environment, or config file")
    })?;

    Ok(Config {
        host: env
            .host
            .or(file.host)
            .unwrap_or_else(|| DEFAULT_HOST.to_string()),
        port: env.port.or(file.port).unwrap_or(DEFAULT_PORT),
        user,
        password,
        database: env
            .database
            .or(file.database)
            .unwrap_or_else(|| DEFAULT_DATABASE.to_string()),
        output_path: env
            .output_path
            .or(file.output_path)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_PATH)),
    })
}

impl Config {
    /// Log the loaded configuration for debugging purposes.
    ///
    /// The password is never printed.
    pub fn log_config(&self) {
        // ---
        tracing::info!("Configuration loaded:");
        tracing::info!("  LAB_DB_HOST     : {}", self.host);
        tracing::info!("  LAB_DB_PORT     : {}", self.port);
        tracing::info!("  LAB_DB_USER     : {}", self.user);
        tracing::info!("  LAB_DB_PASSWORD : ****");
        tracing::info!("  LAB_DB_NAME     : {}", self.database);
        tracing::info!("  LAB_REPORT_PATH : {}", self.output_path.display());
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;

    fn creds() -> FileConfig {
        // ---
        FileConfig {
            user: Some("lab".to_string()),
            password: Some("secret".to_string()),
            ..FileConfig::default()
        }
    }

    #[test]
    fn test_defaults_applied() {
        // ---
        let cfg = resolve(FileConfig::default(), creds()).unwrap();

        assert_eq!(cfg.host, "localhost");
        assert_eq!(cfg.port, 3306);
        assert_eq!(cfg.database, "clinical_lab");
        assert_eq!(cfg.output_path, PathBuf::from("reports/lab_daily_report.pdf"));
    }

    #[test]
    fn test_env_overrides_file() {
        // ---
        let file = parse_file_config(
            r#"
            host = "db.internal"
            port = 3307
            user = "file-user"
            password = "file-pass"
            output_path = "/tmp/from-file.pdf"
            "#,
        )
        .unwrap();

        let env = FileConfig {
            host: Some("env-host".to_string()),
            ..creds()
        };

        let cfg = resolve(file, env).unwrap();

        assert_eq!(cfg.host, "env-host");
        assert_eq!(cfg.port, 3307);
        assert_eq!(cfg.user, "lab");
        assert_eq!(cfg.password, "secret");
        assert_eq!(cfg.output_path, PathBuf::from("/tmp/from-file.pdf"));
    }

    #[test]
    fn test_missing_credentials_rejected() {
        // ---
        let err = resolve(FileConfig::default(), FileConfig::default()).unwrap_err();
        assert!(err.to_string().contains("LAB_DB_USER"));

        let only_user = FileConfig {
            user: Some("lab".to_string()),
            ..FileConfig::default()
        };
        let err = resolve(only_user, FileConfig::default()).unwrap_err();
        assert!(err.to_string().contains("LAB_DB_PASSWORD"));
    }

    #[test]
    fn test_unknown_file_key_rejected() {
        // ---
        assert!(parse_file_config("hostname = \"x\"").is_err());
    }
}
