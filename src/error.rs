//! Error taxonomy for the report pipeline.
//!
//! Every failure is fatal to the run. `main` turns these into an
//! `anyhow::Error` with context and exits non-zero.

use thiserror::Error;

/// Failures surfaced by loading, analysis, and report assembly.
#[derive(Debug, Error)]
pub enum ReportError {
    // ---
    /// Connection or query failure while reading one of the datasets.
    #[error("failed to load {dataset}: {source}")]
    DataAccess {
        dataset: &'static str,
        #[source]
        source: sqlx::Error,
    },

    /// A record the transforms cannot tolerate.
    #[error("invalid input data: {0}")]
    Transform(String),

    /// Chart construction or PDF serialization failure.
    #[error("failed to render report: {0}")]
    Render(String),

    /// Writing the finished document failed.
    #[error("failed to write report to {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl ReportError {
    pub fn data_access(dataset: &'static str, source: sqlx::Error) -> Self {
        ReportError::DataAccess { dataset, source }
    }

    pub fn io(path: impl Into<String>, source: std::io::Error) -> Self {
        ReportError::Io {
            path: path.into(),
            source,
        }
    }
}
