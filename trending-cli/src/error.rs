//! Error types for the CLI

use std::path::PathBuf;

use error_stack::Report;
use thiserror::Error;
use trending::TrendingError;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("Failed to read layout {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid layout: {0}")]
    Layout(#[from] serde_json::Error),

    #[error("Unknown group: {0}")]
    UnknownGroup(String),

    #[error("{0}")]
    Trending(TrendingError),
}

impl From<Report<TrendingError>> for CliError {
    fn from(report: Report<TrendingError>) -> Self {
        CliError::Trending(report.current_context().clone())
    }
}

pub type Result<T> = std::result::Result<T, CliError>;
