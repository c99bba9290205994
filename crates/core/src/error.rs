//! Error types for page checks
//!
//! A violated rule is never an error: checks report those as
//! [`Diagnostic`](crate::Diagnostic) values. These errors mean a check
//! could not be evaluated at all.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CheckError {
    #[error("Node.js not found. Install Node.js and run: npx playwright install")]
    DriverNotFound,

    #[error("Browser launch failed: {0}")]
    Launch(String),

    #[error("Page operation '{op}' failed: {reason}")]
    PageOperation { op: String, reason: String },

    #[error("Driver protocol error: {0}")]
    Protocol(String),

    #[error("Browser session already closed")]
    SessionClosed,

    #[error("Canonical image not found: {0}")]
    BaselineNotFound(String),

    #[error("Suite parse error: {0}")]
    SuiteParse(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
}

pub type CheckResult<T> = Result<T, CheckError>;
