//! Error types for earliest-actor lookups

use std::time::Duration;

use thiserror::Error;

/// Earliest-actor lookup errors
///
/// Callers can tell "nothing matched" (an `Ok` with empty tables) apart from
/// any of these failures.
#[derive(Error, Debug)]
pub enum LookupError {
    /// Rejected before a query was built (empty batch, malformed address, bad table name)
    #[error("Construction error: {0}")]
    Construction(String),

    /// Execution backend failed (connection, prepare, bind, run)
    #[error("Execution error: {0}")]
    Execution(String),

    /// Query did not finish within the allotted time
    #[error("Query timed out after {0:?}")]
    Timeout(Duration),

    /// Rows came back without the expected fields or types
    #[error("Shape error: {0}")]
    Shape(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl LookupError {
    /// Short machine-readable kind, used in reply payloads
    pub fn kind(&self) -> &'static str {
        match self {
            LookupError::Construction(_) => "construction",
            LookupError::Execution(_) => "execution",
            LookupError::Timeout(_) => "timeout",
            LookupError::Shape(_) => "shape",
            LookupError::Config(_) => "config",
            LookupError::Serialization(_) => "serialization",
        }
    }
}

#[cfg(not(target_family = "wasm"))]
impl From<duckdb::Error> for LookupError {
    fn from(err: duckdb::Error) -> Self {
        LookupError::Execution(err.to_string())
    }
}

impl From<arrow::error::ArrowError> for LookupError {
    fn from(err: arrow::error::ArrowError) -> Self {
        LookupError::Serialization(err.to_string())
    }
}

impl From<serde_json::Error> for LookupError {
    fn from(err: serde_json::Error) -> Self {
        LookupError::Serialization(err.to_string())
    }
}
