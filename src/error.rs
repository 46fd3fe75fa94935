//! Errors raised at the crate boundary.
//!
//! The navigation engine itself never fails; these cover the
//! operations that read or write external data (GPX files, provider
//! responses, configuration documents).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("GPX error: {0}")]
    Gpx(#[from] ::gpx::errors::GpxError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("directions provider error: {0}")]
    Provider(String),

    #[error("invalid data: {0}")]
    InvalidData(String),

    #[error("invalid timestamp: {0}")]
    Time(String),
}

pub type Result<T> = std::result::Result<T, Error>;
