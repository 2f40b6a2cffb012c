//! Error types for Cognis

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid dimension for {what}: expected {expected}, got {got}")]
    InvalidDimension {
        what: String,
        expected: usize,
        got: usize,
    },

    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("volitional collapse not ready: charge {charge:.3} < threshold {threshold:.3}")]
    CollapseNotReady { charge: f64, threshold: f64 },

    #[error("state schema version {found} is newer than supported version {supported}")]
    SchemaTooNew { found: u32, supported: u32 },

    #[error("persistence error: {0}")]
    Persistence(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn invalid_dimension(what: impl Into<String>, expected: usize, got: usize) -> Self {
        Self::InvalidDimension {
            what: what.into(),
            expected,
            got,
        }
    }

    pub fn invalid_parameter(message: impl Into<String>) -> Self {
        Self::InvalidParameter(message.into())
    }

    pub fn persistence(message: impl Into<String>) -> Self {
        Self::Persistence(message.into())
    }
}
