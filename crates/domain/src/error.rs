//! Error types shared across the workspace.
//!
//! `ClientError` is what every upstream client returns; the pipeline
//! attaches the stage it happened in. `ConfigError` only ever occurs at
//! startup.

use thiserror::Error;

/// Failure of a single upstream call
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ClientError {
    /// The request never produced a usable HTTP response
    #[error("request failed: {0}")]
    Transport(String),

    /// The upstream answered with a non-success status
    #[error("upstream returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// The response body did not have the expected shape
    #[error("unexpected response shape: {0}")]
    Decode(String),
}

impl ClientError {
    /// Whether this failure is a shape mismatch rather than a transport fault
    pub fn is_decode(&self) -> bool {
        matches!(self, ClientError::Decode(_))
    }
}

/// Invalid or missing configuration, fatal at startup
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// A required credential or setting is absent
    #[error("required setting {0} is not set")]
    Missing(&'static str),

    /// A setting is present but cannot be used
    #[error("invalid value for {name}: {value:?} ({reason})")]
    InvalidValue {
        name: &'static str,
        value: String,
        reason: String,
    },
}

/// Convenience type alias for upstream client results
pub type ClientResult<T> = std::result::Result<T, ClientError>;
