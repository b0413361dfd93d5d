//! Cloud provisioning error types

use thiserror::Error;

/// Provisioning faults
#[derive(Error, Debug)]
pub enum CloudError {
    /// Any failure of a cloud API call (transport, auth, quota, validation)
    #[error("Cloud API error: {0}")]
    Api(String),

    #[error("Authentication failed: {0}")]
    Auth(String),

    /// The cloud reported an error on an otherwise terminal operation.
    /// `error` is the cloud's payload, verbatim.
    #[error("Operation {operation} failed: {error}")]
    OperationFailed {
        operation: String,
        error: serde_json::Value,
    },

    #[error("Operation {operation} did not complete within {waited_secs}s")]
    OperationTimeout { operation: String, waited_secs: u64 },

    #[error("Wait for operation {0} was cancelled")]
    Cancelled(String),

    #[error("Unsupported image source {0}")]
    UnsupportedImageSource(String),

    #[error("{0} deployment option is not supported.")]
    UnsupportedDeployment(String),

    #[error("Missing deployment attribute: {0}")]
    MissingAttribute(String),

    #[error("Invalid value for {name}: {value}")]
    InvalidAttribute { name: String, value: String },

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Dependent step failed: {0}")]
    DependencyFailed(String),

    #[error("Access key unavailable: {0}")]
    KeyUnavailable(String),

    #[error("Invalid IP filter: {0}")]
    InvalidRegex(#[from] regex::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, CloudError>;
