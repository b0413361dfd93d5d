//! Google Compute Engine provider error types

use sandboxflow_cloud::CloudError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GcpError {
    #[error("Invalid service account credentials: {0}")]
    InvalidCredentials(String),

    #[error("Token request failed: {0}")]
    TokenRequest(String),

    #[error("JWT signing failed: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),

    /// Non-success response from the Compute API
    #[error("Compute API returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, GcpError>;

impl From<GcpError> for CloudError {
    fn from(e: GcpError) -> Self {
        match e {
            GcpError::InvalidCredentials(_) | GcpError::TokenRequest(_) | GcpError::Jwt(_) => {
                CloudError::Auth(e.to_string())
            }
            other => CloudError::Api(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_into_cloud_error() {
        let api = GcpError::Api {
            status: 409,
            message: "The resource 'netvpc-r1' already exists".to_string(),
        };
        match CloudError::from(api) {
            CloudError::Api(msg) => assert!(msg.contains("409")),
            other => panic!("unexpected: {:?}", other),
        }

        let auth = GcpError::TokenRequest("invalid_grant".to_string());
        assert!(matches!(CloudError::from(auth), CloudError::Auth(_)));
    }
}
