//! Error handling and custom error types
//!
//! Provides unified error handling across the signing endpoint and the
//! upload client using thiserror.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// A required key or secret is missing. Detected before any network call.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Non-2xx response from the signing endpoint or the provider.
    #[error("Transport error (status {status}): {message}")]
    Transport { status: u16, message: String },

    /// 2xx response whose body is not the expected shape.
    #[error("Protocol error (status {status}): {message}")]
    Protocol { status: u16, message: String },

    #[error("Invalid signing intent: {0}")]
    InvalidIntent(String),

    #[error("Invalid upload payload: {0}")]
    InvalidPayload(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Environment variable error: {0}")]
    EnvVar(#[from] dotenvy::Error),
}

impl Error {
    /// HTTP status annotation carried by this error, if any.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Error::Configuration(_) | Error::InvalidIntent(_) | Error::InvalidPayload(_) => {
                Some(400)
            }
            Error::Transport { status, .. } | Error::Protocol { status, .. } => Some(*status),
            Error::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    pub fn is_protocol(&self) -> bool {
        matches!(self, Error::Protocol { .. })
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configuration_error_maps_to_400() {
        let err = Error::Configuration("PUBLIC_CLOUDINARY_KEY not set".to_string());
        assert_eq!(err.status_code(), Some(400));
    }

    #[test]
    fn test_transport_and_protocol_carry_status() {
        let transport = Error::Transport {
            status: 500,
            message: "boom".to_string(),
        };
        let protocol = Error::Protocol {
            status: 200,
            message: "missing public_id".to_string(),
        };

        assert_eq!(transport.status_code(), Some(500));
        assert_eq!(protocol.status_code(), Some(200));
        assert!(protocol.is_protocol());
        assert!(!transport.is_protocol());
    }

    #[test]
    fn test_display_includes_status() {
        let err = Error::Transport {
            status: 401,
            message: "Invalid Signature".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Transport error (status 401): Invalid Signature"
        );
    }
}
