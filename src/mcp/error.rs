//! Error types for the Planday MCP implementation.
//!
//! This module contains the custom error types and conversions needed for the Planday API.
//! It provides:
//! - `PlandayError`: The main error enum that covers all possible error cases
//! - Conversions from various error types (`reqwest`, `serde_json`, etc.)
//! - Conversion to RMCP's `ErrorData` for MCP protocol compliance

use rmcp::ErrorData;
use rmcp::model::ErrorCode;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PlandayError {
    #[error(
        "Not authenticated with Planday. Call the `authenticate` tool with a valid refresh token first."
    )]
    Unauthenticated,

    #[error("Planday token exchange failed: {0}. Re-authenticate with a valid refresh token.")]
    ExchangeFailed(String),

    #[error("Invalid refresh token: {0}")]
    InvalidCredential(String),

    #[error("Invalid parameters: {0}")]
    InvalidParams(String),

    #[error("Missing configuration: {0}")]
    MissingConfig(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Planday API returned {status} for {path}")]
    Api { status: u16, path: String },

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP middleware error: {0}")]
    HttpMiddleware(#[from] reqwest_middleware::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<PlandayError> for ErrorData {
    fn from(err: PlandayError) -> Self {
        match err {
            PlandayError::InvalidParams(msg) | PlandayError::InvalidCredential(msg) => {
                Self::new(ErrorCode::INVALID_PARAMS, msg, None)
            }
            e @ (PlandayError::Unauthenticated | PlandayError::ExchangeFailed(_)) => {
                Self::new(ErrorCode::INVALID_REQUEST, e.to_string(), None)
            }
            PlandayError::MissingConfig(msg) => Self::new(ErrorCode::INTERNAL_ERROR, msg, None),
            PlandayError::NotFound(msg) => Self::new(ErrorCode::RESOURCE_NOT_FOUND, msg, None),
            e @ PlandayError::Api { .. } => Self::new(ErrorCode::INTERNAL_ERROR, e.to_string(), None),
            PlandayError::Http(e) => {
                Self::new(ErrorCode::INTERNAL_ERROR, format!("HTTP error: {e}"), None)
            }
            PlandayError::HttpMiddleware(e) => Self::new(
                ErrorCode::INTERNAL_ERROR,
                format!("HTTP middleware error: {e}"),
                None,
            ),
            PlandayError::Serialization(e) => {
                Self::new(ErrorCode::INTERNAL_ERROR, e.to_string(), None)
            }
            PlandayError::Internal(e) => Self::new(ErrorCode::INTERNAL_ERROR, e.to_string(), None),
        }
    }
}
