//! Error types for the core module

use crate::submission::ValidationError;
use thiserror::Error;

/// Result type for core operations
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur in core operations
#[derive(Debug, Error)]
pub enum CoreError {
    /// Submission rejected before any network call
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// OAuth2 refresh-token exchange failed
    #[error("OAuth2 token refresh failed: {0}")]
    AuthRefresh(String),

    /// The mail provider rejected the message or could not be reached
    #[error("{0}")]
    Delivery(String),

    /// No usable credentials are configured
    #[error("Mail transport is not configured: {0}")]
    Misconfigured(String),

    /// IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl From<contactmail_auth::AuthError> for CoreError {
    fn from(e: contactmail_auth::AuthError) -> Self {
        CoreError::AuthRefresh(e.to_string())
    }
}

impl From<contactmail_smtp::SmtpError> for CoreError {
    fn from(e: contactmail_smtp::SmtpError) -> Self {
        CoreError::Delivery(e.to_string())
    }
}
