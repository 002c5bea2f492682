//! Authentication module for contactmail
//!
//! Exchanges a stored Google OAuth2 refresh token for a short-lived access
//! token, which the SMTP layer then presents via XOAUTH2.

mod error;
mod oauth2;

pub use error::{AuthError, AuthResult};
pub use oauth2::{OAuth2Client, OAuth2Config, OAuth2Refresher, TokenPair, TokenRefresher};

/// Gmail OAuth2 configuration
pub mod gmail {
    use super::OAuth2Config;

    /// Google authorization endpoint
    pub const AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";

    /// Google token endpoint
    pub const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

    /// Gmail SMTP server
    pub const SMTP_HOST: &str = "smtp.gmail.com";
    pub const SMTP_PORT: u16 = 587;

    /// Create Gmail OAuth2 configuration
    pub fn oauth2_config(client_id: &str, client_secret: &str) -> OAuth2Config {
        OAuth2Config {
            client_id: client_id.to_string(),
            client_secret: client_secret.to_string(),
            auth_url: AUTH_URL.to_string(),
            token_url: TOKEN_URL.to_string(),
        }
    }
}
