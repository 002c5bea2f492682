//! OAuth2 refresh-token exchange
//!
//! Trades a long-lived refresh token for a short-lived access token at the
//! provider's token endpoint. The interactive authorization-code flow that
//! produces the refresh token in the first place lives outside this crate.

use crate::{AuthError, AuthResult};
use async_trait::async_trait;
use oauth2::{
    basic::{BasicClient, BasicErrorResponse},
    AuthUrl, ClientId, ClientSecret, RefreshToken, RequestTokenError, TokenResponse, TokenUrl,
};
use tracing::{debug, info};

/// OAuth2 client configuration for a refresh exchange
#[derive(Debug, Clone)]
pub struct OAuth2Config {
    /// OAuth2 client ID
    pub client_id: String,
    /// OAuth2 client secret
    pub client_secret: String,
    /// Authorization endpoint URL
    pub auth_url: String,
    /// Token endpoint URL
    pub token_url: String,
}

/// Token pair containing access and refresh tokens
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct TokenPair {
    /// Access token for API calls
    pub access_token: String,
    /// Refresh token for obtaining new access tokens
    pub refresh_token: Option<String>,
    /// Token expiration timestamp (Unix seconds)
    pub expires_at: Option<i64>,
}

/// Exchanges refresh tokens for access tokens
///
/// Implemented over the network by [`OAuth2Refresher`]; tests substitute
/// their own implementation to observe whether an exchange happened.
#[async_trait]
pub trait TokenRefresher: Send + Sync {
    /// Exchange `refresh_token` for a fresh access token
    async fn refresh(&self, config: &OAuth2Config, refresh_token: &str) -> AuthResult<TokenPair>;
}

/// OAuth2 client bound to one client id/secret pair
pub struct OAuth2Client {
    client: BasicClient,
}

impl OAuth2Client {
    /// Create a new client from configuration
    pub fn new(config: &OAuth2Config) -> AuthResult<Self> {
        if config.client_id.is_empty() {
            return Err(AuthError::InvalidConfig("Client ID is empty".to_string()));
        }

        let auth_url = AuthUrl::new(config.auth_url.clone())
            .map_err(|e| AuthError::InvalidConfig(format!("Invalid auth URL: {}", e)))?;
        let token_url = TokenUrl::new(config.token_url.clone())
            .map_err(|e| AuthError::InvalidConfig(format!("Invalid token URL: {}", e)))?;

        let client = BasicClient::new(
            ClientId::new(config.client_id.clone()),
            Some(ClientSecret::new(config.client_secret.clone())),
            auth_url,
            Some(token_url),
        );

        Ok(Self { client })
    }

    /// Refresh an access token using a refresh token
    pub async fn refresh_token(&self, refresh_token: &str) -> AuthResult<TokenPair> {
        let token_response = self
            .client
            .exchange_refresh_token(&RefreshToken::new(refresh_token.to_string()))
            .request_async(oauth2::reqwest::async_http_client)
            .await
            .map_err(|e| AuthError::TokenExchangeFailed(describe_token_error(e)))?;

        let access_token = token_response.access_token().secret().clone();
        if access_token.is_empty() {
            return Err(AuthError::MissingAccessToken);
        }

        let expires_at = token_response
            .expires_in()
            .map(|duration| chrono::Utc::now().timestamp() + duration.as_secs() as i64);

        Ok(TokenPair {
            access_token,
            refresh_token: token_response
                .refresh_token()
                .map(|t| t.secret().clone())
                .or_else(|| Some(refresh_token.to_string())),
            expires_at,
        })
    }
}

/// Network-backed [`TokenRefresher`]
#[derive(Debug, Default, Clone, Copy)]
pub struct OAuth2Refresher;

#[async_trait]
impl TokenRefresher for OAuth2Refresher {
    async fn refresh(&self, config: &OAuth2Config, refresh_token: &str) -> AuthResult<TokenPair> {
        debug!("Exchanging refresh token at {}", config.token_url);
        let tokens = OAuth2Client::new(config)?.refresh_token(refresh_token).await?;
        info!("Obtained fresh OAuth2 access token");
        Ok(tokens)
    }
}

/// Render a token endpoint failure as the provider's own message where possible
fn describe_token_error<RE>(err: RequestTokenError<RE, BasicErrorResponse>) -> String
where
    RE: std::error::Error + 'static,
{
    match err {
        RequestTokenError::ServerResponse(response) => response.to_string(),
        RequestTokenError::Request(e) => format!("request failed: {}", e),
        RequestTokenError::Parse(e, _) => format!("unparseable token response: {}", e),
        RequestTokenError::Other(message) => message,
    }
}
