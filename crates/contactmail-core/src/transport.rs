//! Transport selection
//!
//! Turns the current credentials into a transport for exactly one send.
//! OAuth2 credentials are exchanged for a fresh access token first; a failed
//! exchange is reported as such and never falls back to another mode.

use crate::credentials::{CredentialSource, MailCredentials};
use crate::CoreResult;
use async_trait::async_trait;
use contactmail_auth::{gmail, OAuth2Config, TokenRefresher};
use contactmail_smtp::{relay, MailTransport, SmtpAuth, SmtpClient, SmtpTransport};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Endpoints and limits the selector builds transports against
#[derive(Debug, Clone)]
pub struct TransportSettings {
    /// Gmail submission server (OAuth2 and static password modes)
    pub gmail: SmtpClient,
    /// Third-party relay (API key mode)
    pub relay: SmtpClient,
    /// Username the relay expects alongside the API key
    pub relay_username: String,
    /// OAuth2 token endpoint
    pub token_url: String,
}

impl Default for TransportSettings {
    fn default() -> Self {
        Self {
            gmail: SmtpClient::new(gmail::SMTP_HOST, gmail::SMTP_PORT),
            relay: SmtpClient::sendgrid(),
            relay_username: relay::USERNAME.to_string(),
            token_url: gmail::TOKEN_URL.to_string(),
        }
    }
}

impl TransportSettings {
    /// Apply the same per-session timeout to every server
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.gmail = self.gmail.with_timeout(timeout);
        self.relay = self.relay.with_timeout(timeout);
        self
    }
}

/// Build the SMTP transport for `credentials`
///
/// Only the OAuth2 mode touches the network, to refresh the access token.
pub async fn select_transport(
    credentials: &MailCredentials,
    settings: &TransportSettings,
    refresher: &dyn TokenRefresher,
) -> CoreResult<SmtpTransport> {
    let transport = match credentials {
        MailCredentials::OAuth2 {
            user,
            client_id,
            client_secret,
            refresh_token,
        } => {
            let config = OAuth2Config {
                token_url: settings.token_url.clone(),
                ..gmail::oauth2_config(client_id, client_secret)
            };
            let tokens = refresher
                .refresh(&config, refresh_token)
                .await
                .inspect_err(|e| warn!("OAuth2 refresh for {} failed: {}", user, e))?;

            SmtpTransport::new(
                settings.gmail.clone(),
                SmtpAuth::Xoauth2 {
                    user: user.clone(),
                    access_token: tokens.access_token,
                },
            )
        }
        MailCredentials::StaticPassword { user, password } => SmtpTransport::new(
            settings.gmail.clone(),
            SmtpAuth::Password {
                user: user.clone(),
                password: password.clone(),
            },
        ),
        MailCredentials::ApiKeyRelay { api_key, .. } => SmtpTransport::new(
            settings.relay.clone(),
            SmtpAuth::Password {
                user: settings.relay_username.clone(),
                password: api_key.clone(),
            },
        ),
    };

    info!(
        mode = %credentials.mode(),
        host = transport.client().host(),
        "Selected mail transport"
    );
    Ok(transport)
}

/// A transport ready for one send, plus the mailbox it sends as
pub struct SelectedTransport {
    pub sender: String,
    pub transport: Box<dyn MailTransport>,
}

/// Produces a fresh transport per request
#[async_trait]
pub trait TransportSelector: Send + Sync {
    async fn select(&self) -> CoreResult<SelectedTransport>;
}

/// Selector that reads credentials from a [`CredentialSource`] on every call
pub struct CredentialTransportSelector {
    source: Arc<dyn CredentialSource>,
    refresher: Arc<dyn TokenRefresher>,
    settings: TransportSettings,
}

impl CredentialTransportSelector {
    pub fn new(
        source: Arc<dyn CredentialSource>,
        refresher: Arc<dyn TokenRefresher>,
        settings: TransportSettings,
    ) -> Self {
        Self {
            source,
            refresher,
            settings,
        }
    }
}

#[async_trait]
impl TransportSelector for CredentialTransportSelector {
    async fn select(&self) -> CoreResult<SelectedTransport> {
        let config = self.source.load().await?;
        let credentials = MailCredentials::resolve(&config)?;
        let transport = select_transport(&credentials, &self.settings, self.refresher.as_ref()).await?;

        Ok(SelectedTransport {
            sender: credentials.user().to_string(),
            transport: Box::new(transport),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::{CredentialConfig, StaticCredentialSource};
    use crate::CoreError;
    use contactmail_auth::{AuthError, AuthResult, TokenPair};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct MockRefresher {
        calls: AtomicUsize,
        fail: bool,
        seen: Mutex<Option<(OAuth2Config, String)>>,
    }

    impl MockRefresher {
        fn failing() -> Self {
            Self {
                fail: true,
                ..Default::default()
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl TokenRefresher for MockRefresher {
        async fn refresh(&self, config: &OAuth2Config, refresh_token: &str) -> AuthResult<TokenPair> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.seen.lock().unwrap() = Some((config.clone(), refresh_token.to_string()));
            if self.fail {
                return Err(AuthError::TokenExchangeFailed(
                    "invalid_grant: Token has been expired or revoked.".to_string(),
                ));
            }
            Ok(TokenPair {
                access_token: "ya29.fresh".to_string(),
                refresh_token: Some(refresh_token.to_string()),
                expires_at: None,
            })
        }
    }

    fn oauth2() -> MailCredentials {
        MailCredentials::OAuth2 {
            user: "owner@gmail.com".to_string(),
            client_id: "id".to_string(),
            client_secret: "secret".to_string(),
            refresh_token: "1//refresh".to_string(),
        }
    }

    #[tokio::test]
    async fn test_oauth2_refreshes_before_building_transport() {
        let refresher = MockRefresher::default();
        let transport = select_transport(&oauth2(), &TransportSettings::default(), &refresher)
            .await
            .unwrap();

        assert_eq!(refresher.calls(), 1);
        let (config, token) = refresher.seen.lock().unwrap().clone().unwrap();
        assert_eq!(config.client_id, "id");
        assert_eq!(config.client_secret, "secret");
        assert_eq!(config.token_url, gmail::TOKEN_URL);
        assert_eq!(config.auth_url, gmail::AUTH_URL);
        assert_eq!(token, "1//refresh");

        assert_eq!(transport.client().host(), "smtp.gmail.com");
        match transport.auth() {
            SmtpAuth::Xoauth2 { user, access_token } => {
                assert_eq!(user, "owner@gmail.com");
                assert_eq!(access_token, "ya29.fresh");
            }
            other => panic!("expected XOAUTH2, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_configured_token_url_is_used() {
        let refresher = MockRefresher::default();
        let settings = TransportSettings {
            token_url: "http://127.0.0.1:8085/token".to_string(),
            ..TransportSettings::default()
        };
        select_transport(&oauth2(), &settings, &refresher).await.unwrap();

        let (config, _) = refresher.seen.lock().unwrap().clone().unwrap();
        assert_eq!(config.token_url, "http://127.0.0.1:8085/token");
    }

    #[tokio::test]
    async fn test_static_password_never_refreshes() {
        let refresher = MockRefresher::default();
        let credentials = MailCredentials::StaticPassword {
            user: "owner@gmail.com".to_string(),
            password: "app-password".to_string(),
        };
        let transport = select_transport(&credentials, &TransportSettings::default(), &refresher)
            .await
            .unwrap();

        assert_eq!(refresher.calls(), 0);
        assert_eq!(transport.client().host(), "smtp.gmail.com");
        assert!(matches!(transport.auth(), SmtpAuth::Password { password, .. } if password == "app-password"));
    }

    #[tokio::test]
    async fn test_relay_uses_api_key_username() {
        let refresher = MockRefresher::default();
        let credentials = MailCredentials::ApiKeyRelay {
            user: "owner@example.com".to_string(),
            api_key: "SG.key".to_string(),
        };
        let transport = select_transport(&credentials, &TransportSettings::default(), &refresher)
            .await
            .unwrap();

        assert_eq!(refresher.calls(), 0);
        assert_eq!(transport.client().host(), "smtp.sendgrid.net");
        match transport.auth() {
            SmtpAuth::Password { user, password } => {
                assert_eq!(user, "apikey");
                assert_eq!(password, "SG.key");
            }
            other => panic!("expected password auth, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_refresh_failure_does_not_fall_back() {
        let refresher = Arc::new(MockRefresher::failing());
        let source = StaticCredentialSource(CredentialConfig {
            user: Some("owner@gmail.com".to_string()),
            password: Some("app-password".to_string()),
            client_id: Some("id".to_string()),
            client_secret: Some("secret".to_string()),
            refresh_token: Some("1//revoked".to_string()),
            api_key: None,
        });
        let selector = CredentialTransportSelector::new(
            Arc::new(source),
            refresher.clone(),
            TransportSettings::default(),
        );

        let err = selector.select().await.err().unwrap();
        assert_eq!(refresher.calls(), 1);
        assert!(matches!(err, CoreError::AuthRefresh(_)));
        assert!(err.to_string().contains("invalid_grant"));
    }

    #[tokio::test]
    async fn test_selector_reports_sender() {
        let source = StaticCredentialSource(CredentialConfig {
            user: Some("owner@gmail.com".to_string()),
            password: Some("app-password".to_string()),
            ..Default::default()
        });
        let selector = CredentialTransportSelector::new(
            Arc::new(source),
            Arc::new(MockRefresher::default()),
            TransportSettings::default(),
        );

        let selected = selector.select().await.unwrap();
        assert_eq!(selected.sender, "owner@gmail.com");
    }

    #[tokio::test]
    async fn test_selector_without_credentials_is_misconfigured() {
        let refresher = Arc::new(MockRefresher::default());
        let selector = CredentialTransportSelector::new(
            Arc::new(StaticCredentialSource(CredentialConfig::default())),
            refresher.clone(),
            TransportSettings::default(),
        );

        assert!(matches!(
            selector.select().await,
            Err(CoreError::Misconfigured(_))
        ));
        assert_eq!(refresher.calls(), 0);
    }

    #[test]
    fn test_settings_timeout_applies_to_both_servers() {
        let settings = TransportSettings::default().with_timeout(Duration::from_secs(10));
        assert_eq!(settings.gmail.timeout(), Some(Duration::from_secs(10)));
        assert_eq!(settings.relay.timeout(), Some(Duration::from_secs(10)));
    }
}
