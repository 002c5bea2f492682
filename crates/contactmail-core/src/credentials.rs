//! Mail credentials and where they come from
//!
//! Credentials are re-read on every request, so a refresh token written by
//! the bootstrap tool takes effect without a restart.

use crate::{CoreError, CoreResult};
use async_trait::async_trait;
use std::fmt;

/// Environment / env-file keys
pub mod keys {
    pub const USER: &str = "GMAIL_USER";
    pub const PASSWORD: &str = "GMAIL_PASSWORD";
    pub const CLIENT_ID: &str = "CLIENT_ID";
    pub const CLIENT_SECRET: &str = "CLIENT_SECRET";
    pub const REFRESH_TOKEN: &str = "REFRESH_TOKEN";
    pub const API_KEY: &str = "SENDGRID_API_KEY";
}

/// Password value left behind once an installation has switched to OAuth2
pub const OAUTH2_PASSWORD_PLACEHOLDER: &str = "OAuth2_Enabled";

/// Raw credential settings, every field optional
#[derive(Clone, Default, PartialEq, Eq)]
pub struct CredentialConfig {
    pub user: Option<String>,
    pub password: Option<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub refresh_token: Option<String>,
    pub api_key: Option<String>,
}

impl CredentialConfig {
    /// Build from `KEY=VALUE` pairs; unknown keys are ignored
    pub fn from_vars<I, K, V>(vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut config = Self::default();
        for (key, value) in vars {
            let slot = match key.as_ref() {
                keys::USER => &mut config.user,
                keys::PASSWORD => &mut config.password,
                keys::CLIENT_ID => &mut config.client_id,
                keys::CLIENT_SECRET => &mut config.client_secret,
                keys::REFRESH_TOKEN => &mut config.refresh_token,
                keys::API_KEY => &mut config.api_key,
                _ => continue,
            };
            *slot = Some(value.into());
        }
        config
    }

    /// Snapshot of the process environment
    pub fn from_env() -> Self {
        Self::from_vars(std::env::vars())
    }
}

fn redact(value: &Option<String>) -> &'static str {
    match value {
        Some(v) if !v.is_empty() => "<set>",
        _ => "<unset>",
    }
}

impl fmt::Debug for CredentialConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialConfig")
            .field("user", &self.user)
            .field("password", &redact(&self.password))
            .field("client_id", &self.client_id)
            .field("client_secret", &redact(&self.client_secret))
            .field("refresh_token", &redact(&self.refresh_token))
            .field("api_key", &redact(&self.api_key))
            .finish()
    }
}

/// Which authentication mode a set of credentials selects
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialMode {
    OAuth2,
    StaticPassword,
    ApiKeyRelay,
}

impl fmt::Display for CredentialMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CredentialMode::OAuth2 => "oauth2",
            CredentialMode::StaticPassword => "static-password",
            CredentialMode::ApiKeyRelay => "api-key-relay",
        };
        f.write_str(name)
    }
}

/// Resolved credentials for exactly one authentication mode
#[derive(Clone, PartialEq, Eq)]
pub enum MailCredentials {
    /// Gmail with a refresh token exchanged per request
    OAuth2 {
        user: String,
        client_id: String,
        client_secret: String,
        refresh_token: String,
    },
    /// Gmail application password
    StaticPassword { user: String, password: String },
    /// Third-party SMTP relay authenticated with an API key
    ApiKeyRelay { user: String, api_key: String },
}

impl MailCredentials {
    /// Pick the mode from raw settings
    ///
    /// OAuth2 wins when refresh token, client id and client secret are all
    /// present, then a static password, then a relay API key.
    pub fn resolve(config: &CredentialConfig) -> CoreResult<Self> {
        let user = present(&config.user).ok_or_else(|| {
            CoreError::Misconfigured(format!("{} (sender address) is not set", keys::USER))
        })?;

        if let (Some(refresh_token), Some(client_id), Some(client_secret)) = (
            present(&config.refresh_token),
            present(&config.client_id),
            present(&config.client_secret),
        ) {
            return Ok(MailCredentials::OAuth2 {
                user,
                client_id,
                client_secret,
                refresh_token,
            });
        }

        if let Some(password) =
            present(&config.password).filter(|p| p != OAUTH2_PASSWORD_PLACEHOLDER)
        {
            return Ok(MailCredentials::StaticPassword { user, password });
        }

        if let Some(api_key) = present(&config.api_key) {
            return Ok(MailCredentials::ApiKeyRelay { user, api_key });
        }

        Err(CoreError::Misconfigured(
            "no refresh token, password or relay API key configured".to_string(),
        ))
    }

    pub fn mode(&self) -> CredentialMode {
        match self {
            MailCredentials::OAuth2 { .. } => CredentialMode::OAuth2,
            MailCredentials::StaticPassword { .. } => CredentialMode::StaticPassword,
            MailCredentials::ApiKeyRelay { .. } => CredentialMode::ApiKeyRelay,
        }
    }

    /// The sender mailbox
    pub fn user(&self) -> &str {
        match self {
            MailCredentials::OAuth2 { user, .. }
            | MailCredentials::StaticPassword { user, .. }
            | MailCredentials::ApiKeyRelay { user, .. } => user,
        }
    }
}

impl fmt::Debug for MailCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MailCredentials")
            .field("mode", &self.mode())
            .field("user", &self.user())
            .finish_non_exhaustive()
    }
}

fn present(value: &Option<String>) -> Option<String> {
    value.as_ref().filter(|v| !v.is_empty()).cloned()
}

/// Supplies the current credential settings
#[async_trait]
pub trait CredentialSource: Send + Sync {
    async fn load(&self) -> CoreResult<CredentialConfig>;
}

/// Reads credentials from the process environment on each call
#[derive(Debug, Default, Clone, Copy)]
pub struct EnvCredentialSource;

#[async_trait]
impl CredentialSource for EnvCredentialSource {
    async fn load(&self) -> CoreResult<CredentialConfig> {
        Ok(CredentialConfig::from_env())
    }
}

/// Fixed credentials
#[derive(Debug, Clone)]
pub struct StaticCredentialSource(pub CredentialConfig);

#[async_trait]
impl CredentialSource for StaticCredentialSource {
    async fn load(&self) -> CoreResult<CredentialConfig> {
        Ok(self.0.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> CredentialConfig {
        CredentialConfig {
            user: Some("owner@gmail.com".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_oauth2_takes_priority() {
        let config = CredentialConfig {
            password: Some("app-password".to_string()),
            api_key: Some("SG.key".to_string()),
            client_id: Some("id".to_string()),
            client_secret: Some("secret".to_string()),
            refresh_token: Some("1//refresh".to_string()),
            ..base()
        };
        let creds = MailCredentials::resolve(&config).unwrap();
        assert_eq!(creds.mode(), CredentialMode::OAuth2);
        assert_eq!(creds.user(), "owner@gmail.com");
    }

    #[test]
    fn test_partial_oauth2_falls_through_to_password() {
        let config = CredentialConfig {
            password: Some("app-password".to_string()),
            client_id: Some("id".to_string()),
            refresh_token: Some("1//refresh".to_string()),
            ..base()
        };
        let creds = MailCredentials::resolve(&config).unwrap();
        assert_eq!(
            creds,
            MailCredentials::StaticPassword {
                user: "owner@gmail.com".to_string(),
                password: "app-password".to_string(),
            }
        );
    }

    #[test]
    fn test_relay_when_only_api_key() {
        let config = CredentialConfig {
            api_key: Some("SG.key".to_string()),
            ..base()
        };
        assert_eq!(
            MailCredentials::resolve(&config).unwrap().mode(),
            CredentialMode::ApiKeyRelay
        );
    }

    #[test]
    fn test_placeholder_password_is_ignored() {
        let config = CredentialConfig {
            password: Some(OAUTH2_PASSWORD_PLACEHOLDER.to_string()),
            api_key: Some("SG.key".to_string()),
            ..base()
        };
        assert_eq!(
            MailCredentials::resolve(&config).unwrap().mode(),
            CredentialMode::ApiKeyRelay
        );
    }

    #[test]
    fn test_empty_values_are_absent() {
        let config = CredentialConfig {
            password: Some(String::new()),
            refresh_token: Some(String::new()),
            client_id: Some("id".to_string()),
            client_secret: Some("secret".to_string()),
            ..base()
        };
        assert!(matches!(
            MailCredentials::resolve(&config),
            Err(CoreError::Misconfigured(_))
        ));
    }

    #[test]
    fn test_missing_user_is_misconfigured() {
        let config = CredentialConfig {
            password: Some("app-password".to_string()),
            ..Default::default()
        };
        let err = MailCredentials::resolve(&config).unwrap_err();
        assert!(err.to_string().contains(keys::USER));
    }

    #[test]
    fn test_from_vars_ignores_unknown_keys() {
        let config = CredentialConfig::from_vars([
            ("GMAIL_USER", "owner@gmail.com"),
            ("REFRESH_TOKEN", "1//refresh"),
            ("PATH", "/usr/bin"),
        ]);
        assert_eq!(config.user.as_deref(), Some("owner@gmail.com"));
        assert_eq!(config.refresh_token.as_deref(), Some("1//refresh"));
        assert_eq!(config.password, None);
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let config = CredentialConfig {
            password: Some("app-password".to_string()),
            refresh_token: Some("1//refresh".to_string()),
            ..base()
        };
        let rendered = format!("{:?}", config);
        assert!(!rendered.contains("app-password"));
        assert!(!rendered.contains("1//refresh"));

        let creds = MailCredentials::resolve(&config).unwrap();
        assert!(!format!("{:?}", creds).contains("app-password"));
    }
}
