//! Server configuration
//!
//! Sources, later ones winning: built-in defaults, `contactmail.toml` (or the
//! file named by `CONTACTMAIL_CONFIG`), `CONTACTMAIL_*` environment variables
//! with `__` separating sections, and finally a bare `PORT`.

use contactmail_auth::gmail;
use contactmail_core::TransportSettings;
use contactmail_smtp::{relay, SmtpClient};
use figment::providers::{Env, Format, Toml};
use figment::Figment;
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Default configuration file
pub const DEFAULT_CONFIG_FILE: &str = "contactmail.toml";

/// Complete server configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServerConfig {
    #[serde(default)]
    pub server: HttpConfig,
    #[serde(default)]
    pub mail: MailConfig,
    #[serde(default)]
    pub credentials: CredentialsConfig,
}

/// HTTP listener settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub host: String,
    pub port: u16,
    /// Allowed CORS origins; empty allows any origin
    pub cors_origins: Vec<String>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3001,
            cors_origins: Vec::new(),
        }
    }
}

impl HttpConfig {
    pub fn socket_addr(&self) -> anyhow::Result<SocketAddr> {
        Ok(format!("{}:{}", self.host, self.port).parse()?)
    }
}

/// Outbound mail settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MailConfig {
    /// Where contact requests are delivered; defaults to the sender mailbox
    pub recipient: Option<String>,
    pub gmail_host: String,
    pub gmail_port: u16,
    pub relay_host: String,
    pub relay_port: u16,
    pub relay_username: String,
    pub token_url: String,
    pub timeout_secs: u64,
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            recipient: None,
            gmail_host: gmail::SMTP_HOST.to_string(),
            gmail_port: gmail::SMTP_PORT,
            relay_host: relay::SMTP_HOST.to_string(),
            relay_port: relay::SMTP_PORT,
            relay_username: relay::USERNAME.to_string(),
            token_url: gmail::TOKEN_URL.to_string(),
            timeout_secs: 30,
        }
    }
}

impl MailConfig {
    pub fn transport_settings(&self) -> TransportSettings {
        TransportSettings {
            gmail: SmtpClient::new(&self.gmail_host, self.gmail_port),
            relay: SmtpClient::new(&self.relay_host, self.relay_port),
            relay_username: self.relay_username.clone(),
            token_url: self.token_url.clone(),
        }
        .with_timeout(Duration::from_secs(self.timeout_secs))
    }
}

/// Where mail credentials are read from on each request
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CredentialSourceKind {
    /// Process environment
    #[default]
    Env,
    /// Env-style file, re-read per request
    File,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CredentialsConfig {
    pub source: CredentialSourceKind,
    pub file: PathBuf,
}

impl Default for CredentialsConfig {
    fn default() -> Self {
        Self {
            source: CredentialSourceKind::Env,
            file: PathBuf::from(".env"),
        }
    }
}

impl ServerConfig {
    /// Layered configuration rooted at `path`
    pub fn figment(path: impl Into<PathBuf>) -> Figment {
        Figment::new()
            .merge(Toml::file(path.into()))
            .merge(Env::prefixed("CONTACTMAIL_").split("__"))
            .merge(Env::raw().only(&["PORT"]).map(|_| "server.port".into()))
    }

    /// Load configuration from files and environment
    pub fn load() -> anyhow::Result<Self> {
        let path = std::env::var("CONTACTMAIL_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_FILE));
        let config: Self = Self::figment(path).extract()?;
        Ok(config)
    }
}
