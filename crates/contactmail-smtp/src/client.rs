//! SMTP client implementation

use crate::{SmtpError, SmtpResult};
use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox, MultiPart, SinglePart},
    transport::smtp::authentication::{Credentials, Mechanism},
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use std::fmt;
use std::time::Duration;
use tracing::{info, warn};

/// Email message to send
#[derive(Debug, Clone)]
pub struct OutgoingMessage {
    /// From address
    pub from: String,
    /// From display name
    pub from_name: Option<String>,
    /// To addresses
    pub to: Vec<String>,
    /// Reply-To address
    pub reply_to: Option<String>,
    /// Subject line
    pub subject: String,
    /// Plain text body
    pub text_body: Option<String>,
    /// HTML body
    pub html_body: Option<String>,
    /// Message-ID header value, angle brackets included
    pub message_id: String,
}

impl OutgoingMessage {
    /// Create a new message builder
    pub fn new(from: impl Into<String>, subject: impl Into<String>) -> Self {
        let from = from.into();
        let message_id = generate_message_id(&from);
        Self {
            from,
            from_name: None,
            to: Vec::new(),
            reply_to: None,
            subject: subject.into(),
            text_body: None,
            html_body: None,
            message_id,
        }
    }

    /// Set the from display name
    pub fn from_name(mut self, name: impl Into<String>) -> Self {
        self.from_name = Some(name.into());
        self
    }

    /// Add a To recipient
    pub fn to(mut self, address: impl Into<String>) -> Self {
        self.to.push(address.into());
        self
    }

    /// Set the Reply-To address
    pub fn reply_to(mut self, address: impl Into<String>) -> Self {
        self.reply_to = Some(address.into());
        self
    }

    /// Set the plain text body
    pub fn text(mut self, body: impl Into<String>) -> Self {
        self.text_body = Some(body.into());
        self
    }

    /// Set the HTML body
    pub fn html(mut self, body: impl Into<String>) -> Self {
        self.html_body = Some(body.into());
        self
    }
}

/// `<uuid@domain>` where domain is taken from the sender address
fn generate_message_id(from: &str) -> String {
    let domain = from
        .rsplit_once('@')
        .map(|(_, domain)| domain)
        .filter(|domain| !domain.is_empty())
        .unwrap_or("localhost");
    format!("<{}@{}>", uuid::Uuid::new_v4(), domain)
}

/// Something that can deliver exactly one message
///
/// Returns the identifier of the delivered message.
#[async_trait]
pub trait MailTransport: Send + Sync {
    async fn send(&self, message: OutgoingMessage) -> SmtpResult<String>;
}

/// SMTP authentication for a single session
#[derive(Clone)]
pub enum SmtpAuth {
    /// XOAUTH2 with a short-lived access token
    Xoauth2 { user: String, access_token: String },
    /// PLAIN/LOGIN with a password or API key
    Password { user: String, password: String },
}

impl SmtpAuth {
    /// Username presented to the server
    pub fn user(&self) -> &str {
        match self {
            SmtpAuth::Xoauth2 { user, .. } | SmtpAuth::Password { user, .. } => user,
        }
    }

    fn mechanism_name(&self) -> &'static str {
        match self {
            SmtpAuth::Xoauth2 { .. } => "XOAUTH2",
            SmtpAuth::Password { .. } => "PLAIN",
        }
    }
}

// Secrets stay out of logs
impl fmt::Debug for SmtpAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SmtpAuth")
            .field("mechanism", &self.mechanism_name())
            .field("user", &self.user())
            .finish_non_exhaustive()
    }
}

/// SMTP client for sending emails
#[derive(Debug, Clone)]
pub struct SmtpClient {
    host: String,
    port: u16,
    timeout: Option<Duration>,
}

impl SmtpClient {
    /// Create a new SMTP client
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            timeout: None,
        }
    }

    /// Create a SendGrid SMTP relay client
    pub fn sendgrid() -> Self {
        Self::new(crate::relay::SMTP_HOST, crate::relay::SMTP_PORT)
    }

    /// Set the per-session timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Send a message using XOAUTH2 authentication
    pub async fn send_xoauth2(
        &self,
        email: &str,
        access_token: &str,
        message: OutgoingMessage,
    ) -> SmtpResult<String> {
        info!("Sending email via SMTP with XOAUTH2");

        // lettre's Xoauth2 mechanism expects the access token directly -
        // it constructs and encodes the XOAUTH2 string internally
        self.send_with(
            Credentials::new(email.to_string(), access_token.to_string()),
            vec![Mechanism::Xoauth2],
            message,
        )
        .await
    }

    /// Send a message using password authentication (PLAIN/LOGIN mechanisms)
    pub async fn send_password(
        &self,
        user: &str,
        password: &str,
        message: OutgoingMessage,
    ) -> SmtpResult<String> {
        info!("Sending email via SMTP with password auth");

        self.send_with(
            Credentials::new(user.to_string(), password.to_string()),
            vec![Mechanism::Plain, Mechanism::Login],
            message,
        )
        .await
    }

    async fn send_with(
        &self,
        credentials: Credentials,
        mechanisms: Vec<Mechanism>,
        message: OutgoingMessage,
    ) -> SmtpResult<String> {
        let lettre_message = build_lettre_message(&message)?;

        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&self.host)
            .map_err(|e| SmtpError::ConnectionFailed(e.to_string()))?
            .port(self.port)
            .timeout(self.timeout)
            .credentials(credentials)
            .authentication(mechanisms)
            .build();

        let response = transport.send(lettre_message).await.map_err(|e| {
            warn!(host = %self.host, port = self.port, "SMTP send failed: {}", e);
            SmtpError::SendFailed(e.to_string())
        })?;

        info!(
            message_id = %message.message_id,
            code = %response.code(),
            "Email sent successfully"
        );
        Ok(message.message_id)
    }
}

/// An [`SmtpClient`] paired with the credentials for one send
#[derive(Debug, Clone)]
pub struct SmtpTransport {
    client: SmtpClient,
    auth: SmtpAuth,
}

impl SmtpTransport {
    pub fn new(client: SmtpClient, auth: SmtpAuth) -> Self {
        Self { client, auth }
    }

    pub fn client(&self) -> &SmtpClient {
        &self.client
    }

    pub fn auth(&self) -> &SmtpAuth {
        &self.auth
    }
}

#[async_trait]
impl MailTransport for SmtpTransport {
    async fn send(&self, message: OutgoingMessage) -> SmtpResult<String> {
        match &self.auth {
            SmtpAuth::Xoauth2 { user, access_token } => {
                self.client.send_xoauth2(user, access_token, message).await
            }
            SmtpAuth::Password { user, password } => {
                self.client.send_password(user, password, message).await
            }
        }
    }
}

fn parse_mailbox(name: Option<&String>, address: &str) -> SmtpResult<Mailbox> {
    let email = address
        .parse()
        .map_err(|e| SmtpError::InvalidAddress(format!("{}: {}", address, e)))?;
    Ok(Mailbox::new(name.cloned(), email))
}

/// Build a lettre Message from OutgoingMessage
pub fn build_lettre_message(msg: &OutgoingMessage) -> SmtpResult<Message> {
    let from_mailbox = parse_mailbox(msg.from_name.as_ref(), &msg.from)?;

    let mut builder = Message::builder()
        .from(from_mailbox)
        .subject(&msg.subject)
        .message_id(Some(msg.message_id.clone()));

    if msg.to.is_empty() {
        return Err(SmtpError::MessageBuildError("no recipients".to_string()));
    }

    for to in &msg.to {
        builder = builder.to(parse_mailbox(None, to)?);
    }

    // An unparseable Reply-To is dropped rather than failing the send
    if let Some(ref reply_to) = msg.reply_to {
        match parse_mailbox(None, reply_to) {
            Ok(mailbox) => builder = builder.reply_to(mailbox),
            Err(e) => warn!("Sending without Reply-To: {}", e),
        }
    }

    // Build the body part (text/html or multipart/alternative)
    let body_part = match (&msg.text_body, &msg.html_body) {
        (Some(text), Some(html)) => MultiPart::alternative()
            .singlepart(
                SinglePart::builder()
                    .header(ContentType::TEXT_PLAIN)
                    .body(text.clone()),
            )
            .singlepart(
                SinglePart::builder()
                    .header(ContentType::TEXT_HTML)
                    .body(html.clone()),
            ),
        (Some(text), None) => MultiPart::alternative().singlepart(
            SinglePart::builder()
                .header(ContentType::TEXT_PLAIN)
                .body(text.clone()),
        ),
        (None, Some(html)) => MultiPart::alternative().singlepart(
            SinglePart::builder()
                .header(ContentType::TEXT_HTML)
                .body(html.clone()),
        ),
        (None, None) => MultiPart::alternative().singlepart(
            SinglePart::builder()
                .header(ContentType::TEXT_PLAIN)
                .body(String::new()),
        ),
    };

    builder
        .multipart(body_part)
        .map_err(|e| SmtpError::MessageBuildError(e.to_string()))
}
