//! SMTP implementation for contactmail
//!
//! Sends contact-form mail over STARTTLS SMTP, authenticating with either
//! XOAUTH2 (Gmail with a refreshed access token) or a password/API key
//! (Gmail application password or an SMTP relay).

mod client;
mod error;

pub use client::{
    build_lettre_message, MailTransport, OutgoingMessage, SmtpAuth, SmtpClient, SmtpTransport,
};
pub use error::{SmtpError, SmtpResult};

/// SendGrid SMTP relay
pub mod relay {
    pub const SMTP_HOST: &str = "smtp.sendgrid.net";
    pub const SMTP_PORT: u16 = 587;

    /// Username SendGrid expects alongside the API key
    pub const USERNAME: &str = "apikey";
}
