//! Core logic for contactmail
//!
//! Validates contact submissions, resolves mail credentials, selects a
//! transport per request and relays one email.

pub mod credentials;
mod error;
mod handler;
mod store;
mod submission;
pub mod template;
mod transport;

pub use credentials::{
    CredentialConfig, CredentialMode, CredentialSource, EnvCredentialSource, MailCredentials,
    StaticCredentialSource,
};
pub use error::{CoreError, CoreResult};
pub use handler::{ContactHandler, ContactOutcome};
pub use store::CredentialStore;
pub use submission::{is_valid_email, ContactForm, ContactSubmission, ValidationError};
pub use transport::{
    select_transport, CredentialTransportSelector, SelectedTransport, TransportSelector,
    TransportSettings,
};
