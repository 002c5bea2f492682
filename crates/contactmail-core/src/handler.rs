//! Contact request handling
//!
//! `Received → Validated → Sent`, with `Invalid` and `Failed` as terminal
//! branches. Each request sends at most one email and is never retried.

use crate::submission::{ContactForm, ValidationError};
use crate::template;
use crate::transport::TransportSelector;
use crate::CoreError;
use std::sync::Arc;
use tracing::{debug, error, info};

/// Terminal state of one contact request
#[derive(Debug)]
pub enum ContactOutcome {
    /// Delivered; carries the message identifier
    Sent { message_id: String },
    /// Rejected before any network call
    Invalid(ValidationError),
    /// Transport selection or delivery failed
    Failed(CoreError),
}

/// Validates submissions and relays them through a freshly selected transport
pub struct ContactHandler {
    selector: Arc<dyn TransportSelector>,
    recipient: Option<String>,
}

impl ContactHandler {
    /// `recipient` defaults to the sending mailbox when `None`
    pub fn new(selector: Arc<dyn TransportSelector>, recipient: Option<String>) -> Self {
        Self {
            selector,
            recipient,
        }
    }

    pub async fn handle(&self, form: ContactForm) -> ContactOutcome {
        let submission = match form.validate() {
            Ok(submission) => submission,
            Err(reason) => {
                debug!("Rejected contact submission: {}", reason);
                return ContactOutcome::Invalid(reason);
            }
        };

        let selected = match self.selector.select().await {
            Ok(selected) => selected,
            Err(e) => {
                error!("Could not prepare mail transport: {}", e);
                return ContactOutcome::Failed(e);
            }
        };

        let recipient = self.recipient.as_deref().unwrap_or(&selected.sender);
        let message = template::compose(&submission, &selected.sender, recipient);

        match selected.transport.send(message).await {
            Ok(message_id) => {
                info!(%message_id, "Contact request from {} delivered", submission.name);
                ContactOutcome::Sent { message_id }
            }
            Err(e) => {
                error!("Error sending email: {}", e);
                ContactOutcome::Failed(e.into())
            }
        }
    }
}
