//! Contact form submissions and their validation

use serde::Deserialize;
use std::sync::LazyLock;
use thiserror::Error;

static EMAIL_RE: LazyLock<regex::Regex> = LazyLock::new(|| {
    regex::Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern is valid")
});

/// Reasons a submission is rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// One or more of name, email, message is empty
    #[error("Missing required fields")]
    MissingFields,

    /// Email does not look like `local@domain.tld`
    #[error("Invalid email format")]
    InvalidEmail,
}

/// Contact form as posted by the browser, before validation
///
/// Absent fields and JSON `null` both deserialize to `None`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ContactForm {
    pub name: Option<String>,
    pub email: Option<String>,
    pub mobile: Option<String>,
    pub message: Option<String>,
}

impl ContactForm {
    /// Check the required fields and the email shape
    pub fn validate(self) -> Result<ContactSubmission, ValidationError> {
        let name = non_empty(self.name);
        let email = non_empty(self.email);
        let message = non_empty(self.message);

        let (Some(name), Some(email), Some(message)) = (name, email, message) else {
            return Err(ValidationError::MissingFields);
        };

        if !is_valid_email(&email) {
            return Err(ValidationError::InvalidEmail);
        }

        Ok(ContactSubmission {
            name,
            email,
            mobile: non_empty(self.mobile),
            message,
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

/// Whether `email` has the basic `local@domain.tld` shape
pub fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

/// A validated contact request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContactSubmission {
    pub name: String,
    pub email: String,
    pub mobile: Option<String>,
    pub message: String,
}
