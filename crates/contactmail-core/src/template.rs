//! Email rendering for contact submissions

use crate::ContactSubmission;
use contactmail_smtp::OutgoingMessage;
use html_escape::encode_text;

/// Display name on the From header
pub const SENDER_NAME: &str = "Contact Form";

const FOOTER: &str = "This email was sent from your portfolio contact form.";

/// Subject line for a submission
pub fn subject(submission: &ContactSubmission) -> String {
    format!("New Contact Request from {}", submission.name)
}

/// HTML body. User-provided values are escaped; message newlines become `<br>`.
pub fn render_html(submission: &ContactSubmission) -> String {
    let mobile = submission
        .mobile
        .as_deref()
        .map(|m| format!("\n  <p><strong>Mobile:</strong> {}</p>", encode_text(m)))
        .unwrap_or_default();

    let message = encode_text(&submission.message).replace('\n', "<br>");

    format!(
        r#"<div style="font-family: Arial, sans-serif; max-width: 600px; margin: 0 auto;">
  <h2 style="color: #333;">New Contact Request</h2>
  <p><strong>Name:</strong> {name}</p>
  <p><strong>Email:</strong> {email}</p>{mobile}
  <p><strong>Message:</strong></p>
  <p style="background: #f5f5f5; padding: 15px; border-radius: 5px; margin: 10px 0;">
    {message}
  </p>
  <p style="color: #666; font-size: 12px; margin-top: 20px;">
    {footer}
  </p>
</div>
"#,
        name = encode_text(&submission.name),
        email = encode_text(&submission.email),
        mobile = mobile,
        message = message,
        footer = FOOTER,
    )
}

/// Plain-text body
pub fn render_text(submission: &ContactSubmission) -> String {
    let mut text = String::from("New Contact Request\n\n");
    text.push_str(&format!("Name: {}\n", submission.name));
    text.push_str(&format!("Email: {}\n", submission.email));
    if let Some(mobile) = &submission.mobile {
        text.push_str(&format!("Mobile: {}\n", mobile));
    }
    text.push_str("\nMessage:\n");
    text.push_str(&submission.message);
    text.push_str("\n\n");
    text.push_str(FOOTER);
    text.push('\n');
    text
}

/// Build the outgoing email for a submission
///
/// `sender` is the authenticated mailbox; replies go to the submitter.
pub fn compose(submission: &ContactSubmission, sender: &str, recipient: &str) -> OutgoingMessage {
    OutgoingMessage::new(sender, subject(submission))
        .from_name(SENDER_NAME)
        .to(recipient)
        .reply_to(submission.email.clone())
        .text(render_text(submission))
        .html(render_html(submission))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn submission(mobile: Option<&str>) -> ContactSubmission {
        ContactSubmission {
            name: "John Doe".to_string(),
            email: "john@example.com".to_string(),
            mobile: mobile.map(str::to_string),
            message: "Hi\nthere".to_string(),
        }
    }

    #[test]
    fn test_mobile_line_omitted_when_absent() {
        let s = submission(None);
        assert!(!render_text(&s).contains("Mobile:"));
        assert!(!render_html(&s).contains("Mobile:"));
    }

    #[test]
    fn test_mobile_line_included_verbatim() {
        let s = submission(Some("+1 (555) 010-0000"));
        assert!(render_text(&s).contains("Mobile: +1 (555) 010-0000\n"));
        assert!(render_html(&s).contains("<strong>Mobile:</strong> +1 (555) 010-0000"));
    }

    #[test]
    fn test_text_body_fields() {
        let text = render_text(&submission(None));
        assert!(text.starts_with("New Contact Request\n"));
        assert!(text.contains("Name: John Doe\n"));
        assert!(text.contains("Email: john@example.com\n"));
        assert!(text.contains("Message:\nHi\nthere"));
        assert!(text.contains(FOOTER));
    }

    #[test]
    fn test_html_escapes_user_input() {
        let mut s = submission(None);
        s.name = "<script>alert(1)</script>".to_string();
        s.message = "a & b\n<b>".to_string();
        let html = render_html(&s);
        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;"));
        assert!(html.contains("a &amp; b<br>&lt;b&gt;"));
    }

    #[test]
    fn test_compose_headers() {
        let s = submission(None);
        let msg = compose(&s, "owner@example.com", "inbox@example.com");
        assert_eq!(msg.from, "owner@example.com");
        assert_eq!(msg.from_name.as_deref(), Some(SENDER_NAME));
        assert_eq!(msg.to, vec!["inbox@example.com".to_string()]);
        assert_eq!(msg.reply_to.as_deref(), Some("john@example.com"));
        assert_eq!(msg.subject, "New Contact Request from John Doe");
        assert!(msg.text_body.is_some());
        assert!(msg.html_body.is_some());
    }

    #[test]
    fn test_odd_but_accepted_address_still_builds() {
        let form = crate::ContactForm {
            name: Some("John Doe".to_string()),
            email: Some("john<x@example.com".to_string()),
            mobile: None,
            message: Some("Hi".to_string()),
        };
        let s = form.validate().unwrap();
        let msg = compose(&s, "owner@example.com", "owner@example.com");

        let built = contactmail_smtp::build_lettre_message(&msg).unwrap();
        let raw = String::from_utf8(built.formatted()).unwrap();
        assert!(!raw.contains("Reply-To:"));
        assert!(raw.contains("Subject: New Contact Request from John Doe"));
    }
}
