//! HTTP handlers

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use contactmail_core::{ContactForm, ContactHandler, ContactOutcome};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

/// Shared application state
pub struct AppState {
    pub handler: ContactHandler,
}

impl AppState {
    pub fn new(handler: ContactHandler) -> Self {
        Self { handler }
    }
}

/// Body of a successful send
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SentResponse {
    pub success: bool,
    pub message: &'static str,
    pub message_id: String,
}

/// Body of every failure
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Failure carrying its HTTP status
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    body: ErrorResponse,
}

impl ApiError {
    pub fn bad_request(error: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            body: ErrorResponse {
                success: false,
                error: error.into(),
                details: None,
            },
        }
    }

    pub fn send_failed(details: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            body: ErrorResponse {
                success: false,
                error: "Failed to send email".to_string(),
                details: Some(details.into()),
            },
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

/// `POST /api/send-email`
pub async fn send_email(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<SentResponse>, ApiError> {
    let form = read_form(payload)?;

    match state.handler.handle(form).await {
        ContactOutcome::Sent { message_id } => Ok(Json(SentResponse {
            success: true,
            message: "Email sent successfully",
            message_id,
        })),
        ContactOutcome::Invalid(reason) => Err(ApiError::bad_request(reason.to_string())),
        ContactOutcome::Failed(e) => Err(ApiError::send_failed(e.to_string())),
    }
}

/// Accept only a JSON object as the form
///
/// Arrays would otherwise deserialize positionally into the form fields.
fn read_form(payload: Result<Json<Value>, JsonRejection>) -> Result<ContactForm, ApiError> {
    let invalid = || ApiError::bad_request("Invalid request body");

    let Json(body) = payload.map_err(|rejection| {
        debug!("Unreadable contact request body: {}", rejection);
        invalid()
    })?;
    if !body.is_object() {
        debug!("Contact request body is not a JSON object");
        return Err(invalid());
    }

    serde_json::from_value(body).map_err(|e| {
        debug!("Contact request body has the wrong shape: {}", e);
        invalid()
    })
}

/// `GET /health`
pub async fn health_check() -> &'static str {
    "OK"
}
