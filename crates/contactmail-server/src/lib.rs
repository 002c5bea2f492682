//! HTTP front end for contactmail
//!
//! Serves `POST /api/send-email` for the portfolio contact form.

pub mod config;
pub mod cors;
pub mod handlers;
pub mod router;

use std::sync::Arc;

use axum::Router;
use contactmail_auth::OAuth2Refresher;
use contactmail_core::{
    ContactHandler, CredentialSource, CredentialStore, CredentialTransportSelector,
    EnvCredentialSource,
};
use tracing::info;

use config::{CredentialSourceKind, ServerConfig};
use handlers::AppState;

/// Wire the configured credential source, selector and handler into a router
pub fn build_app(config: &ServerConfig) -> Router {
    let source: Arc<dyn CredentialSource> = match config.credentials.source {
        CredentialSourceKind::Env => Arc::new(EnvCredentialSource),
        CredentialSourceKind::File => {
            info!(
                "Reading mail credentials from {}",
                config.credentials.file.display()
            );
            Arc::new(CredentialStore::new(&config.credentials.file))
        }
    };

    let selector = CredentialTransportSelector::new(
        source,
        Arc::new(OAuth2Refresher),
        config.mail.transport_settings(),
    );
    let handler = ContactHandler::new(Arc::new(selector), config.mail.recipient.clone());

    router::create_router(Arc::new(AppState::new(handler)), &config.server.cors_origins)
}
