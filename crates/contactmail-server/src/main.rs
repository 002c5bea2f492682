//! contactmail - contact form to email relay

use contactmail_server::{build_app, config::ServerConfig};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("contactmail=info,tower_http=info")),
        )
        .init();

    let config = ServerConfig::load()?;
    let addr = config.server.socket_addr()?;
    let app = build_app(&config);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Email server running on {}", addr);
    info!("Contact form endpoint: POST http://{}/api/send-email", addr);

    axum::serve(listener, app).await?;
    Ok(())
}
