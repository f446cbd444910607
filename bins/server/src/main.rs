//! Tally API Server
//!
//! Main entry point for the Tally backend service.

use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tally_api::{AppState, create_router};
use tally_core::auth::VerificationCodes;
use tally_db::{SqlStore, connect, migrate};
use tally_shared::{AppConfig, EmailService, JwtConfig, JwtService};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tally=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::load().context("Failed to load configuration")?;
    let timezone = config
        .app
        .tz()
        .map_err(anyhow::Error::msg)
        .context("Invalid app.timezone")?;

    let db = connect(&config.database.url, config.database.max_connections).await?;
    info!("Connected to database");
    if config.database.migrate_on_start {
        migrate(&db).await?;
    }

    let jwt_service = JwtService::new(JwtConfig::from_settings(&config.jwt)?);

    let email_service = match config.email.clone() {
        Some(email) => {
            info!(
                smtp_host = %email.smtp_host,
                smtp_port = %email.smtp_port,
                "Email service configured"
            );
            Some(Arc::new(
                EmailService::new(email).context("Invalid [email] settings")?,
            ))
        }
        None => {
            warn!("Email service not configured, verification codes will be logged");
            None
        }
    };

    let ai = tally_ai::build_chat_client(&config.ai)?;

    let state = AppState {
        store: SqlStore::new(db),
        jwt_service: Arc::new(jwt_service),
        verification: Arc::new(VerificationCodes::new(&config.verification)),
        email_service,
        ai,
        timezone,
    };

    let app = create_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr).await?;
    info!(timezone = %timezone, "Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
