//! otrs-connector - MCP server for creating OTRS tickets
//!
//! This binary runs as an MCP server using stdio transport, giving scripting
//! hosts a small function-call surface for ticket creation and settings.
//!
//! # Configuration
//!
//! Set the following environment variables (or use a `.env` file):
//!
//! - `OTRS_SETTINGS_PATH`: path of the persisted settings file
//! - `OTRS_PROTECTION_SCOPE`: `user` (default) or `machine`
//! - `OTRS_KEY_DIR`: scope key directory (default `<user data dir>/otrs-connector/keys`)
//! - `OTRS_TIMEOUT_SECS`: optional transport timeout
//!
//! # Usage
//!
//! ```bash
//! OTRS_SETTINGS_PATH=/var/lib/otrs-connector/settings.json ./otrs-connector
//! ```

use anyhow::{Context, Result};
use rmcp::{transport::stdio, ServiceExt};
use tracing_subscriber::{fmt, EnvFilter};

use otrs_connector::{config, server, settings};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (ignore errors if not found)
    dotenvy::dotenv().ok();

    // Log to stderr; stdout carries the MCP JSON-RPC messages
    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("otrs_connector=info")),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    tracing::info!("Starting otrs-connector v{}", env!("CARGO_PKG_VERSION"));

    let config = config::Config::from_env().context("Failed to load configuration")?;

    tracing::debug!(
        settings_path = %config.settings_path.display(),
        scope = %config.protection_scope,
        "Configuration loaded"
    );

    let store = settings::SettingsStore::open(&config.settings_path)
        .context("Failed to open settings store")?;
    let facade = settings::SettingsFacade::from_config(&config, store);

    // Check the stored credentials up front so a moved or corrupt settings
    // file is reported at startup rather than on the first ticket.
    if let Err(e) = facade.vault().load() {
        tracing::warn!(
            error = %e,
            "Stored password is not usable; set it with update_setting before creating tickets"
        );
    }

    let server = server::ConnectorServer::new(config, facade);

    tracing::info!("Server initialized, starting stdio transport");

    let service = server
        .serve(stdio())
        .await
        .inspect_err(|e| {
            tracing::error!("serving error: {:?}", e);
        })
        .context("Failed to start server")?;

    tracing::info!("Server running, waiting for requests");

    service
        .waiting()
        .await
        .context("Server error during operation")?;

    tracing::info!("Server shutting down");

    Ok(())
}
