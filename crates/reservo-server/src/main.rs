//! Reservo Server: application entry point.
//!
//! Connects the SurrealDB store, builds the [`AppState`] and keeps it
//! alive until shutdown.

mod config;
mod state;

use std::sync::Arc;

use anyhow::Context;
use reservo_db::DbManager;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::ServerConfig;
use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("reservo=info")),
        )
        .json()
        .init();

    info!("Starting Reservo server...");

    let config = ServerConfig::from_env().context("loading configuration")?;

    let db = DbManager::connect(&config.db)
        .await
        .context("connecting to SurrealDB")?;
    let store = db
        .into_store(config.auth.pepper.clone())
        .await
        .context("applying migrations")?;

    let state = Arc::new(AppState::build(store, &config.auth).context("building services")?);

    info!(
        issuer = %config.auth.jwt_issuer,
        algorithm = ?config.auth.jwt_algorithm,
        "Reservo services ready"
    );

    tokio::signal::ctrl_c()
        .await
        .context("waiting for shutdown signal")?;

    drop(state);
    info!("Reservo server stopped.");
    Ok(())
}
