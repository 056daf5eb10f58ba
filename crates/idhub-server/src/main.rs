//! idhub server: application entry point.

mod app;
mod config;
mod publisher;

use std::time::Duration;

use anyhow::Context;
use idhub_core::context::RequestContext;
use idhub_db::DbManager;
use tracing_subscriber::EnvFilter;

use crate::app::App;
use crate::config::ServerConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("idhub=info".parse()?))
        .json()
        .init();

    tracing::info!("Starting idhub server...");

    let config = ServerConfig::from_env().context("Loading configuration")?;

    let db = DbManager::connect(&config.db)
        .await
        .context("Connecting to SurrealDB")?;
    idhub_db::run_migrations(db.client())
        .await
        .context("Running migrations")?;

    let app = App::new(db.client(), &config)?;
    let ctx = RequestContext::generated().with_timeout(Duration::from_secs(10));
    app.readiness(&ctx).await?;
    tracing::info!(trace_id = ctx.trace_id(), "idhub server ready");

    tokio::signal::ctrl_c()
        .await
        .context("Waiting for shutdown signal")?;

    tracing::info!("idhub server stopped.");
    Ok(())
}
