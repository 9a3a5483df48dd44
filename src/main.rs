use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use studio_cms_api::auth::JwtSessionResolver;
use studio_cms_api::config::{self, DataBackend};
use studio_cms_api::database::{Database, DatabaseManager};
use studio_cms_api::server;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up DATABASE_URL, JWT_SECRET, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = config::config();
    tracing::info!("Starting Studio CMS API in {:?} mode", config.environment);
    config.validate()?;

    let db = match config.database.backend {
        DataBackend::Postgres => Database::postgres(DatabaseManager::connect(&config.database).await?),
        DataBackend::Memory => {
            tracing::warn!("Using in-memory storage; content is lost on restart");
            Database::memory()
        }
    };

    let sessions = Arc::new(JwtSessionResolver::from_config(&config.security));
    let app = server::app(config, db, sessions);

    let bind_addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;

    tracing::info!(
        "Listening on http://{} (procedures under {})",
        bind_addr,
        config.server.trpc_prefix
    );

    axum::serve(listener, app).await?;
    Ok(())
}
