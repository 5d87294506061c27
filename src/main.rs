use std::sync::Arc;

use anyhow::Context;

use qm_gatekeeper::config::AppConfig;
use qm_gatekeeper::database::{self, PgAccessStore, PgSessionStore};
use qm_gatekeeper::gatekeeper::Gatekeeper;
use qm_gatekeeper::handlers::Upstream;
use qm_gatekeeper::{build_router, logging, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up DATABASE_URL, SESSION_JWT_SECRET, etc.
    let _ = dotenvy::dotenv();

    logging::init_tracing();

    let config = AppConfig::from_env();
    config.validate().context("invalid configuration")?;
    tracing::info!("Starting gatekeeper in {:?} mode", config.environment);

    let pool = database::connect(&config.database)
        .await
        .context("failed to connect to database")?;

    let sessions = PgSessionStore::from_config(pool.clone(), &config.session)
        .context("failed to build session store")?;
    let access = PgAccessStore::new(pool.clone());
    let gatekeeper = Gatekeeper::new(Arc::new(sessions), Arc::new(access));

    let upstream = Upstream::new(&config.server.upstream_url, config.server.max_request_size_bytes)
        .context("failed to build upstream client")?;

    let state = AppState::new(gatekeeper, &config.session, upstream).with_pool(pool);
    let app = build_router(state, &config.security);

    let bind_addr = format!("0.0.0.0:{}", config.server.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;

    tracing::info!(upstream = %config.server.upstream_url, "gatekeeper listening on http://{}", bind_addr);

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
