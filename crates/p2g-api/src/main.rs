mod config;
mod error;
mod routes;

use std::sync::Arc;

use config::ApiConfig;
use p2g_core::db::LibSqlSyncStatusRepository;
use routes::{app_router, AppState};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Only load .env in development; deployments inject the environment directly.
    #[cfg(debug_assertions)]
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("p2g_api=info".parse().expect("valid directive"))
                .add_directive("p2g_core=info".parse().expect("valid directive")),
        )
        .init();

    let config = Arc::new(ApiConfig::from_env()?);
    tracing::info!("Starting p2g-api with config: {:?}", config);

    let store = Arc::new(LibSqlSyncStatusRepository::open(&config.app.db_path).await?);
    let state = AppState::from_config(config, store)?;
    let bind_addr = state.config.bind_addr.clone();
    let router = app_router(state);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!("p2g-api listening on {}", bind_addr);
    axum::serve(listener, router).await?;
    Ok(())
}
