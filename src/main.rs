use std::sync::Arc;

mod app;
mod auth;
mod config;
mod db;
mod error;
mod plot;
mod state;
mod storage;
mod tabular;
mod uploads;

use crate::{config::AppConfig, db::PgRepository, state::AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "csvplot=debug,axum=info,tower_http=info".to_string());
    let json_logs = std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false);

    if json_logs {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }

    let config = Arc::new(AppConfig::from_env()?);

    let repo = PgRepository::connect(&config.database_url).await?;
    repo.migrate().await?;
    let storage = storage::from_config(&config.storage).await?;

    let app_state = AppState::from_parts(Arc::new(repo.clone()), config, storage);
    let result = app::serve(app::build_app(app_state)).await;

    repo.close().await;
    tracing::info!("database pool closed");
    result
}
