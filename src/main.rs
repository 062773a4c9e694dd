// src/main.rs
use std::error::Error;
use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use backoffice::config::Config;
use backoffice::server::{self, AppState};

const VERSION: &str = env!("CARGO_PKG_VERSION");
const DEFAULT_LOG_FILTER: &str = "backoffice=info,tower_http=info";

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)))
        .init();

    tracing::info!(version = VERSION, "starting backoffice");

    let config = Config::from_env()?;
    let state = AppState::from_config(&config).await?;
    server::serve(config.bind, Arc::new(state)).await?;

    Ok(())
}
