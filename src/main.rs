// src/main.rs
mod auth;
mod config;
mod database;
mod dtos;
mod error;
mod extract;
mod handlers;
mod logging;
mod middleware;
mod models;
mod query;
mod routes;
mod state;
mod store;

#[cfg(test)]
mod testing;

use std::{net::SocketAddr, sync::Arc};

use dotenvy::dotenv;
use http::{HeaderValue, Method};
use thiserror::Error;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};

use crate::config::{Config, ConfigError};
use crate::logging::LoggingError;
use crate::state::AppState;
use crate::store::postgres::PgStore;

/// How many ports above `PORT` to try when it is already taken.
const PORT_FALLBACK_RANGE: u16 = 20;

#[derive(Debug, Error)]
enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Logging(#[from] LoggingError),

    #[error("cannot connect to database: {0}")]
    Database(#[from] sqlx::Error),

    #[error("migrations failed: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error("invalid CORS origin {0:?}")]
    CorsOrigin(String),

    #[error("failed to bind to any port starting at {port} on {host}")]
    Bind { host: std::net::IpAddr, port: u16 },

    #[error("server error: {0}")]
    Serve(#[from] std::io::Error),
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        // The subscriber may not be installed yet.
        eprintln!("{e}");
        tracing::error!(error = %e, "Server failed to start");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), StartupError> {
    dotenv().ok();

    let config = Config::from_env()?;
    logging::init(&config)?;

    let pool = database::create_pool(&config).await?;
    if config.run_migrations {
        database::run_migrations(&pool).await?;
        tracing::info!("Migrations applied");
    }

    let app_state = AppState::new(Arc::new(PgStore::new(pool)), config.bcrypt_cost);
    let app = routes::create_app(app_state, cors_layer(&config)?);

    let listener = bind(&config).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

/// Any origin when none are configured.
fn cors_layer(config: &Config) -> Result<CorsLayer, StartupError> {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([http::header::CONTENT_TYPE, http::header::AUTHORIZATION]);

    if config.cors_origins.is_empty() {
        return Ok(layer.allow_origin(Any));
    }

    let origins = config
        .cors_origins
        .iter()
        .map(|o| HeaderValue::from_str(o).map_err(|_| StartupError::CorsOrigin(o.clone())))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(layer.allow_origin(origins))
}

// Try PORT..PORT+20 to avoid crashing when the address is in use
async fn bind(config: &Config) -> Result<TcpListener, StartupError> {
    for offset in 0..=PORT_FALLBACK_RANGE {
        let port = config.port.saturating_add(offset);
        let addr = SocketAddr::from((config.host, port));
        match TcpListener::bind(addr).await {
            Ok(listener) => {
                tracing::info!("Server running on {}", addr);
                return Ok(listener);
            }
            Err(e) => {
                if offset == 0 {
                    tracing::warn!(%addr, error = %e, "Port in use, trying next");
                }
            }
        }
    }
    Err(StartupError::Bind { host: config.host, port: config.port })
}
