#![deny(unsafe_code)]
#![warn(clippy::pedantic)]
// easier to use when using the functions as callback of foreign functions
#![allow(clippy::needless_pass_by_value)]

use std::net::SocketAddr;

use anyhow::Result;
use axum::Extension;
use axum::Router;
use axum::routing::get;
use axum_client_ip::ClientIpSource;
use tower_http::trace::TraceLayer;
use tracing_subscriber::prelude::*;

use crate::api::router;
use crate::database::Database;
use crate::database::DatabaseConfig;
use crate::notes::ensure_clipboard_note;
use crate::pin::PinConfig;
use crate::rate_limit::RateLimiter;

mod api;
mod client_ip;
mod database;
mod notes;
mod pin;
mod rate_limit;
mod root;
#[cfg(test)]
mod tests;

const DEFAULT_RUST_LOG: &str = "pinboard=debug,tower_http=debug";
const DEFAULT_ADDRESS: &str = "0.0.0.0:3001";

#[tokio::main]
async fn main() -> Result<()> {
    setup_environment();
    setup_tracing();

    let app = setup_app(DatabaseConfig::DetectConfig).await?;

    let address = setup_address()?;
    tracing::info!("Listening on {}", address);

    let listener = tokio::net::TcpListener::bind(address).await?;

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    Ok(())
}

/// Create and setup the app with its dependencies
///
/// # Errors
///
/// Will return `Err` if any of its dependencies fail to load:
/// - Database connection
/// - Clipboard note setup
pub async fn setup_app(config: DatabaseConfig) -> Result<Router> {
    let database = Database::from_config(config).await;

    // runs before the server accepts traffic
    ensure_clipboard_note(&database).await?;

    Ok(create_router(database))
}

/// Create the router for Pinboard
fn create_router(database: Database) -> Router {
    let pin_config = setup_pin_config();
    let rate_limiter = RateLimiter::new();

    Router::new()
        .nest("/api", router())
        .route("/", get(root::root))
        .layer(TraceLayer::new_for_http())
        .layer(Extension(database))
        .layer(Extension(pin_config))
        .layer(Extension(rate_limiter))
        .layer(ClientIpSource::ConnectInfo.into_extension())
}

fn setup_environment() {
    dotenvy::dotenv().ok();
}

fn setup_tracing() {
    use tracing_subscriber::EnvFilter;
    use tracing_subscriber::fmt;
    use tracing_subscriber::registry;

    registry()
        .with(EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| DEFAULT_RUST_LOG.into()),
        ))
        .with(fmt::layer())
        .init();
}

fn setup_pin_config() -> PinConfig {
    use crate::pin::generate;

    let pin = env_var_or_else("HIDDEN_NOTES_PIN", || {
        let pin = generate();
        tracing::info!("`HIDDEN_NOTES_PIN` is not set, generating temporary one: {pin}");
        pin
    });

    let secure_cookies = std::env::var("APP_ENV").is_ok_and(|app_env| app_env == "production");

    PinConfig::new(pin, secure_cookies)
}

fn setup_address() -> Result<SocketAddr> {
    let mut address =
        env_var_or_else("ADDRESS", || String::from(DEFAULT_ADDRESS)).parse::<SocketAddr>()?;

    // optional override of just the port
    if let Ok(port) = std::env::var("PORT") {
        // only check non-empty strings
        if !port.is_empty() {
            let port = port.parse::<u16>()?;

            address.set_port(port);
        }
    }

    Ok(address)
}

/// Get the value of ENV var, or a default
///
/// Only when:
/// - It is set
/// - It is not empty
fn env_var_or_else(var_name: &'static str, or_else: fn() -> String) -> String {
    if let Ok(value) = std::env::var(var_name) {
        if !value.is_empty() {
            return value;
        }
    }

    or_else()
}

/// Handler for graceful shutdown
///
/// Will listen to Ctrl+C and SIGTERM to initiate a shutdown
async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        signal::ctrl_c().await.expect("Valid CTRL+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Valid terminate handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("Terminate signal received, starting graceful shutdown");
}
