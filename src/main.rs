use std::sync::Arc;

use tracing_subscriber::EnvFilter;

mod api;
mod config;
mod error;
mod gate;
mod relay;

use api::routes::{create_router, AppState};
use config::ProxyConfig;
use gate::AccessGate;
use relay::TtsRelay;

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();

    // Initialize logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if std::env::var("LOG_FORMAT").map(|f| f == "json").unwrap_or(false) {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    let config = match ProxyConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    tracing::info!("TTS relay proxy v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Starting server on http://{}", config.listen_addr);
    tracing::info!("Upstream: {}", config.upstream.endpoint.path());
    tracing::info!("Allowed origin: {:?}", config.allowed_origin);
    tracing::info!("Proxy tokens configured: {}", config.tokens.count());

    let client = relay::client::build_client().expect("Failed to build HTTP client");

    let state = Arc::new(AppState {
        gate: AccessGate::new(config.allowed_origin, config.tokens),
        relay: TtsRelay::new(client, Arc::new(config.upstream)),
    });

    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(config.listen_addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .await
        .expect("Server error");
}
