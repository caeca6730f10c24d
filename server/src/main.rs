use fetch_proxy_server::hosting::{edge, shutdown_signal, socket};
use fetch_proxy_server::logging::setup_tracing;
use fetch_proxy_server::models::ListenerVariant;
use fetch_proxy_server::{ProxyConfig, ProxyHandler};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    setup_tracing();

    let config = match ProxyConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Invalid configuration: {}", e);
            return Err(e.into());
        }
    };

    info!("Starting fetch proxy ({:?} variant)...", config.variant);
    if !config.allowed_domains.is_empty() {
        info!("Restricting targets to: {}", config.allowed_domains.join(", "));
    }

    let handler = Arc::new(ProxyHandler::new(&config, config.variant.source())?);
    let listener = TcpListener::bind(config.listen_addr()).await?;

    match config.variant {
        ListenerVariant::Edge => edge::serve(listener, handler, shutdown_signal()).await?,
        ListenerVariant::Socket => socket::serve(listener, handler, shutdown_signal()).await?,
    }

    info!("Fetch proxy shut down.");
    Ok(())
}
