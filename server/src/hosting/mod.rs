//! Host runtimes the proxy can run under. Each one adapts its own request and
//! response shapes to [`ProxyHandler`](crate::proxy::ProxyHandler).

pub mod edge;
pub mod function;
pub mod socket;

use tracing::info;

/// Resolves on Ctrl-C, or on SIGTERM on Unix.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if tokio::signal::ctrl_c().await.is_err() {
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(_) => std::future::pending::<()>().await,
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Ctrl-C received, shutting down..."),
        _ = terminate => info!("SIGTERM received, shutting down..."),
    }
}
