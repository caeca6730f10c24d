use crate::proxy::ProxyHandler;
use axum::extract::{Request, State};
use axum::response::{IntoResponse, Response};
use axum::Router;
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

/// Router that sends every path and method to the proxy handler.
pub fn router(handler: Arc<ProxyHandler>) -> Router {
    Router::new().fallback(proxy_handler).with_state(handler)
}

async fn proxy_handler(State(handler): State<Arc<ProxyHandler>>, request: Request) -> Response {
    handler.handle(request).await.into_response()
}

pub async fn serve<S>(
    listener: TcpListener,
    handler: Arc<ProxyHandler>,
    shutdown: S,
) -> std::io::Result<()>
where
    S: Future<Output = ()> + Send + 'static,
{
    info!(
        "Edge listener serving on {} ({})",
        listener.local_addr()?,
        handler.source()
    );
    axum::serve(listener, router(handler))
        .with_graceful_shutdown(shutdown)
        .await
}
