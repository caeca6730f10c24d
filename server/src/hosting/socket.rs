use crate::proxy::ProxyHandler;
use axum::response::IntoResponse;
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::Request;
use hyper_util::rt::TokioIo;
use hyper_util::server::graceful::GracefulShutdown;
use std::convert::Infallible;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, error, info};

const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// Plain accept loop: one task per TCP connection, HTTP/1.1 parsed by hyper.
///
/// Accept and connection errors are logged and never end the loop; only
/// `shutdown` does. After it fires no new connections are accepted, and the
/// call returns once every open connection has finished its in-flight request.
pub async fn serve<S>(
    listener: TcpListener,
    handler: Arc<ProxyHandler>,
    shutdown: S,
) -> std::io::Result<()>
where
    S: Future<Output = ()>,
{
    info!(
        "Standalone server listening on {} ({})",
        listener.local_addr()?,
        handler.source()
    );
    tokio::pin!(shutdown);
    let graceful = GracefulShutdown::new();

    loop {
        tokio::select! {
            accepted = listener.accept() => match accepted {
                Ok((stream, peer)) => {
                    debug!("Accepted connection from {}", peer);
                    tokio::spawn(serve_connection(stream, handler.clone(), &graceful));
                }
                Err(e) => {
                    error!("Failed to accept connection: {}", e);
                    tokio::time::sleep(ACCEPT_BACKOFF).await;
                }
            },
            _ = &mut shutdown => {
                info!("Standalone server stopped accepting connections");
                break;
            }
        }
    }

    graceful.shutdown().await;
    info!("Standalone server drained open connections");
    Ok(())
}

fn serve_connection(
    stream: TcpStream,
    handler: Arc<ProxyHandler>,
    graceful: &GracefulShutdown,
) -> impl Future<Output = ()> + Send + 'static {
    let service = service_fn(move |request: Request<Incoming>| {
        let handler = handler.clone();
        async move { Ok::<_, Infallible>(handler.handle(request).await.into_response()) }
    });

    let connection = http1::Builder::new().serve_connection(TokioIo::new(stream), service);
    let connection = graceful.watch(connection);

    async move {
        if let Err(e) = connection.await {
            debug!("Connection closed with error: {:?}", e);
        }
    }
}
