use crate::error::ProxyError;
use axum::body::{Body, HttpBody};
use axum::http::{Method, Request};
use axum::BoxError;
use bytes::Bytes;
use serde_json::Value;
use std::future::Future;

/// What the proxy needs from a host runtime's request: its method and a JSON body.
///
/// Each hosting variant implements this once; the proxy logic only sees the trait.
pub trait InboundRequest: Send + Sized {
    fn method(&self) -> &Method;

    /// Reads the raw body, refusing anything longer than `limit` bytes.
    fn body_bytes(self, limit: usize) -> impl Future<Output = Result<Bytes, ProxyError>> + Send;

    fn json_body(self, limit: usize) -> impl Future<Output = Result<Value, ProxyError>> + Send {
        async move {
            let bytes = self.body_bytes(limit).await?;
            Ok(serde_json::from_slice(&bytes)?)
        }
    }
}

impl<B> InboundRequest for Request<B>
where
    B: HttpBody<Data = Bytes> + Send + 'static,
    B::Error: Into<BoxError>,
{
    fn method(&self) -> &Method {
        Request::method(self)
    }

    fn body_bytes(self, limit: usize) -> impl Future<Output = Result<Bytes, ProxyError>> + Send {
        let body = Body::new(self.into_body());
        async move {
            axum::body::to_bytes(body, limit)
                .await
                .map_err(ProxyError::UnreadableBody)
        }
    }
}
