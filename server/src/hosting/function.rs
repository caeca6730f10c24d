use crate::error::ProxyError;
use crate::inbound::InboundRequest;
use crate::proxy::{ProxyHandler, ProxyResponse};
use axum::http::{HeaderMap, Method, StatusCode};
use bytes::Bytes;
use std::fmt;
use std::future::Future;

/// Error sink supplied by a function runtime.
pub type ErrorCallback = Box<dyn Fn(&ProxyError) + Send + Sync>;

/// Request as a function runtime hands it over: already fully received.
#[derive(Debug, Clone)]
pub struct FunctionRequest {
    pub method: Method,
    pub body: Bytes,
}

impl FunctionRequest {
    pub fn new(method: Method, body: impl Into<Bytes>) -> Self {
        Self {
            method,
            body: body.into(),
        }
    }
}

impl InboundRequest for FunctionRequest {
    fn method(&self) -> &Method {
        &self.method
    }

    fn body_bytes(self, limit: usize) -> impl Future<Output = Result<Bytes, ProxyError>> + Send {
        let result = if self.body.len() > limit {
            Err(ProxyError::BodyTooLarge(limit))
        } else {
            Ok(self.body)
        };
        std::future::ready(result)
    }
}

pub struct FunctionContext {
    pub req: FunctionRequest,
    pub error: Option<ErrorCallback>,
}

impl FunctionContext {
    pub fn new(req: FunctionRequest) -> Self {
        Self { req, error: None }
    }

    pub fn with_error_callback<F>(mut self, callback: F) -> Self
    where
        F: Fn(&ProxyError) + Send + Sync + 'static,
    {
        self.error = Some(Box::new(callback));
        self
    }
}

impl fmt::Debug for FunctionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionContext")
            .field("req", &self.req)
            .field("error", &self.error.is_some())
            .finish()
    }
}

/// Fully buffered response handed back to the function runtime.
#[derive(Debug, Clone)]
pub struct FunctionResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl FunctionResponse {
    fn from_error(err: &ProxyError) -> Self {
        let ProxyResponse { status, headers, .. } = ProxyResponse::from_error(err);
        Self {
            status,
            headers,
            body: Bytes::from_static(err.message().as_bytes()),
        }
    }
}

/// Entry point for function-as-a-service runtimes.
///
/// The runtime cannot take a live stream, so a streamed relay body is read to
/// the end here; a failure while doing so is reported like any other upstream
/// failure.
pub async fn handle_function(handler: &ProxyHandler, context: FunctionContext) -> FunctionResponse {
    let FunctionContext { req, error } = context;
    let report = |err: &ProxyError| {
        if let Some(callback) = &error {
            callback(err);
        }
    };

    let ProxyResponse {
        status,
        headers,
        body,
    } = handler.handle_with_error_sink(req, report).await;

    match body.into_bytes().await {
        Ok(body) => FunctionResponse {
            status,
            headers,
            body,
        },
        Err(e) => {
            let err = ProxyError::Upstream(e);
            tracing::error!("Failed to buffer upstream body: {}", err);
            report(&err);
            FunctionResponse::from_error(&err)
        }
    }
}
