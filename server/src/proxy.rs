use crate::access_control::UrlPolicy;
use crate::config::ProxyConfig;
use crate::error::ProxyError;
use crate::inbound::InboundRequest;
use crate::models::{FetchRequest, ProxySource, RelayMode};
use axum::body::Body;
use axum::http::header::{
    ACCEPT, ACCEPT_LANGUAGE, ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS,
    ACCESS_CONTROL_ALLOW_ORIGIN, CONNECTION, CONTENT_TYPE, VARY,
};
use axum::http::{HeaderMap, HeaderValue, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use futures_util::TryStreamExt;
use reqwest::{redirect, Client};
use std::fmt;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, info_span, warn, Instrument};
use url::Url;
use uuid::Uuid;

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/116.0.0.0 Safari/537.36";
const ACCEPT_DOCUMENTS: &str =
    "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8";
const ACCEPT_LANGUAGE_EN: &str = "en-US,en;q=0.9";
const DEFAULT_CONTENT_TYPE: &str = "text/html";
const PLAIN_TEXT: &str = "text/plain; charset=utf-8";
const MAX_REDIRECTS: usize = 10;

pub const PROXY_SOURCE_HEADER: &str = "x-proxy-source";

/// Headers attached to every response, preflight and errors included.
pub fn cors_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
    headers.insert(
        ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("POST, OPTIONS"),
    );
    headers.insert(
        ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static("Content-Type"),
    );
    headers.insert(VARY, HeaderValue::from_static("Origin"));
    headers
}

fn upstream_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static(ACCEPT_DOCUMENTS));
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static(ACCEPT_LANGUAGE_EN));
    headers.insert(CONNECTION, HeaderValue::from_static("close"));
    headers
}

pub enum RelayBody {
    Empty,
    Text(&'static str),
    Buffered(Bytes),
    /// Upstream response whose body has not been read yet.
    Streaming(reqwest::Response),
}

impl RelayBody {
    pub fn into_body(self) -> Body {
        match self {
            RelayBody::Empty => Body::empty(),
            RelayBody::Text(text) => Body::from(text),
            RelayBody::Buffered(bytes) => Body::from(bytes),
            RelayBody::Streaming(upstream) => {
                let url = upstream.url().clone();
                Body::from_stream(upstream.bytes_stream().inspect_err(move |e| {
                    error!("Upstream body for {} ended early: {}", url, e);
                }))
            }
        }
    }

    pub async fn into_bytes(self) -> Result<Bytes, reqwest::Error> {
        match self {
            RelayBody::Empty => Ok(Bytes::new()),
            RelayBody::Text(text) => Ok(Bytes::from_static(text.as_bytes())),
            RelayBody::Buffered(bytes) => Ok(bytes),
            RelayBody::Streaming(upstream) => upstream.bytes().await,
        }
    }
}

impl fmt::Debug for RelayBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RelayBody::Empty => f.write_str("Empty"),
            RelayBody::Text(text) => f.debug_tuple("Text").field(text).finish(),
            RelayBody::Buffered(bytes) => write!(f, "Buffered({} bytes)", bytes.len()),
            RelayBody::Streaming(upstream) => write!(f, "Streaming({})", upstream.url()),
        }
    }
}

/// The single response produced for an inbound request.
#[derive(Debug)]
pub struct ProxyResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: RelayBody,
}

impl ProxyResponse {
    pub fn preflight() -> Self {
        Self {
            status: StatusCode::NO_CONTENT,
            headers: cors_headers(),
            body: RelayBody::Empty,
        }
    }

    pub fn from_error(err: &ProxyError) -> Self {
        let mut headers = cors_headers();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(PLAIN_TEXT));
        Self {
            status: err.status(),
            headers,
            body: RelayBody::Text(err.message()),
        }
    }
}

impl IntoResponse for ProxyResponse {
    fn into_response(self) -> Response {
        (self.status, self.headers, self.body.into_body()).into_response()
    }
}

/// Validates an inbound request, fetches the target once and relays the result.
///
/// Holds no per-request state, so one handler serves any number of concurrent
/// requests. Connection reuse is left to the reqwest client.
#[derive(Debug, Clone)]
pub struct ProxyHandler {
    client: Client,
    policy: UrlPolicy,
    timeout: Duration,
    relay_mode: RelayMode,
    max_body_bytes: usize,
    source: ProxySource,
}

impl ProxyHandler {
    pub fn new(config: &ProxyConfig, source: ProxySource) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .user_agent(DEFAULT_USER_AGENT)
            .default_headers(upstream_headers())
            .redirect(redirect::Policy::limited(MAX_REDIRECTS))
            .no_proxy()
            .build()?;

        Ok(Self {
            client,
            policy: UrlPolicy::new(&config.allowed_domains),
            timeout: config.upstream_timeout,
            relay_mode: config.relay_mode_for(source),
            max_body_bytes: config.max_body_bytes,
            source,
        })
    }

    pub fn source(&self) -> ProxySource {
        self.source
    }

    pub fn relay_mode(&self) -> RelayMode {
        self.relay_mode
    }

    #[cfg(test)]
    fn policy(&self) -> &UrlPolicy {
        &self.policy
    }

    pub async fn handle<R: InboundRequest>(&self, req: R) -> ProxyResponse {
        self.handle_with_error_sink(req, |_| {}).await
    }

    /// Like [`handle`](Self::handle), additionally passing upstream failures to `on_error`.
    pub async fn handle_with_error_sink<R, F>(&self, req: R, on_error: F) -> ProxyResponse
    where
        R: InboundRequest,
        F: FnOnce(&ProxyError),
    {
        let span = info_span!(
            "proxy_request",
            request_id = %Uuid::new_v4(),
            method = %req.method(),
            source = self.source.as_str(),
        );

        async move {
            match self.respond(req).await {
                Ok(response) => response,
                Err(err) if err.is_upstream() => {
                    error!("Failed to fetch upstream page: {}", err);
                    on_error(&err);
                    ProxyResponse::from_error(&err)
                }
                Err(err) => {
                    warn!("Rejected request: {}", err);
                    ProxyResponse::from_error(&err)
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn respond<R: InboundRequest>(&self, req: R) -> Result<ProxyResponse, ProxyError> {
        if req.method() == Method::OPTIONS {
            debug!("Answering CORS preflight");
            return Ok(ProxyResponse::preflight());
        }
        if req.method() != Method::POST {
            return Err(ProxyError::MethodNotAllowed(req.method().clone()));
        }

        let body = req.json_body(self.max_body_bytes).await?;
        let FetchRequest { url } = FetchRequest::from_json(&body);
        let target = self.policy.validate(&url)?;

        self.fetch(target).await
    }

    /// Issues the single upstream GET under the configured deadline.
    ///
    /// The deadline is scoped to this call: when it fires the in-flight request
    /// future is dropped, which aborts the connection. In buffered mode the body
    /// read is covered as well.
    async fn fetch(&self, target: Url) -> Result<ProxyResponse, ProxyError> {
        info!("Fetching upstream page: {}", target);
        let started = Instant::now();

        let exchange = async {
            let upstream = self.client.get(target.clone()).send().await?;
            let status = upstream.status();
            let content_type = upstream
                .headers()
                .get(CONTENT_TYPE)
                .cloned()
                .unwrap_or_else(|| HeaderValue::from_static(DEFAULT_CONTENT_TYPE));

            let body = match self.relay_mode {
                RelayMode::Buffer => RelayBody::Buffered(upstream.bytes().await?),
                RelayMode::Stream => RelayBody::Streaming(upstream),
            };
            Ok::<_, ProxyError>((status, content_type, body))
        };

        let (status, content_type, body) = tokio::time::timeout(self.timeout, exchange)
            .await
            .map_err(|_| ProxyError::Timeout(self.timeout))??;

        info!(
            "Upstream responded for {}. Status: {}, elapsed: {:?}",
            target,
            status,
            started.elapsed()
        );

        let mut headers = cors_headers();
        headers.insert(CONTENT_TYPE, content_type);
        headers.insert(
            PROXY_SOURCE_HEADER,
            HeaderValue::from_static(self.source.as_str()),
        );

        Ok(ProxyResponse {
            status,
            headers,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cors_set_is_fixed() {
        let headers = cors_headers();
        assert_eq!(headers[ACCESS_CONTROL_ALLOW_ORIGIN], "*");
        assert_eq!(headers[ACCESS_CONTROL_ALLOW_METHODS], "POST, OPTIONS");
        assert_eq!(headers[ACCESS_CONTROL_ALLOW_HEADERS], "Content-Type");
        assert_eq!(headers[VARY], "Origin");
        assert_eq!(headers.len(), 4);
    }

    #[test]
    fn error_responses_are_plain_text_with_cors() {
        let response = ProxyResponse::from_error(&ProxyError::InvalidUrl("nope".into()));
        assert_eq!(response.status, StatusCode::BAD_REQUEST);
        assert_eq!(response.headers[CONTENT_TYPE], PLAIN_TEXT);
        assert_eq!(response.headers[ACCESS_CONTROL_ALLOW_ORIGIN], "*");
        assert!(matches!(response.body, RelayBody::Text("Invalid URL")));
    }

    #[test]
    fn preflight_has_no_content_type() {
        let response = ProxyResponse::preflight();
        assert_eq!(response.status, StatusCode::NO_CONTENT);
        assert!(response.headers.get(CONTENT_TYPE).is_none());
        assert!(matches!(response.body, RelayBody::Empty));
    }

    #[test]
    fn handler_takes_relay_mode_from_config() {
        let config = ProxyConfig::default();
        let edge = ProxyHandler::new(&config, ProxySource::Edge).unwrap();
        assert_eq!(edge.relay_mode(), RelayMode::Stream);

        let function = ProxyHandler::new(&config, ProxySource::Function).unwrap();
        assert_eq!(function.relay_mode(), RelayMode::Buffer);

        let config = ProxyConfig {
            relay_mode: Some(RelayMode::Buffer),
            allowed_domains: vec!["example.com".into()],
            ..ProxyConfig::default()
        };
        let socket = ProxyHandler::new(&config, ProxySource::Socket).unwrap();
        assert_eq!(socket.relay_mode(), RelayMode::Buffer);
        assert_eq!(socket.policy().allowed_domains(), ["example.com"]);
    }
}
