//! Upstream HTTP client.
//!
//! # Responsibilities
//! - Own the pooled connection to all upstreams (HTTP and HTTPS)
//! - Enforce connect, response-header and read-idle timeouts
//! - Classify transport failures as timeout or generic failure
//!
//! # Design Decisions
//! - Requests carry an `http::Uri`, so the query string goes out exactly as the
//!   client sent it
//! - Timeouts are enforced here only; the engine adds none of its own
//! - No retries: every failure is terminal for the request
//! - Redirects are not followed; the upstream's answer is relayed as is

use std::fmt;
use std::time::Duration;

use axum::body::{Body, Bytes};
use axum::http::{HeaderMap, Method, Request, StatusCode, Uri};
use futures_util::stream::{self, Stream, StreamExt};
use hyper_rustls::{HttpsConnector, HttpsConnectorBuilder};
use hyper_util::client::legacy::{connect::HttpConnector, Client};
use hyper_util::rt::{TokioExecutor, TokioTimer};
use thiserror::Error;

use crate::config::schema::UpstreamConfig;
use crate::error::GatewayError;

/// Failure while reading an upstream response body.
#[derive(Debug, Error)]
pub enum ReadError {
    #[error("no data received for {0:?}")]
    Idle(Duration),

    #[error(transparent)]
    Body(#[from] axum::Error),
}

/// Pooled client shared by all requests.
#[derive(Clone)]
pub struct UpstreamClient {
    inner: Client<HttpsConnector<HttpConnector>, Body>,
    response_header_timeout: Duration,
    read_timeout: Duration,
}

impl fmt::Debug for UpstreamClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UpstreamClient")
            .field("response_header_timeout", &self.response_header_timeout)
            .field("read_timeout", &self.read_timeout)
            .finish_non_exhaustive()
    }
}

impl UpstreamClient {
    pub fn new(config: &UpstreamConfig) -> Self {
        let mut http = HttpConnector::new();
        http.enforce_http(false);
        http.set_connect_timeout(Some(Duration::from_secs(config.connect_timeout_secs)));

        let https = HttpsConnectorBuilder::new()
            .with_webpki_roots()
            .https_or_http()
            .enable_http1()
            .wrap_connector(http);

        let inner = Client::builder(TokioExecutor::new())
            .pool_idle_timeout(Duration::from_secs(config.pool_idle_timeout_secs))
            .pool_timer(TokioTimer::new())
            .build(https);

        Self {
            inner,
            response_header_timeout: Duration::from_secs(config.response_header_timeout_secs),
            read_timeout: Duration::from_secs(config.read_timeout_secs),
        }
    }

    /// Send a request and wait for the response head.
    ///
    /// Dropping the returned future aborts the upstream call.
    pub async fn send(
        &self,
        method: Method,
        uri: Uri,
        headers: HeaderMap,
        body: Vec<u8>,
    ) -> Result<UpstreamResponse, GatewayError> {
        let mut request = Request::new(Body::from(body));
        *request.method_mut() = method;
        *request.uri_mut() = uri;
        *request.headers_mut() = headers;

        match tokio::time::timeout(self.response_header_timeout, self.inner.request(request)).await {
            Ok(Ok(response)) => {
                let (parts, body) = response.into_parts();
                Ok(UpstreamResponse {
                    status: parts.status,
                    headers: parts.headers,
                    body: Body::new(body),
                    read_timeout: self.read_timeout,
                })
            }
            Ok(Err(e)) if is_timeout(&e) => Err(GatewayError::UpstreamTimeout(e.to_string())),
            Ok(Err(e)) => Err(GatewayError::UpstreamRequest(e)),
            Err(_) => Err(GatewayError::UpstreamTimeout(format!(
                "no response headers within {:?}",
                self.response_header_timeout
            ))),
        }
    }
}

/// Upstream response whose body has not been read yet.
pub struct UpstreamResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: Body,
    read_timeout: Duration,
}

impl UpstreamResponse {
    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Body chunks as they arrive. Each read waits at most the idle timeout.
    pub fn into_stream(self) -> impl Stream<Item = Result<Bytes, ReadError>> + Send + 'static {
        let idle = self.read_timeout;
        stream::unfold(self.body.into_data_stream(), move |mut body| async move {
            match tokio::time::timeout(idle, body.next()).await {
                Ok(Some(Ok(chunk))) => Some((Ok(chunk), body)),
                Ok(Some(Err(e))) => Some((Err(ReadError::Body(e)), body)),
                Ok(None) => None,
                Err(_) => Some((Err(ReadError::Idle(idle)), body)),
            }
        })
    }

    /// Read the whole body.
    pub async fn bytes(self) -> Result<Bytes, ReadError> {
        let mut stream = Box::pin(self.into_stream());
        let mut buf = Vec::new();
        while let Some(chunk) = stream.next().await {
            buf.extend_from_slice(&chunk?);
        }
        Ok(Bytes::from(buf))
    }
}

/// True when any error in the chain is an I/O timeout (e.g. connect timeout).
fn is_timeout(err: &(dyn std::error::Error + 'static)) -> bool {
    let mut current = Some(err);
    while let Some(e) = current {
        if let Some(io) = e.downcast_ref::<std::io::Error>() {
            if io.kind() == std::io::ErrorKind::TimedOut {
                return true;
            }
        }
        current = e.source();
    }
    false
}
