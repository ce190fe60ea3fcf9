//! In-process HTTP invocation used by the bridge
//!
//! The bridge never opens a second network connection: it builds a request
//! object, hands it to the clipboard's handler and records the response.

use std::fmt;
use std::net::SocketAddr;

use async_trait::async_trait;
use axum::body::Body;
use axum::extract::ConnectInfo;
use axum::Router;
use bytes::Bytes;
use http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode, Uri};
use tokio::io::AsyncRead;
use tokio_util::io::ReaderStream;
use tower::ServiceExt;
use url::Url;

use crate::{Error, Result};

/// Streaming request body
pub type RequestBody = Box<dyn AsyncRead + Send + Unpin>;

/// Request handed to an [`Upstream`]
pub struct UpstreamRequest {
    pub method: Method,
    /// Absolute path, e.g. `/nc` or `/notes.txt`
    pub path: String,
    pub headers: HeaderMap,
    pub remote_addr: Option<SocketAddr>,
    pub body: RequestBody,
}

impl fmt::Debug for UpstreamRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UpstreamRequest")
            .field("method", &self.method)
            .field("path", &self.path)
            .field("headers", &self.headers)
            .field("remote_addr", &self.remote_addr)
            .finish_non_exhaustive()
    }
}

impl UpstreamRequest {
    /// Request with an empty body
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            headers: HeaderMap::new(),
            remote_addr: None,
            body: Box::new(tokio::io::empty()),
        }
    }

    pub fn with_body(mut self, body: impl AsyncRead + Send + Unpin + 'static) -> Self {
        self.body = Box::new(body);
        self
    }

    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn with_remote_addr(mut self, remote_addr: Option<SocketAddr>) -> Self {
        self.remote_addr = remote_addr;
        self
    }
}

/// Recorded response of an [`Upstream`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamResponse {
    pub status: StatusCode,
    pub body: Bytes,
}

impl UpstreamResponse {
    pub fn new(status: StatusCode, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }
}

/// HTTP handler the bridge forwards to. Shared by all connections.
#[async_trait]
pub trait Upstream: Send + Sync {
    async fn invoke(&self, request: UpstreamRequest) -> Result<UpstreamResponse>;
}

/// [`Upstream`] backed by the clipboard's axum router
#[derive(Clone)]
pub struct RouterUpstream {
    router: Router,
}

impl RouterUpstream {
    pub fn new(router: Router) -> Self {
        Self { router }
    }
}

#[async_trait]
impl Upstream for RouterUpstream {
    async fn invoke(&self, request: UpstreamRequest) -> Result<UpstreamResponse> {
        let UpstreamRequest {
            method,
            path,
            headers,
            remote_addr,
            body,
        } = request;

        let mut http_request = http::Request::builder()
            .method(method)
            .uri(request_uri(&path)?)
            .body(Body::from_stream(ReaderStream::new(body)))
            .map_err(|e| Error::Bridge(format!("cannot create forwarding request: {e}")))?;
        *http_request.headers_mut() = headers;
        if let Some(addr) = remote_addr {
            http_request.extensions_mut().insert(ConnectInfo(addr));
        }

        let response = match self.router.clone().oneshot(http_request).await {
            Ok(response) => response,
            Err(never) => match never {},
        };
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .map_err(|e| Error::Bridge(format!("cannot read upstream response: {e}")))?;

        Ok(UpstreamResponse { status, body })
    }
}

/// Percent-encode a raw path (`/my notes.txt`) into a request URI, keeping `/`
/// separators. `?` and `#` are encoded too, so they stay part of the path.
fn request_uri(path: &str) -> Result<Uri> {
    let mut url = Url::parse("http://localhost/")
        .map_err(|e| Error::Bridge(format!("cannot create forwarding request: {e}")))?;
    url.set_path(path);
    url.path()
        .parse()
        .map_err(|e| Error::Bridge(format!("cannot create forwarding request: {e}")))
}
