//! HTTP transport boundary
//!
//! The dispatcher never talks to `reqwest` directly; it hands a
//! [`TransportRequest`] to a [`Transport`] and gets status plus body back.
//! [`ReqwestTransport`] is the default implementation and can be wrapped in
//! `tower` layers (see [`crate::middleware`]).

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use http::Method;
use reqwest::Client;
use serde_json::Value;
use tower::{Layer, Service};

use crate::error::WechatError;

pub(crate) const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub(crate) const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Boxed `Send` future used by the object-safe traits of this crate.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

type MiddlewareFuture =
    Pin<Box<dyn Future<Output = Result<reqwest::Response, reqwest::Error>> + Send>>;
type MiddlewareExecutor = Arc<dyn Fn(reqwest::Request) -> MiddlewareFuture + Send + Sync>;

/// A binary payload sent as one part of a multipart form.
#[derive(Debug, Clone)]
pub struct FilePart {
    pub field: String,
    pub filename: String,
    pub content: Vec<u8>,
    pub content_type: Option<String>,
}

impl FilePart {
    pub fn new(
        field: impl Into<String>,
        filename: impl Into<String>,
        content: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            field: field.into(),
            filename: filename.into(),
            content: content.into(),
            content_type: None,
        }
    }

    pub fn content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }
}

/// A fully resolved outgoing request.
#[derive(Debug, Clone)]
pub struct TransportRequest {
    pub method: Method,
    pub url: String,
    pub query: Vec<(String, String)>,
    pub json: Option<Value>,
    pub files: Vec<FilePart>,
    pub timeout: Option<Duration>,
}

/// Raw status and body of a completed exchange.
#[derive(Debug, Clone)]
pub struct TransportResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl TransportResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Performs one HTTP exchange.
///
/// Implementations must report network faults as [`WechatError::Transport`]
/// and keep timeouts distinguishable (`HttpError::Timeout`). They must not
/// interpret the body.
pub trait Transport: Send + Sync {
    fn send(&self, request: TransportRequest)
        -> BoxFuture<'_, Result<TransportResponse, WechatError>>;
}

/// Innermost `tower` service: executes a request on a `reqwest::Client`.
///
/// Middleware layers passed to [`ReqwestTransport::with_middleware`] wrap this.
#[derive(Debug, Clone)]
pub struct HttpService {
    http: Client,
}

impl HttpService {
    pub fn new(http: Client) -> Self {
        Self { http }
    }
}

impl Service<reqwest::Request> for HttpService {
    type Response = reqwest::Response;
    type Error = reqwest::Error;
    type Future = MiddlewareFuture;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: reqwest::Request) -> Self::Future {
        let client = self.http.clone();
        Box::pin(async move { client.execute(req).await })
    }
}

/// [`Transport`] backed by `reqwest`, optionally routed through a middleware stack.
#[derive(Clone)]
pub struct ReqwestTransport {
    http: Client,
    middleware_executor: Option<MiddlewareExecutor>,
}

impl std::fmt::Debug for ReqwestTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReqwestTransport")
            .field(
                "middleware_executor",
                &self.middleware_executor.as_ref().map(|_| ".."),
            )
            .finish_non_exhaustive()
    }
}

impl ReqwestTransport {
    pub fn new(http: Client) -> Self {
        Self {
            http,
            middleware_executor: None,
        }
    }

    pub fn builder() -> ReqwestTransportBuilder {
        ReqwestTransportBuilder::default()
    }

    /// Returns the underlying [`reqwest::Client`].
    ///
    /// Requests made through it bypass the middleware stack.
    pub fn http(&self) -> &Client {
        &self.http
    }

    /// Route every request through `layer` wrapped around [`HttpService`].
    pub fn with_middleware<L>(mut self, layer: L) -> Self
    where
        L: Layer<HttpService>,
        L::Service: Service<reqwest::Request, Response = reqwest::Response, Error = reqwest::Error>
            + Clone
            + Send
            + Sync
            + 'static,
        <L::Service as Service<reqwest::Request>>::Future: Send + 'static,
    {
        let service = layer.layer(HttpService::new(self.http.clone()));
        self.middleware_executor = Some(make_middleware_executor(service));
        self
    }

    fn build_request(&self, request: TransportRequest) -> Result<reqwest::Request, WechatError> {
        let TransportRequest {
            method,
            url,
            query,
            json,
            files,
            timeout,
        } = request;

        let mut builder = self.http.request(method, url);
        if !query.is_empty() {
            builder = builder.query(&query);
        }
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        if files.is_empty() {
            if let Some(body) = json {
                builder = builder.json(&body);
            }
        } else {
            builder = builder.multipart(multipart_form(json, files)?);
        }

        Ok(builder.build()?)
    }

    async fn send_request(
        &self,
        request: reqwest::Request,
    ) -> Result<reqwest::Response, reqwest::Error> {
        if let Some(executor) = &self.middleware_executor {
            (executor)(request).await
        } else {
            self.http.execute(request).await
        }
    }
}

impl Transport for ReqwestTransport {
    fn send(
        &self,
        request: TransportRequest,
    ) -> BoxFuture<'_, Result<TransportResponse, WechatError>> {
        Box::pin(async move {
            let request = self.build_request(request)?;
            let response = self.send_request(request).await?;
            let status = response.status().as_u16();
            let body = response.bytes().await?.to_vec();
            Ok(TransportResponse { status, body })
        })
    }
}

/// Files become file parts; top-level JSON fields become text parts
/// (strings verbatim, anything else JSON-encoded).
fn multipart_form(
    json: Option<Value>,
    files: Vec<FilePart>,
) -> Result<reqwest::multipart::Form, WechatError> {
    let mut form = reqwest::multipart::Form::new();

    if let Some(Value::Object(fields)) = json {
        for (name, value) in fields {
            let text = match value {
                Value::String(s) => s,
                other => other.to_string(),
            };
            form = form.text(name, text);
        }
    }

    for file in files {
        let mut part = reqwest::multipart::Part::bytes(file.content).file_name(file.filename);
        if let Some(content_type) = file.content_type {
            part = part.mime_str(&content_type)?;
        }
        form = form.part(file.field, part);
    }

    Ok(form)
}

fn make_middleware_executor<S>(service: S) -> MiddlewareExecutor
where
    S: Service<reqwest::Request, Response = reqwest::Response, Error = reqwest::Error>
        + Clone
        + Send
        + Sync
        + 'static,
    S::Future: Send + 'static,
{
    let service = Arc::new(service);

    Arc::new(move |request: reqwest::Request| {
        let mut service = (*service).clone();
        Box::pin(async move {
            std::future::poll_fn(|cx| service.poll_ready(cx)).await?;
            service.call(request).await
        })
    })
}

/// Builder for [`ReqwestTransport`]
#[derive(Debug, Default)]
pub struct ReqwestTransportBuilder {
    timeout: Option<Duration>,
    connect_timeout: Option<Duration>,
}

impl ReqwestTransportBuilder {
    /// Total request timeout. Default: 30 seconds
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Connection timeout. Default: 10 seconds
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    pub fn build(self) -> Result<ReqwestTransport, WechatError> {
        let timeout = self
            .timeout
            .unwrap_or(Duration::from_secs(DEFAULT_TIMEOUT_SECS));
        let connect_timeout = self
            .connect_timeout
            .unwrap_or(Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS));

        let http = Client::builder()
            .timeout(timeout)
            .connect_timeout(connect_timeout)
            .build()
            .map_err(|e| WechatError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(ReqwestTransport::new(http))
    }
}
