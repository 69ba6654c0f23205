//! Transport-level retry.
//!
//! Retries an HTTP exchange that failed to connect, timed out, or got a 5xx
//! status. Platform `errcode`s are never seen here: they travel inside 200
//! responses and are handled by the dispatcher.
//!
//! # Non-Idempotent Requests
//!
//! POST requests are NOT retried by default since they may duplicate a send.
//! Use `with_retry_post(true)` to enable it. Requests whose body cannot be
//! cloned (multipart uploads) are always sent once.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use reqwest::{Method, Request, Response};
use tokio::time::sleep;
use tower::{Layer, Service};

use crate::utils::jittered_delay;

/// Middleware that retries requests on transient transport failures.
#[derive(Debug, Clone)]
pub struct RetryMiddleware {
    max_retries: u32,
    base_delay: Duration,
    retry_post: bool,
}

impl RetryMiddleware {
    /// Default: 3 retries after the first attempt, 100ms base delay, POST not retried.
    pub fn new() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(100),
            retry_post: false,
        }
    }

    /// Retries after the first attempt; 0 sends every request once.
    pub fn with_max_retries(mut self, max: u32) -> Self {
        self.max_retries = max;
        self
    }

    pub fn with_delay_ms(mut self, delay: u64) -> Self {
        self.base_delay = Duration::from_millis(delay);
        self
    }

    pub fn with_retry_post(mut self, retry: bool) -> Self {
        self.retry_post = retry;
        self
    }

    fn allows(&self, request: &Request) -> bool {
        self.max_retries > 0 && (self.retry_post || is_idempotent(request.method()))
    }
}

impl Default for RetryMiddleware {
    fn default() -> Self {
        Self::new()
    }
}

impl<S> Layer<S> for RetryMiddleware {
    type Service = RetryMiddlewareService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RetryMiddlewareService {
            inner,
            policy: self.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RetryMiddlewareService<S> {
    inner: S,
    policy: RetryMiddleware,
}

fn is_idempotent(method: &Method) -> bool {
    !matches!(method, &Method::POST | &Method::PUT | &Method::PATCH)
}

fn is_transient(outcome: &Result<Response, reqwest::Error>) -> bool {
    match outcome {
        Ok(response) => response.status().is_server_error(),
        Err(e) => e.is_timeout() || e.is_connect(),
    }
}

impl<S> Service<Request> for RetryMiddlewareService<S>
where
    S: Service<Request, Response = Response, Error = reqwest::Error> + Clone + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = Response;
    type Error = reqwest::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request) -> Self::Future {
        let mut inner = self.inner.clone();
        let policy = self.policy.clone();

        Box::pin(async move {
            let retry_allowed = policy.allows(&req);
            let mut pending = req;
            let mut attempt = 0;

            loop {
                let spare = if retry_allowed && attempt < policy.max_retries {
                    pending.try_clone()
                } else {
                    None
                };

                std::future::poll_fn(|cx| inner.poll_ready(cx)).await?;
                let outcome = inner.call(pending).await;

                let Some(next) = spare else {
                    return outcome;
                };
                if !is_transient(&outcome) {
                    return outcome;
                }

                let delay = jittered_delay(policy.base_delay, attempt);
                attempt += 1;
                log::warn!(
                    "{} {} transient failure, retry {}/{} in {:?}",
                    next.method(),
                    next.url().path(),
                    attempt,
                    policy.max_retries,
                    delay
                );
                sleep(delay).await;
                pending = next;
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::transport::HttpService;

    async fn call(
        middleware: RetryMiddleware,
        request: impl FnOnce(&reqwest::Client) -> reqwest::RequestBuilder,
    ) -> Result<Response, reqwest::Error> {
        let client = reqwest::Client::new();
        let mut service = middleware.layer(HttpService::new(client.clone()));
        let req = request(&client).build().unwrap();
        service.call(req).await
    }

    async fn received(server: &MockServer) -> usize {
        server.received_requests().await.unwrap().len()
    }

    #[test]
    fn test_middleware_configuration() {
        let middleware = RetryMiddleware::new()
            .with_max_retries(5)
            .with_delay_ms(200)
            .with_retry_post(true);

        assert_eq!(middleware.max_retries, 5);
        assert_eq!(middleware.base_delay, Duration::from_millis(200));
        assert!(middleware.retry_post);
    }

    #[tokio::test]
    async fn test_get_retries_on_5xx_until_exhausted() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/cgi-bin/getcallbackip"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let url = format!("{}/cgi-bin/getcallbackip", server.uri());
        let response = call(
            RetryMiddleware::new().with_max_retries(2).with_delay_ms(1),
            |c| c.get(&url),
        )
        .await
        .unwrap();

        assert_eq!(response.status().as_u16(), 503);
        assert_eq!(received(&server).await, 3);
    }

    #[tokio::test]
    async fn test_recovers_after_transient_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(502))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
            .mount(&server)
            .await;

        let url = format!("{}/cgi-bin/menu/get", server.uri());
        let response = call(RetryMiddleware::new().with_delay_ms(1), |c| c.get(&url))
            .await
            .unwrap();

        assert_eq!(response.status().as_u16(), 200);
        assert_eq!(received(&server).await, 2);
    }

    #[tokio::test]
    async fn test_success_and_client_errors_are_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let url = format!("{}/missing", server.uri());
        let response = call(RetryMiddleware::new().with_delay_ms(1), |c| c.get(&url))
            .await
            .unwrap();

        assert_eq!(response.status().as_u16(), 404);
        assert_eq!(received(&server).await, 1);
    }

    #[tokio::test]
    async fn test_post_not_retried_by_default() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let url = format!("{}/cgi-bin/message/custom/send", server.uri());
        call(RetryMiddleware::new().with_delay_ms(1), |c| {
            c.post(&url).body("{}")
        })
        .await
        .unwrap();

        assert_eq!(received(&server).await, 1);
    }

    #[tokio::test]
    async fn test_post_retried_when_enabled() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let url = format!("{}/cgi-bin/message/custom/send", server.uri());
        call(
            RetryMiddleware::new()
                .with_max_retries(1)
                .with_delay_ms(1)
                .with_retry_post(true),
            |c| c.post(&url).body("{}"),
        )
        .await
        .unwrap();

        assert_eq!(received(&server).await, 2);
    }

    #[tokio::test]
    async fn test_zero_retries_sends_once() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let url = format!("{}/cgi-bin/menu/get", server.uri());
        call(RetryMiddleware::new().with_max_retries(0), |c| c.get(&url))
            .await
            .unwrap();

        assert_eq!(received(&server).await, 1);
    }

    #[tokio::test]
    async fn test_connect_error_is_retried_then_surfaced() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let url = format!("http://{addr}/cgi-bin/menu/get");
        let err = call(
            RetryMiddleware::new().with_max_retries(1).with_delay_ms(1),
            |c| c.get(&url),
        )
        .await
        .unwrap_err();

        assert!(err.is_connect());
    }
}
