use std::future::Future;
use std::pin::Pin;
use std::time::{Duration, Instant};

use log::{debug, info, warn};
use reqwest::{Request, Response, Url};
use tower::{Layer, Service};

/// Logs method, redacted URL, status and elapsed time of every exchange.
#[derive(Debug, Clone, Default)]
pub struct LoggingMiddleware {
    verbose: bool,
}

impl LoggingMiddleware {
    pub fn new() -> Self {
        Self::default()
    }

    /// Log at `debug` with request/response markers instead of one `info` line each.
    pub fn verbose(mut self) -> Self {
        self.verbose = true;
        self
    }
}

impl<S> Layer<S> for LoggingMiddleware {
    type Service = LoggingMiddlewareService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        LoggingMiddlewareService {
            inner,
            verbose: self.verbose,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LoggingMiddlewareService<S> {
    inner: S,
    verbose: bool,
}

/// Query keys whose values never reach the log.
const SENSITIVE_KEYS: &[&str] = &["access_token", "secret", "appsecret", "password"];

const REDACTED: &str = "[REDACTED]";

fn redact_url(url: &Url) -> String {
    if url.query().is_none() {
        return url.to_string();
    }

    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(key, value)| {
            let value = if SENSITIVE_KEYS.iter().any(|s| key.eq_ignore_ascii_case(s)) {
                REDACTED.to_string()
            } else {
                value.into_owned()
            };
            (key.into_owned(), value)
        })
        .collect();

    let mut redacted = url.clone();
    redacted.query_pairs_mut().clear().extend_pairs(pairs);
    redacted.to_string()
}

fn log_request(method: &str, url: &str, verbose: bool) {
    if verbose {
        debug!(">>> {} {}", method, url);
    } else {
        info!("{} {}", method, url);
    }
}

fn log_outcome(
    method: &str,
    url: &str,
    outcome: &Result<Response, reqwest::Error>,
    elapsed: Duration,
    verbose: bool,
) {
    match outcome {
        Ok(response) if verbose => debug!(
            "<<< {} {} -> {} ({:?})",
            method,
            url,
            response.status(),
            elapsed
        ),
        Ok(response) => info!(
            "{} {} -> {} ({:?})",
            method,
            url,
            response.status().as_u16(),
            elapsed
        ),
        Err(e) => {
            let kind = if e.is_timeout() {
                "timeout"
            } else if e.is_connect() {
                "connect"
            } else {
                "request"
            };
            let cause = std::error::Error::source(e)
                .map(|source| source.to_string())
                .unwrap_or_default();
            warn!("{} {} failed after {:?} ({}) {}", method, url, elapsed, kind, cause);
        }
    }
}

impl<S> Service<Request> for LoggingMiddlewareService<S>
where
    S: Service<Request, Response = Response, Error = reqwest::Error> + Clone + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = Response;
    type Error = reqwest::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(
        &mut self,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request) -> Self::Future {
        let method = req.method().to_string();
        let url = redact_url(req.url());
        let verbose = self.verbose;
        let future = self.inner.call(req);

        Box::pin(async move {
            log_request(&method, &url, verbose);

            let start = Instant::now();
            let outcome = future.await;
            log_outcome(&method, &url, &outcome, start.elapsed(), verbose);

            outcome
        })
    }
}
