//! Middleware for the HTTP transport.
//!
//! Layers wrap [`HttpService`](crate::transport::HttpService), the innermost
//! `reqwest` executor, and are installed with
//! [`WechatClientBuilder::with_middleware`](crate::client::WechatClientBuilder::with_middleware).
//! They see raw HTTP exchanges only; token handling stays in the dispatcher.
//!
//! ## Middleware Types
//!
//! - [`RetryMiddleware`] - Retries connect failures, timeouts and 5xx responses
//! - [`LoggingMiddleware`] - Logs request/response information with secrets redacted
//!
//! ## Usage
//!
//! ```ignore
//! use tower::ServiceBuilder;
//! use wechat_oa_sdk::middleware::{LoggingMiddleware, RetryMiddleware};
//!
//! let stack = ServiceBuilder::new()
//!     .layer(LoggingMiddleware::new())
//!     .layer(RetryMiddleware::new().with_max_retries(2))
//!     .into_inner();
//!
//! let client = WechatClient::builder()
//!     .appid(appid)
//!     .secret(secret)
//!     .with_middleware(stack)
//!     .build()?;
//! ```

// Re-export tower types for convenience
pub use tower::{Layer, Service, ServiceBuilder};

mod logging;
mod retry;

pub use logging::{LoggingMiddleware, LoggingMiddlewareService};
pub use retry::{RetryMiddleware, RetryMiddlewareService};
