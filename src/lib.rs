//! WeChat Official Account SDK for Rust
//!
//! A server-side client for the WeChat Official Account (公众号) platform.
//! Access tokens are fetched, cached and refreshed for you: concurrent
//! callers share a single fetch per app, and a call rejected for a stale
//! token is refreshed and retried once.
//!
//! ## API Coverage
//!
//! | Handle | Endpoints |
//! |--------|-----------|
//! | `menu()` | create, get, delete, update |
//! | `message()` | customer service text/image/voice/video/music/news, template |
//! | `user()` | info, followers, remark, group id |
//! | `group()` | create, list, lookup, rename, move member |
//! | `media()` | temporary upload, download |
//! | `qrcode()` | create, show, URL |
//! | `customservice()` | account add/update/delete, avatar, lists |
//! | `datacube()` | user summary/cumulate, article summary, user read |
//! | `misc()` | short URL, callback IPs |
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use wechat_oa_sdk::{WechatClient, types::{AppId, AppSecret}};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = WechatClient::builder()
//!         .appid(AppId::new("wx1234567890abcdef")?)
//!         .secret(AppSecret::new("your_secret")?)
//!         .build()?;
//!
//!     client.message().send_text("openid", "hello").await?;
//!
//!     let ticket = client.qrcode().create(&serde_json::json!({
//!         "expire_seconds": 1800,
//!         "action_name": "QR_SCENE",
//!         "action_info": {"scene": {"scene_id": 123}}
//!     })).await?;
//!     println!("{}", client.qrcode().get_url(&ticket)?);
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Modules
//!
//! - [`api`] - Resource APIs (menu, message, user, qrcode, datacube, etc.)
//! - [`client`] - The client facade, its builder and the request dispatcher
//! - [`error`] - Error types
//! - [`middleware`] - `tower` layers for the HTTP transport
//! - [`token`] - Access token management and credential stores
//! - [`transport`] - The HTTP boundary
//! - [`types`] - Validated identifiers and credentials
//!
//! ## Error Handling
//!
//! ```rust,ignore
//! use wechat_oa_sdk::WechatError;
//!
//! match result {
//!     Ok(response) => { /* handle success */ }
//!     Err(WechatError::Api { code, message }) => {
//!         eprintln!("API error: {} - {}", code, message);
//!     }
//!     Err(e) if e.is_transient() => {
//!         eprintln!("try again later: {}", e);
//!     }
//!     Err(e) => {
//!         eprintln!("Other error: {}", e);
//!     }
//! }
//! ```

pub mod api;
pub mod client;
pub mod error;
pub mod middleware;
pub mod token;
pub mod transport;
pub mod types;
mod utils;

pub use client::{RefreshPolicy, RequestDispatcher, RequestSpec, WechatClient, WechatClientBuilder};
pub use error::{HttpError, WechatError};
pub use token::{CredentialStore, FileCredentialStore, MemoryCredentialStore, TokenManager};
pub use transport::{ReqwestTransport, Transport};
