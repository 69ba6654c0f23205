//! Client module
//!
//! The [`WechatClient`] facade, its builder, and the request dispatch layer
//! every resource API goes through.

mod builder;
pub use builder::WechatClientBuilder;

mod dispatcher;
pub use dispatcher::{RefreshPolicy, RequestDispatcher};

mod request;
pub use request::RequestSpec;

mod wechat_client;
pub use wechat_client::WechatClient;
