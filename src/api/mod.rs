//! WeChat Official Account API modules
//!
//! Each submodule is a thin resource client that turns arguments into a
//! [`RequestSpec`](crate::client::RequestSpec) and hands it to the dispatcher:
//!
//! - [`common`] - Shared response primitives and date ranges
//! - [`menu`] - Custom menu management
//! - [`message`] - Customer service and template messages
//! - [`user`] - Follower information and remarks
//! - [`group`] - Follower groups
//! - [`media`] - Temporary media upload and download
//! - [`qrcode`] - Parametric QR codes
//! - [`customservice`] - Customer service accounts
//! - [`datacube`] - Statistics
//! - [`misc`] - Short URLs and server IP list
//!
//! ## Usage
//!
//! ```rust,ignore
//! use wechat_oa_sdk::WechatClient;
//!
//! let followers = client.user().get_followers(None).await?;
//! ```

pub mod common;
pub mod customservice;
pub mod datacube;
pub mod group;
pub mod media;
pub mod menu;
pub mod message;
pub mod misc;
pub mod qrcode;
pub mod r#trait;
pub mod user;

pub use common::{ApiResponseBase, DateRange, IntoDate};
pub use customservice::{CustomServiceApi, KfAccount, KfOnlineAccount};
pub use datacube::DatacubeApi;
pub use group::{Group, GroupApi};
pub use media::{MediaApi, MediaType, MediaUploadResponse};
pub use menu::MenuApi;
pub use message::{Article, CustomMessage, MessageApi, TemplateMessage};
pub use misc::MiscApi;
pub use qrcode::{AsTicket, QrcodeApi, QrcodeTicket};
pub use r#trait::{WechatApi, WechatContext};
pub use user::{FollowerList, UserApi, UserInfo};
