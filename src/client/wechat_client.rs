//! Unified WeChat Official Account client

use std::sync::Arc;

use crate::api::{
    CustomServiceApi, DatacubeApi, GroupApi, MediaApi, MenuApi, MessageApi, MiscApi, QrcodeApi,
    UserApi, WechatContext,
};
use crate::error::WechatError;
use crate::token::TokenManager;
use crate::types::{AppId, Credential, CredentialKey};

use super::builder::WechatClientBuilder;
use super::RequestDispatcher;

pub(crate) const DEFAULT_BASE_URL: &str = "https://api.weixin.qq.com";
pub(crate) const DEFAULT_MP_BASE_URL: &str = "https://mp.weixin.qq.com";

/// Unified WeChat Official Account client
///
/// This is the main entry point for the SDK. Resource APIs are reached
/// through named handles that all share one dispatcher and one credential.
///
/// # Example
///
/// ```rust,ignore
/// use wechat_oa_sdk::WechatClient;
/// use wechat_oa_sdk::types::{AppId, AppSecret};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let client = WechatClient::builder()
///         .appid(AppId::new("wx1234567890abcdef")?)
///         .secret(AppSecret::new("your_secret")?)
///         .build()?;
///
///     client.message().send_text("openid", "hello").await?;
///     let followers = client.user().get_followers(None).await?;
///     println!("{} followers", followers.total);
///
///     Ok(())
/// }
/// ```
#[derive(Clone)]
pub struct WechatClient {
    context: Arc<WechatContext>,
    appid: AppId,
}

impl std::fmt::Debug for WechatClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WechatClient")
            .field("appid", &self.appid)
            .field("context", &self.context)
            .finish()
    }
}

impl WechatClient {
    pub fn builder() -> WechatClientBuilder {
        WechatClientBuilder::default()
    }

    pub(crate) fn new(context: Arc<WechatContext>, appid: AppId) -> Self {
        Self { context, appid }
    }

    pub fn appid(&self) -> &str {
        self.appid.as_str()
    }

    pub fn credential_key(&self) -> &CredentialKey {
        self.context.credential_key()
    }

    pub fn context(&self) -> &Arc<WechatContext> {
        &self.context
    }

    pub fn dispatcher(&self) -> &RequestDispatcher {
        self.context.dispatcher()
    }

    /// The manager holding this client's credential; may be shared with other clients.
    pub fn token_manager(&self) -> &Arc<TokenManager> {
        self.context.dispatcher().token_manager()
    }

    /// A currently valid access token, fetched if the cache is empty or stale.
    pub async fn access_token(&self) -> Result<String, WechatError> {
        let credential = self
            .token_manager()
            .get_valid_credential(self.credential_key())
            .await?;
        Ok(credential.token().to_string())
    }

    /// Fetch a new access token from the platform, replacing the cached one.
    pub async fn fetch_access_token(&self) -> Result<Credential, WechatError> {
        self.token_manager()
            .force_refresh(self.credential_key())
            .await
    }

    /// Drop the cached token; the next call fetches a new one.
    pub async fn invalidate_token(&self) -> Result<(), WechatError> {
        self.token_manager()
            .invalidate(self.credential_key())
            .await
    }

    // Resource APIs

    pub fn menu(&self) -> MenuApi {
        MenuApi::new(self.context.clone())
    }

    pub fn message(&self) -> MessageApi {
        MessageApi::new(self.context.clone())
    }

    pub fn user(&self) -> UserApi {
        UserApi::new(self.context.clone())
    }

    pub fn group(&self) -> GroupApi {
        GroupApi::new(self.context.clone())
    }

    pub fn media(&self) -> MediaApi {
        MediaApi::new(self.context.clone())
    }

    pub fn qrcode(&self) -> QrcodeApi {
        QrcodeApi::new(self.context.clone())
    }

    pub fn customservice(&self) -> CustomServiceApi {
        CustomServiceApi::new(self.context.clone())
    }

    pub fn datacube(&self) -> DatacubeApi {
        DatacubeApi::new(self.context.clone())
    }

    pub fn misc(&self) -> MiscApi {
        MiscApi::new(self.context.clone())
    }
}
