use std::sync::Arc;
use std::time::Duration;

use reqwest::{Request as ReqwestRequest, Response as ReqwestResponse};
use tower::{Layer, Service};

use crate::api::WechatContext;
use crate::error::WechatError;
use crate::token::{CredentialStore, TokenManager};
use crate::transport::{HttpService, ReqwestTransport, Transport};
use crate::types::{AppId, AppSecret};

use super::wechat_client::{WechatClient, DEFAULT_BASE_URL, DEFAULT_MP_BASE_URL};
use super::{RefreshPolicy, RequestDispatcher};

#[must_use]
#[derive(Default)]
pub struct WechatClientBuilder<M = ()> {
    appid: Option<AppId>,
    secret: Option<AppSecret>,
    base_url: Option<String>,
    mp_base_url: Option<String>,
    timeout: Option<Duration>,
    connect_timeout: Option<Duration>,
    refresh_buffer: Option<Duration>,
    refresh_policy: Option<RefreshPolicy>,
    credential_store: Option<Arc<dyn CredentialStore>>,
    token_manager: Option<Arc<TokenManager>>,
    transport: Option<Arc<dyn Transport>>,
    middleware: Option<M>,
}

impl<M> std::fmt::Debug for WechatClientBuilder<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WechatClientBuilder")
            .field("appid", &self.appid)
            .field("base_url", &self.base_url)
            .field("mp_base_url", &self.mp_base_url)
            .field("timeout", &self.timeout)
            .field("connect_timeout", &self.connect_timeout)
            .field("refresh_buffer", &self.refresh_buffer)
            .field("credential_store", &self.credential_store.as_ref().map(|_| ".."))
            .field("token_manager", &self.token_manager.as_ref().map(|_| ".."))
            .field("transport", &self.transport.as_ref().map(|_| ".."))
            .field("middleware", &self.middleware.as_ref().map(|_| ".."))
            .finish_non_exhaustive()
    }
}

impl<M> WechatClientBuilder<M> {
    pub fn appid(mut self, appid: AppId) -> Self {
        self.appid = Some(appid);
        self
    }

    pub fn secret(mut self, secret: AppSecret) -> Self {
        self.secret = Some(secret);
        self
    }

    /// API host. Default: `https://api.weixin.qq.com`
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Host serving QR code images. Default: `https://mp.weixin.qq.com`
    pub fn mp_base_url(mut self, url: impl Into<String>) -> Self {
        self.mp_base_url = Some(url.into());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Treat tokens as stale this long before they expire. Default: 300 seconds
    pub fn refresh_buffer(mut self, buffer: Duration) -> Self {
        self.refresh_buffer = Some(buffer);
        self
    }

    /// Which errcodes trigger a token refresh and one retry.
    pub fn refresh_policy(mut self, policy: RefreshPolicy) -> Self {
        self.refresh_policy = Some(policy);
        self
    }

    /// Where tokens are cached. Default: in memory
    pub fn credential_store(mut self, store: Arc<dyn CredentialStore>) -> Self {
        self.credential_store = Some(store);
        self
    }

    /// Register with an existing manager instead of creating one, so
    /// several clients share its cache and single-flight fetching.
    pub fn token_manager(mut self, manager: Arc<TokenManager>) -> Self {
        self.token_manager = Some(manager);
        self
    }

    /// Replace the `reqwest` transport, e.g. with a test double.
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Wrap the `reqwest` transport in a `tower` layer.
    pub fn with_middleware<M2>(self, middleware: M2) -> WechatClientBuilder<M2>
    where
        M2: Layer<HttpService> + Clone + Send + Sync + 'static,
    {
        WechatClientBuilder {
            appid: self.appid,
            secret: self.secret,
            base_url: self.base_url,
            mp_base_url: self.mp_base_url,
            timeout: self.timeout,
            connect_timeout: self.connect_timeout,
            refresh_buffer: self.refresh_buffer,
            refresh_policy: self.refresh_policy,
            credential_store: self.credential_store,
            token_manager: self.token_manager,
            transport: self.transport,
            middleware: Some(middleware),
        }
    }

    pub fn build(self) -> Result<WechatClient, WechatError>
    where
        M: Layer<HttpService> + Clone + Send + Sync + 'static,
        M::Service: Service<ReqwestRequest, Response = ReqwestResponse, Error = reqwest::Error>
            + Clone
            + Send
            + Sync
            + 'static,
        <M::Service as Service<ReqwestRequest>>::Future: Send + 'static,
    {
        let appid = self
            .appid
            .ok_or_else(|| WechatError::Config("appid is required".to_string()))?;
        let secret = self
            .secret
            .ok_or_else(|| WechatError::Config("secret is required".to_string()))?;

        let base_url = validate_url(
            "base_url",
            self.base_url
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
        )?;
        let mp_base_url = validate_url(
            "mp_base_url",
            self.mp_base_url
                .unwrap_or_else(|| DEFAULT_MP_BASE_URL.to_string()),
        )?;

        let transport: Arc<dyn Transport> = match self.transport {
            Some(_) if self.middleware.is_some() => {
                return Err(WechatError::Config(
                    "with_middleware only applies to the built-in transport".to_string(),
                ));
            }
            Some(transport) => transport,
            None => {
                let mut builder = ReqwestTransport::builder();
                if let Some(timeout) = self.timeout {
                    builder = builder.timeout(timeout);
                }
                if let Some(timeout) = self.connect_timeout {
                    builder = builder.connect_timeout(timeout);
                }
                let mut transport = builder.build()?;
                if let Some(middleware) = self.middleware {
                    transport = transport.with_middleware(middleware);
                }
                Arc::new(transport)
            }
        };

        let token_manager = match self.token_manager {
            Some(_) if self.credential_store.is_some() || self.refresh_buffer.is_some() => {
                return Err(WechatError::Config(
                    "credential_store and refresh_buffer belong to the shared token_manager"
                        .to_string(),
                ));
            }
            Some(manager) => manager,
            None => {
                let mut manager = TokenManager::new(Arc::clone(&transport), base_url.clone());
                if let Some(store) = self.credential_store {
                    manager = manager.with_store(store);
                }
                if let Some(buffer) = self.refresh_buffer {
                    manager = manager.with_refresh_buffer(buffer);
                }
                Arc::new(manager)
            }
        };

        let key = token_manager.register(appid.clone(), secret);
        log::debug!("registered {} as {}", appid.as_str(), key);

        let dispatcher = RequestDispatcher::new(transport, token_manager, base_url)
            .with_refresh_policy(self.refresh_policy.unwrap_or_default());
        let context = Arc::new(WechatContext::new(
            Arc::new(dispatcher),
            key,
            mp_base_url,
        ));

        Ok(WechatClient::new(context, appid))
    }
}

fn validate_url(name: &str, url: String) -> Result<String, WechatError> {
    if !url.starts_with("http://") && !url.starts_with("https://") {
        return Err(WechatError::Config(format!(
            "{name} must start with http:// or https://, got: {url}"
        )));
    }
    Ok(url.trim_end_matches('/').to_string())
}
