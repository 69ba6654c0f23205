//! WeChat API trait and context
//!
//! Provides the base trait and context shared by every resource API.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::client::{RequestDispatcher, RequestSpec};
use crate::error::WechatError;
use crate::types::CredentialKey;

/// Context holding shared resources for resource API implementations.
///
/// Binds a dispatcher to the credential of one app, so API methods never
/// deal with tokens themselves.
#[derive(Clone)]
pub struct WechatContext {
    pub(crate) dispatcher: Arc<RequestDispatcher>,
    pub(crate) key: CredentialKey,
    pub(crate) mp_base_url: String,
}

impl std::fmt::Debug for WechatContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WechatContext")
            .field("key", &self.key)
            .field("mp_base_url", &self.mp_base_url)
            .field("dispatcher", &"RequestDispatcher { .. }")
            .finish()
    }
}

impl WechatContext {
    pub fn new(
        dispatcher: Arc<RequestDispatcher>,
        key: CredentialKey,
        mp_base_url: impl Into<String>,
    ) -> Self {
        Self {
            dispatcher,
            key,
            mp_base_url: mp_base_url.into(),
        }
    }

    pub fn dispatcher(&self) -> &RequestDispatcher {
        &self.dispatcher
    }

    pub fn credential_key(&self) -> &CredentialKey {
        &self.key
    }

    /// Host serving `showqrcode`. Default: `https://mp.weixin.qq.com`
    pub fn mp_base_url(&self) -> &str {
        &self.mp_base_url
    }

    pub async fn execute(&self, spec: RequestSpec) -> Result<Value, WechatError> {
        self.dispatcher.execute(spec, &self.key).await
    }

    pub async fn execute_as<T: DeserializeOwned>(
        &self,
        spec: RequestSpec,
    ) -> Result<T, WechatError> {
        self.dispatcher.execute_as(spec, &self.key).await
    }

    pub async fn execute_raw(&self, spec: RequestSpec) -> Result<Vec<u8>, WechatError> {
        self.dispatcher.execute_raw(spec, &self.key).await
    }
}

/// Trait for resource API implementations.
///
/// All API modules implement this trait to expose the shared context.
pub trait WechatApi: Send + Sync {
    /// Get a reference to the WeChat context
    fn context(&self) -> &WechatContext;

    /// Get the name of this API for logging and error context.
    fn api_name(&self) -> &'static str {
        "unknown"
    }
}
