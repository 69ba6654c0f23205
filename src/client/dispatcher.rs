//! Request dispatch
//!
//! Every API call goes through [`RequestDispatcher`]: credential injection,
//! sending, `errcode` classification and the single refresh-and-retry.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{HttpError, WechatError};
use crate::token::TokenManager;
use crate::transport::{Transport, TransportRequest, TransportResponse};
use crate::types::{Credential, CredentialKey};

use super::request::RequestSpec;

/// Decides which platform error codes mean "the access token is no good".
///
/// A matching code on the first attempt of a credentialed call triggers one
/// forced token refresh and one retry.
#[derive(Clone)]
pub struct RefreshPolicy {
    predicate: Arc<dyn Fn(i32) -> bool + Send + Sync>,
}

impl RefreshPolicy {
    /// 40001 invalid credential, 40014 invalid access_token, 42001 access_token expired.
    pub const DEFAULT_CODES: [i32; 3] = [40001, 40014, 42001];

    pub fn codes(codes: impl IntoIterator<Item = i32>) -> Self {
        let codes: Vec<i32> = codes.into_iter().collect();
        Self::from_fn(move |code| codes.contains(&code))
    }

    pub fn from_fn(predicate: impl Fn(i32) -> bool + Send + Sync + 'static) -> Self {
        Self {
            predicate: Arc::new(predicate),
        }
    }

    /// Never refresh; every non-zero errcode is surfaced as-is.
    pub fn never() -> Self {
        Self::from_fn(|_| false)
    }

    pub fn should_refresh(&self, code: i32) -> bool {
        (self.predicate)(code)
    }
}

impl Default for RefreshPolicy {
    fn default() -> Self {
        Self::codes(Self::DEFAULT_CODES)
    }
}

impl std::fmt::Debug for RefreshPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RefreshPolicy").finish_non_exhaustive()
    }
}

/// The single choke point for API calls.
///
/// Stateless apart from its collaborators, so one dispatcher can serve any
/// number of apps registered with its [`TokenManager`].
pub struct RequestDispatcher {
    transport: Arc<dyn Transport>,
    token_manager: Arc<TokenManager>,
    base_url: String,
    refresh_policy: RefreshPolicy,
}

impl std::fmt::Debug for RequestDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestDispatcher")
            .field("base_url", &self.base_url)
            .field("token_manager", &self.token_manager)
            .finish_non_exhaustive()
    }
}

impl RequestDispatcher {
    pub fn new(
        transport: Arc<dyn Transport>,
        token_manager: Arc<TokenManager>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            transport,
            token_manager,
            base_url: base_url.into(),
            refresh_policy: RefreshPolicy::default(),
        }
    }

    pub fn with_refresh_policy(mut self, policy: RefreshPolicy) -> Self {
        self.refresh_policy = policy;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn token_manager(&self) -> &Arc<TokenManager> {
        &self.token_manager
    }

    pub fn refresh_policy(&self) -> &RefreshPolicy {
        &self.refresh_policy
    }

    /// Execute a JSON endpoint and return the decoded body verbatim.
    ///
    /// # Errors
    /// - `WechatError::Transport` for network faults, timeouts and non-2xx statuses
    /// - `WechatError::Decode` when the body is not JSON
    /// - `WechatError::Api` when the body carries a non-zero `errcode`
    /// - `WechatError::CredentialFetch` when no access token could be obtained
    pub async fn execute(
        &self,
        spec: RequestSpec,
        key: &CredentialKey,
    ) -> Result<Value, WechatError> {
        self.dispatch(spec, key, decode_json).await
    }

    /// Execute a JSON endpoint and deserialize the body into `T`.
    pub async fn execute_as<T: DeserializeOwned>(
        &self,
        spec: RequestSpec,
        key: &CredentialKey,
    ) -> Result<T, WechatError> {
        let value = self.execute(spec, key).await?;
        Ok(serde_json::from_value(value)?)
    }

    /// Execute an endpoint that answers with binary content on success and a
    /// JSON error object on failure.
    pub async fn execute_raw(
        &self,
        spec: RequestSpec,
        key: &CredentialKey,
    ) -> Result<Vec<u8>, WechatError> {
        self.dispatch(spec, key, decode_raw).await
    }

    async fn dispatch<T>(
        &self,
        spec: RequestSpec,
        key: &CredentialKey,
        decode: fn(TransportResponse) -> Result<T, WechatError>,
    ) -> Result<T, WechatError> {
        match self.attempt(&spec, key, None).await.and_then(decode) {
            Err(WechatError::Api { code, message })
                if spec.requires_credential && self.refresh_policy.should_refresh(code) =>
            {
                log::warn!(
                    "{} {} rejected access token ({}: {}), refreshing and retrying once",
                    spec.method,
                    spec.path,
                    code,
                    message
                );
                let refreshed = self.token_manager.force_refresh(key).await?;
                self.attempt(&spec, key, Some(refreshed))
                    .await
                    .and_then(decode)
            }
            other => other,
        }
    }

    async fn attempt(
        &self,
        spec: &RequestSpec,
        key: &CredentialKey,
        credential: Option<Credential>,
    ) -> Result<TransportResponse, WechatError> {
        let mut query = spec.query.clone();
        if spec.requires_credential {
            let credential = match credential {
                Some(credential) => credential,
                None => self.token_manager.get_valid_credential(key).await?,
            };
            query.push(("access_token".to_string(), credential.token().to_string()));
        }

        let url = if spec.is_absolute() {
            spec.path.clone()
        } else {
            format!("{}{}", self.base_url, spec.path)
        };

        log::debug!("dispatching {} {}", spec.method, url);

        let request = TransportRequest {
            method: spec.method.clone(),
            url,
            query,
            json: spec.json.clone(),
            files: spec.files.clone(),
            timeout: spec.timeout,
        };

        let response = self.transport.send(request).await?;
        if !response.is_success() {
            log::warn!(
                "{} {} answered HTTP {}",
                spec.method,
                spec.path,
                response.status
            );
            return Err(HttpError::Status(response.status).into());
        }
        Ok(response)
    }
}

fn decode_json(response: TransportResponse) -> Result<Value, WechatError> {
    let value: Value = serde_json::from_slice(&response.body)?;
    check_errcode(&value)?;
    Ok(value)
}

fn decode_raw(response: TransportResponse) -> Result<Vec<u8>, WechatError> {
    if let Ok(value) = serde_json::from_slice::<Value>(&response.body) {
        check_errcode(&value)?;
    }
    Ok(response.body)
}

/// Absent `errcode` or `errcode == 0` is success.
pub(crate) fn check_errcode(value: &Value) -> Result<(), WechatError> {
    if let Some(errcode) = value.get("errcode").and_then(Value::as_i64) {
        if errcode != 0 {
            let errmsg = value
                .get("errmsg")
                .and_then(Value::as_str)
                .unwrap_or("unknown error");
            return Err(WechatError::Api {
                code: errcode.try_into().unwrap_or(i32::MAX),
                message: errmsg.to_string(),
            });
        }
    }
    Ok(())
}
