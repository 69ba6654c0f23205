//! Access token management for WeChat API
//!
//! Handles token caching, expiry checks, forced refresh and per-key
//! single-flight fetching. Callers normally never touch this directly; the
//! [`RequestDispatcher`](crate::client::RequestDispatcher) drives it.

pub mod store;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use http::Method;
use parking_lot::{Mutex, RwLock};
use serde::Deserialize;
use tokio::sync::{Notify, OnceCell};

use crate::error::{HttpError, WechatError};
use crate::transport::{Transport, TransportRequest};
use crate::types::{AccessToken, AppId, AppSecret, Credential, CredentialKey};

pub use store::{CredentialStore, FileCredentialStore, MemoryCredentialStore};

pub(crate) const TOKEN_PATH: &str = "/cgi-bin/token";
const DEFAULT_REFRESH_BUFFER_SECS: u64 = 5 * 60;

#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    #[serde(default)]
    pub access_token: String,
    #[serde(default)]
    pub expires_in: u64,
    #[serde(default)]
    pub errcode: i32,
    #[serde(default)]
    pub errmsg: String,
}

impl TokenResponse {
    pub fn is_success(&self) -> bool {
        self.errcode == 0
    }
}

#[derive(Clone)]
struct AppCredentials {
    appid: AppId,
    secret: AppSecret,
}

/// Result shared with every caller that joined a flight. The flag records
/// whether the credential came from the network rather than the store.
type FlightResult = Result<(Credential, bool), WechatError>;

struct InFlight {
    result: OnceCell<FlightResult>,
    notify: Notify,
}

impl InFlight {
    fn new() -> Self {
        Self {
            result: OnceCell::new(),
            notify: Notify::new(),
        }
    }

    fn complete(&self, result: FlightResult) {
        let _ = self.result.set(result);
        self.notify.notify_waiters();
    }

    async fn wait(&self) -> FlightResult {
        loop {
            if let Some(result) = self.result.get() {
                return result.clone();
            }

            let notified = self.notify.notified();
            if let Some(result) = self.result.get() {
                return result.clone();
            }

            notified.await;
        }
    }
}

/// Removes the flight entry and wakes waiters even if the leading future is
/// dropped mid-fetch.
struct FlightGuard<'a> {
    manager: &'a TokenManager,
    key: &'a CredentialKey,
    flight: Arc<InFlight>,
    finished: bool,
}

impl FlightGuard<'_> {
    fn finish(mut self, result: FlightResult) {
        self.finished = true;
        self.release(result);
    }

    fn release(&self, result: FlightResult) {
        {
            let mut in_flight = self.manager.in_flight.lock();
            if in_flight
                .get(self.key)
                .is_some_and(|current| Arc::ptr_eq(current, &self.flight))
            {
                in_flight.remove(self.key);
            }
        }
        self.flight.complete(result);
    }
}

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        if !self.finished {
            log::warn!("access token fetch for {} was cancelled", self.key);
            self.release(Err(WechatError::Transport(HttpError::Request(
                "access token fetch was cancelled".to_string(),
            ))));
        }
    }
}

/// Manages the access_token lifecycle for one or more apps.
///
/// Each app is registered under a [`CredentialKey`]; cached credentials live
/// in a pluggable [`CredentialStore`]. Concurrent callers that miss the cache
/// for the same key share a single network fetch and its outcome.
pub struct TokenManager {
    transport: Arc<dyn Transport>,
    base_url: String,
    store: Arc<dyn CredentialStore>,
    apps: RwLock<HashMap<CredentialKey, AppCredentials>>,
    in_flight: Mutex<HashMap<CredentialKey, Arc<InFlight>>>,
    refresh_buffer: Duration,
}

impl std::fmt::Debug for TokenManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenManager")
            .field("base_url", &self.base_url)
            .field("apps", &self.apps.read().len())
            .field("refresh_buffer", &self.refresh_buffer)
            .finish_non_exhaustive()
    }
}

impl TokenManager {
    /// Create a manager backed by an in-memory store.
    pub fn new(transport: Arc<dyn Transport>, base_url: impl Into<String>) -> Self {
        Self {
            transport,
            base_url: base_url.into(),
            store: Arc::new(MemoryCredentialStore::new()),
            apps: RwLock::new(HashMap::new()),
            in_flight: Mutex::new(HashMap::new()),
            refresh_buffer: Duration::from_secs(DEFAULT_REFRESH_BUFFER_SECS),
        }
    }

    pub fn with_store(mut self, store: Arc<dyn CredentialStore>) -> Self {
        self.store = store;
        self
    }

    /// Safety margin subtracted from a credential's expiry. Default: 5 minutes
    pub fn with_refresh_buffer(mut self, buffer: Duration) -> Self {
        self.refresh_buffer = buffer;
        self
    }

    pub fn refresh_buffer(&self) -> Duration {
        self.refresh_buffer
    }

    pub fn store(&self) -> &Arc<dyn CredentialStore> {
        &self.store
    }

    /// Register an app so credentials can be fetched for its key.
    pub fn register(&self, appid: AppId, secret: AppSecret) -> CredentialKey {
        let key = CredentialKey::new(&appid, &secret);
        self.apps
            .write()
            .entry(key.clone())
            .or_insert(AppCredentials { appid, secret });
        key
    }

    pub fn is_registered(&self, key: &CredentialKey) -> bool {
        self.apps.read().contains_key(key)
    }

    /// Return the cached credential if still usable, otherwise fetch one.
    pub async fn get_valid_credential(
        &self,
        key: &CredentialKey,
    ) -> Result<Credential, WechatError> {
        if let Some(cached) = self.cached(key).await? {
            return Ok(cached);
        }
        self.refresh(key, false).await
    }

    /// Fetch a new credential regardless of what the store holds.
    ///
    /// Joins a fetch already in flight for `key` instead of starting another.
    pub async fn force_refresh(&self, key: &CredentialKey) -> Result<Credential, WechatError> {
        self.refresh(key, true).await
    }

    /// Issue the platform's token call and write the result to the store.
    ///
    /// Bypasses single-flight; prefer [`get_valid_credential`](Self::get_valid_credential)
    /// or [`force_refresh`](Self::force_refresh).
    pub async fn fetch_credential(&self, key: &CredentialKey) -> Result<Credential, WechatError> {
        let app = self.apps.read().get(key).cloned().ok_or_else(|| {
            WechatError::Config(format!("no app credentials registered for key {key}"))
        })?;

        log::debug!("fetching access token for {}", app.appid.as_str());

        let request = TransportRequest {
            method: Method::GET,
            url: format!("{}{}", self.base_url, TOKEN_PATH),
            query: vec![
                ("grant_type".to_string(), "client_credential".to_string()),
                ("appid".to_string(), app.appid.as_str().to_string()),
                ("secret".to_string(), app.secret.as_str().to_string()),
            ],
            json: None,
            files: Vec::new(),
            timeout: None,
        };

        let response = self.transport.send(request).await?;
        if !response.is_success() {
            return Err(HttpError::Status(response.status).into());
        }

        let parsed: TokenResponse = serde_json::from_slice(&response.body)?;
        if !parsed.is_success() {
            log::warn!(
                "access token request for {} rejected: {} {}",
                app.appid.as_str(),
                parsed.errcode,
                parsed.errmsg
            );
            return Err(WechatError::CredentialFetch {
                code: parsed.errcode,
                message: parsed.errmsg,
            });
        }

        let token = AccessToken::new(parsed.access_token).map_err(WechatError::Decode)?;
        let credential = Credential::issued_now(token, Duration::from_secs(parsed.expires_in))
            .ok_or_else(|| {
                WechatError::Decode(format!("expires_in out of range: {}", parsed.expires_in))
            })?;
        self.store.set(key, credential.clone()).await?;

        log::info!(
            "access token refreshed for {}, expires in {}s",
            app.appid.as_str(),
            parsed.expires_in
        );
        Ok(credential)
    }

    /// Drop the cached credential for `key`.
    pub async fn invalidate(&self, key: &CredentialKey) -> Result<(), WechatError> {
        self.store.remove(key).await
    }

    async fn cached(&self, key: &CredentialKey) -> Result<Option<Credential>, WechatError> {
        Ok(self
            .store
            .get(key)
            .await?
            .filter(|credential| credential.is_usable(self.refresh_buffer)))
    }

    async fn refresh(&self, key: &CredentialKey, force: bool) -> Result<Credential, WechatError> {
        loop {
            let (flight, leader) = self.join_or_lead(key);

            if !leader {
                let (credential, fetched) = flight.wait().await?;
                // A forced refresh cannot settle for a credential the store
                // already held; it may be the one the server just rejected.
                if fetched || !force {
                    return Ok(credential);
                }
                continue;
            }

            let guard = FlightGuard {
                manager: self,
                key,
                flight,
                finished: false,
            };

            let result = self.lead(key, force).await;
            guard.finish(result.clone());
            return result.map(|(credential, _)| credential);
        }
    }

    async fn lead(&self, key: &CredentialKey, force: bool) -> FlightResult {
        if !force {
            // Another flight may have stored a fresh credential between our
            // cache miss and becoming leader.
            if let Some(cached) = self.cached(key).await? {
                return Ok((cached, false));
            }
        }
        Ok((self.fetch_credential(key).await?, true))
    }

    fn join_or_lead(&self, key: &CredentialKey) -> (Arc<InFlight>, bool) {
        let mut in_flight = self.in_flight.lock();
        if let Some(existing) = in_flight.get(key) {
            return (Arc::clone(existing), false);
        }
        let flight = Arc::new(InFlight::new());
        in_flight.insert(key.clone(), Arc::clone(&flight));
        (flight, true)
    }

    #[cfg(test)]
    fn in_flight_count(&self) -> usize {
        self.in_flight.lock().len()
    }
}
