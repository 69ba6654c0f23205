use std::time::{Duration, SystemTime};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::{AccessToken, AppId, AppSecret};

/// Identifies which application's credential is being cached.
///
/// Built from the appid plus a digest of the secret, so a rotated secret
/// lands in a fresh cache slot and the secret itself is never stored.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CredentialKey(String);

impl CredentialKey {
    pub fn new(appid: &AppId, secret: &AppSecret) -> Self {
        let digest = Sha256::digest(secret.as_str().as_bytes());
        let fingerprint = hex::encode(digest);
        Self(format!("{}:{}", appid.as_str(), &fingerprint[..16]))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CredentialKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// An issued access token together with its absolute expiry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    pub token: AccessToken,
    pub expires_at: SystemTime,
}

impl Credential {
    pub fn new(token: AccessToken, expires_at: SystemTime) -> Self {
        Self { token, expires_at }
    }

    /// Credential valid for `expires_in` from now.
    ///
    /// `None` when the expiry does not fit in a `SystemTime`.
    pub fn issued_now(token: AccessToken, expires_in: Duration) -> Option<Self> {
        let expires_at = SystemTime::now().checked_add(expires_in)?;
        Some(Self { token, expires_at })
    }

    /// Usable iff `now < expires_at - margin`. A margin too large to
    /// represent makes every credential unusable.
    pub fn is_usable(&self, margin: Duration) -> bool {
        SystemTime::now()
            .checked_add(margin)
            .is_some_and(|deadline| deadline < self.expires_at)
    }

    pub fn token(&self) -> &str {
        self.token.as_str()
    }
}
