use base64::prelude::{BASE64_URL_SAFE_NO_PAD, Engine as _};
use serde::{Deserialize, Serialize};

/// The bearer credential for the current session, persisted across
/// invocations. Timestamps are unix seconds computed from the token
/// endpoint's `expires_in` at grant time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionToken {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_at: i64,
    pub refresh_expires_at: Option<i64>,
    pub subject: Option<String>,
    pub username: Option<String>,
}

impl SessionToken {
    pub fn remaining_validity(&self, now: i64) -> i64 {
        self.expires_at - now
    }

    /// A refresh is due when the remaining validity at a tick falls below
    /// the threshold.
    pub fn needs_refresh(&self, now: i64, threshold: i64) -> bool {
        self.remaining_validity(now) < threshold
    }

    pub fn is_expired(&self, now: i64) -> bool {
        self.remaining_validity(now) <= 0
    }

    /// Whether a refresh grant is still worth attempting.
    pub fn can_refresh(&self, now: i64) -> bool {
        match (&self.refresh_token, self.refresh_expires_at) {
            (None, _) => false,
            (Some(_), Some(deadline)) => deadline > now,
            (Some(_), None) => true,
        }
    }
}

/// The claims this client reads from an access token. The token is treated
/// as opaque otherwise; no signature verification happens client-side.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AccessClaims {
    #[serde(default)]
    pub sub: Option<String>,
    #[serde(default)]
    pub exp: Option<i64>,
    #[serde(default)]
    pub preferred_username: Option<String>,
}

/// Decodes the payload segment of a JWT without verifying it.
pub fn decode_claims(access_token: &str) -> Option<AccessClaims> {
    let payload = access_token.split('.').nth(1)?;
    let bytes = BASE64_URL_SAFE_NO_PAD.decode(payload).ok()?;
    serde_json::from_slice(&bytes).ok()
}
