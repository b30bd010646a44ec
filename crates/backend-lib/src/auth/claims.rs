//! Decoded payload of a signed token.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Claims carried by access and refresh tokens.
///
/// Timestamps are Unix seconds, as required by the JWT registered claims.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject user id
    pub sub: String,

    /// Subject role at issuance time
    pub role: String,

    /// Issued-at
    pub iat: i64,

    /// Expires-at
    pub exp: i64,

    /// Per-token nonce
    pub jti: String,
}

impl Claims {
    /// `issued-at <= now <= expires-at`
    pub fn is_current(&self, now: DateTime<Utc>) -> bool {
        let now = now.timestamp();
        self.iat <= now && now <= self.exp
    }
}
