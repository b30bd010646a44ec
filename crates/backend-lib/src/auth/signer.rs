// ============================
// inkwell-backend-lib/src/auth/signer.rs
// ============================
//! Issuance and validation of signed, expiring, revocable tokens.
//!
//! Access and refresh tokens are HS256 JWTs signed with two independent
//! secrets. Validation always consults the [`TokenStore`] first: a token that
//! is unknown or blocked there is rejected even when its signature and
//! expiry are fine.
use chrono::{Duration, Utc};
use inkwell_common::TokenKind;
use jsonwebtoken::{
    decode, encode, errors::ErrorKind as JwtErrorKind, Algorithm, DecodingKey, EncodingKey,
    Header, Validation,
};
use std::sync::Arc;
use thiserror::Error;
use zeroize::Zeroizing;

use super::claims::Claims;
use super::token_generator::generate_token_id;
use crate::error::ErrorKind;
use crate::storage::{StoreError, TokenStore};

/// Access token lifetime (60 minutes)
pub const ACCESS_TOKEN_TTL_SECS: i64 = 60 * 60;

/// Refresh token lifetime (7 days)
pub const REFRESH_TOKEN_TTL_SECS: i64 = 7 * 24 * 60 * 60;

/// The only accepted signing algorithm
const SIGNING_ALGORITHM: Algorithm = Algorithm::HS256;

/// Token issuance and validation failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("token signer misconfigured: {0}")]
    Configuration(&'static str),

    #[error("user id and role are required")]
    MissingSubject,

    #[error("log in to access this route")]
    MissingCredential,

    #[error("invalid authorization header")]
    MalformedCredential,

    #[error("token has been revoked")]
    RevokedToken,

    #[error("invalid token signature")]
    InvalidSignature,

    #[error("token is expired")]
    ExpiredToken,

    #[error("token is not yet valid")]
    NotYetValid,

    #[error("token claims are invalid")]
    InvalidClaims,

    #[error("token signing failed: {0}")]
    Signing(String),

    #[error("token lookup failed: {0}")]
    Lookup(StoreError),
}

impl TokenError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            TokenError::MissingSubject => ErrorKind::Validation,
            TokenError::Configuration(_) | TokenError::Signing(_) | TokenError::Lookup(_) => {
                ErrorKind::Dependency
            },
            _ => ErrorKind::Authentication,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            TokenError::Configuration(_) => "TOKEN_001",
            TokenError::MissingSubject => "TOKEN_002",
            TokenError::MissingCredential => "TOKEN_003",
            TokenError::MalformedCredential => "TOKEN_004",
            TokenError::RevokedToken => "TOKEN_005",
            TokenError::InvalidSignature => "TOKEN_006",
            TokenError::ExpiredToken => "TOKEN_007",
            TokenError::NotYetValid => "TOKEN_008",
            TokenError::InvalidClaims => "TOKEN_009",
            TokenError::Signing(_) => "TOKEN_010",
            TokenError::Lookup(_) => "TOKEN_011",
        }
    }

    pub fn sanitized_message(&self) -> &'static str {
        match self {
            TokenError::MissingCredential => "log in to access this route",
            TokenError::MalformedCredential => "invalid authorization header",
            TokenError::ExpiredToken => "token is expired",
            TokenError::MissingSubject => "user id and role are required",
            TokenError::Configuration(_) | TokenError::Signing(_) | TokenError::Lookup(_) => {
                "An internal server error occurred"
            },
            _ => "invalid token",
        }
    }
}

/// Lifetimes of issued tokens
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenLifetimes {
    pub access: Duration,
    pub refresh: Duration,
}

impl Default for TokenLifetimes {
    fn default() -> Self {
        Self {
            access: Duration::seconds(ACCESS_TOKEN_TTL_SECS),
            refresh: Duration::seconds(REFRESH_TOKEN_TTL_SECS),
        }
    }
}

/// Split an `Authorization` value of the form `Bearer <token>`.
///
/// Exactly two parts separated by a single space; the scheme is matched
/// case-insensitively.
pub fn parse_bearer(value: &str) -> Result<&str, TokenError> {
    if value.is_empty() {
        return Err(TokenError::MissingCredential);
    }

    let mut parts = value.split(' ');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(scheme), Some(token), None)
            if scheme.eq_ignore_ascii_case("bearer") && !token.is_empty() =>
        {
            Ok(token)
        },
        _ => Err(TokenError::MalformedCredential),
    }
}

/// Format a raw token as a bearer value
pub fn bearer(token: &str) -> String {
    format!("Bearer {token}")
}

/// Creates and verifies signed claims
pub struct TokenSigner {
    access_secret: Zeroizing<Vec<u8>>,
    refresh_secret: Zeroizing<Vec<u8>>,
    lifetimes: TokenLifetimes,
    tokens: Arc<dyn TokenStore>,
}

impl TokenSigner {
    /// Create a signer. Both secrets must be non-empty and distinct.
    pub fn new(
        access_secret: &[u8],
        refresh_secret: &[u8],
        tokens: Arc<dyn TokenStore>,
    ) -> Result<Self, TokenError> {
        if access_secret.is_empty() || refresh_secret.is_empty() {
            return Err(TokenError::Configuration("access and refresh secrets cannot be empty"));
        }
        if access_secret == refresh_secret {
            return Err(TokenError::Configuration("access and refresh secrets must differ"));
        }

        Ok(Self {
            access_secret: Zeroizing::new(access_secret.to_vec()),
            refresh_secret: Zeroizing::new(refresh_secret.to_vec()),
            lifetimes: TokenLifetimes::default(),
            tokens,
        })
    }

    /// Override the default lifetimes
    pub fn with_lifetimes(mut self, lifetimes: TokenLifetimes) -> Self {
        self.lifetimes = lifetimes;
        self
    }

    /// Issue a 60-minute access token
    pub fn issue_access(&self, user_id: &str, role: &str) -> Result<String, TokenError> {
        self.issue(TokenKind::Access, user_id, role)
    }

    /// Issue a 7-day refresh token
    pub fn issue_refresh(&self, user_id: &str, role: &str) -> Result<String, TokenError> {
        self.issue(TokenKind::Refresh, user_id, role)
    }

    /// Issue a token of the given kind
    pub fn issue(&self, kind: TokenKind, user_id: &str, role: &str) -> Result<String, TokenError> {
        if user_id.is_empty() || role.is_empty() {
            return Err(TokenError::MissingSubject);
        }

        let now = Utc::now();
        let lifetime = match kind {
            TokenKind::Access => self.lifetimes.access,
            TokenKind::Refresh => self.lifetimes.refresh,
        };
        let claims = Claims {
            sub: user_id.to_string(),
            role: role.to_string(),
            iat: now.timestamp(),
            exp: (now + lifetime).timestamp(),
            jti: generate_token_id(),
        };

        encode(
            &Header::new(SIGNING_ALGORITHM),
            &claims,
            &EncodingKey::from_secret(self.secret(kind)),
        )
        .map_err(|e| TokenError::Signing(e.to_string()))
    }

    /// Validate a bearer value as a token of `expected` kind.
    ///
    /// Order of checks: header shape, revocation status, signature with the
    /// secret of `expected`, then expiry and issued-at against the clock.
    pub async fn validate(&self, presented: &str, expected: TokenKind) -> Result<Claims, TokenError> {
        let token = parse_bearer(presented)?;

        match self.tokens.find_by_content(token).await {
            Ok(record) if record.is_blocked() => return Err(TokenError::RevokedToken),
            Ok(_) => {},
            Err(StoreError::NotFound) => return Err(TokenError::RevokedToken),
            Err(err) => return Err(TokenError::Lookup(err)),
        }

        let claims = self.decode_claims(token, expected)?;

        // Checked here as well as in the decoder, with zero leeway.
        let now = Utc::now();
        if !claims.is_current(now) {
            return Err(if claims.exp < now.timestamp() {
                TokenError::ExpiredToken
            } else {
                TokenError::NotYetValid
            });
        }
        if claims.sub.is_empty() || claims.role.is_empty() {
            return Err(TokenError::InvalidClaims);
        }

        Ok(claims)
    }

    fn decode_claims(&self, token: &str, kind: TokenKind) -> Result<Claims, TokenError> {
        let mut validation = Validation::new(SIGNING_ALGORITHM);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "iat", "sub"]);

        decode::<Claims>(token, &DecodingKey::from_secret(self.secret(kind)), &validation)
            .map(|data| data.claims)
            .map_err(|err| match err.kind() {
                JwtErrorKind::ExpiredSignature => TokenError::ExpiredToken,
                _ => TokenError::InvalidSignature,
            })
    }

    fn secret(&self, kind: TokenKind) -> &[u8] {
        match kind {
            TokenKind::Access => &self.access_secret,
            TokenKind::Refresh => &self.refresh_secret,
        }
    }
}
