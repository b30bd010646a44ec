// ============================
// inkwell-backend-lib/src/config.rs
// ============================
//! Configuration management.
use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::Deserialize;
use std::fmt;
use std::net::SocketAddr;
use std::path::Path;
use zeroize::Zeroize;

use crate::auth::password::{PasswordRequirements, ScryptHasher, MIN_PASSWORD_LENGTH};
use crate::auth::signer::{TokenLifetimes, ACCESS_TOKEN_TTL_SECS, REFRESH_TOKEN_TTL_SECS};
use crate::error::AppError;


/// Default configuration file, read from the working directory
pub const CONFIG_FILE: &str = "inkwell.toml";

/// Prefix of environment overrides. Nested keys are split on `__`.
pub const ENV_PREFIX: &str = "INKWELL_";

const MAX_TTL_SECS: u64 = 10 * 365 * 24 * 60 * 60;

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// A secret string. Never printed, wiped on drop.
#[derive(Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(<redacted>)")
    }
}

impl Drop for Secret {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

/// Application settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Server bind address
    pub bind_addr: SocketAddr,
    /// Log level
    pub log_level: String,
    /// Emit JSON log lines
    pub log_json: bool,
    /// Prefix of links sent by email
    pub public_base_url: String,
    /// Signing secrets and lifetimes
    pub tokens: TokenSettings,
    /// scrypt cost
    pub hashing: HashingSettings,
    /// Password requirements
    pub password_requirements: PasswordRequirements,
    /// Reject login until the account is activated
    pub require_activation: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TokenSettings {
    pub access_secret: Secret,
    pub refresh_secret: Secret,
    pub access_ttl_secs: u64,
    pub refresh_ttl_secs: u64,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct HashingSettings {
    pub log_n: u8,
    pub r: u32,
    pub p: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 8080)),
            log_level: "info".to_string(),
            log_json: false,
            public_base_url: "http://localhost:8080".to_string(),
            tokens: TokenSettings::default(),
            hashing: HashingSettings::default(),
            password_requirements: PasswordRequirements::default(),
            require_activation: true,
        }
    }
}

impl Default for TokenSettings {
    fn default() -> Self {
        Self {
            access_secret: Secret::default(),
            refresh_secret: Secret::default(),
            access_ttl_secs: ACCESS_TOKEN_TTL_SECS as u64,
            refresh_ttl_secs: REFRESH_TOKEN_TTL_SECS as u64,
        }
    }
}

impl Default for HashingSettings {
    fn default() -> Self {
        Self { log_n: 15, r: 8, p: 1 }
    }
}

impl Settings {
    /// Load from `inkwell.toml` (if present) and `INKWELL_` variables
    pub fn load() -> Result<Self, AppError> {
        Self::extract(Figment::new().merge(Toml::file(CONFIG_FILE)))
    }

    /// Load from an explicit TOML file and `INKWELL_` variables
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, AppError> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(AppError::Configuration(format!(
                "config file not found: {}",
                path.display()
            )));
        }
        Self::extract(Figment::new().merge(Toml::file(path)))
    }

    fn extract(figment: Figment) -> Result<Self, AppError> {
        figment
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .map_err(|e| AppError::Configuration(e.to_string()))
    }

    /// Reject settings the server cannot safely start with
    pub fn validate(&self) -> Result<(), AppError> {
        let invalid = |msg: &str| Err(AppError::Configuration(msg.to_string()));

        if self.tokens.access_secret.is_empty() || self.tokens.refresh_secret.is_empty() {
            return invalid("tokens.access_secret and tokens.refresh_secret must be set");
        }
        if self.tokens.access_secret == self.tokens.refresh_secret {
            return invalid("access and refresh secrets must differ");
        }
        if self.tokens.access_ttl_secs == 0 || self.tokens.refresh_ttl_secs == 0 {
            return invalid("token lifetimes must be positive");
        }
        if self.tokens.refresh_ttl_secs <= self.tokens.access_ttl_secs {
            return invalid("refresh token lifetime must exceed access token lifetime");
        }
        if self.tokens.refresh_ttl_secs > MAX_TTL_SECS {
            return invalid("refresh token lifetime must not exceed ten years");
        }
        if self.password_requirements.min_length < MIN_PASSWORD_LENGTH {
            return Err(AppError::Configuration(format!(
                "password_requirements.min_length must be at least {MIN_PASSWORD_LENGTH}"
            )));
        }
        if !LOG_LEVELS.contains(&self.log_level.to_ascii_lowercase().as_str()) {
            return Err(AppError::Configuration(format!(
                "unknown log level: {}",
                self.log_level
            )));
        }
        self.hasher()?;
        if !(self.public_base_url.starts_with("http://") || self.public_base_url.starts_with("https://")) {
            return invalid("public_base_url must start with http:// or https://");
        }

        Ok(())
    }

    /// Token lifetimes as configured
    pub fn token_lifetimes(&self) -> TokenLifetimes {
        let secs = |value: u64| chrono::Duration::seconds(value.min(MAX_TTL_SECS) as i64);
        TokenLifetimes {
            access: secs(self.tokens.access_ttl_secs),
            refresh: secs(self.tokens.refresh_ttl_secs),
        }
    }

    /// Password hasher with the configured cost
    pub fn hasher(&self) -> Result<ScryptHasher, AppError> {
        ScryptHasher::new(self.hashing.log_n, self.hashing.r, self.hashing.p)
            .map_err(|e| AppError::Configuration(format!("invalid scrypt parameters: {e}")))
    }
}
