// ================
// common/src/lib.rs
// ================
//! Common types and structures
//! used for communication between inkwell clients and the identity server.
//! This module defines the account/token value types and the request and
//! response bodies of the authentication endpoints.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Error returned when a wire value does not name a known variant
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {kind}: {value:?}")]
pub struct ParseValueError {
    kind: &'static str,
    value: String,
}

impl ParseValueError {
    fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}

/// Immutable identifier of a user account
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct UserId(pub i64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for UserId {
    type Err = ParseValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<i64>()
            .map(UserId)
            .map_err(|_| ParseValueError::new("user id", s))
    }
}

/// Account role
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = ParseValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Role::User),
            "admin" => Ok(Role::Admin),
            other => Err(ParseValueError::new("role", other)),
        }
    }
}

/// Account lifecycle status. Accounts start `inactive` until the emailed
/// activation link is followed.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum UserStatus {
    #[default]
    Inactive,
    Active,
}

impl UserStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserStatus::Inactive => "inactive",
            UserStatus::Active => "active",
        }
    }
}

impl fmt::Display for UserStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which class of signed credential a token is
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

impl TokenKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenKind::Access => "access",
            TokenKind::Refresh => "refresh",
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Server-side status of an issued token. The only transition is
/// `Active -> Blocked`.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum TokenStatus {
    Active,
    Blocked,
}

impl TokenStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenStatus::Active => "active",
            TokenStatus::Blocked => "blocked",
        }
    }
}

impl fmt::Display for TokenStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Body of `POST /auth/register`
#[derive(Serialize, Deserialize, Clone)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

/// Body of `POST /auth/login`
/// # Fields
/// * `identifier` - Username, or email address
/// * `password` - Plaintext password
#[derive(Serialize, Deserialize, Clone)]
pub struct LoginRequest {
    pub identifier: String,
    pub password: String,
}

/// Access/refresh pair returned by login and refresh
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
}

/// Body of `POST /auth/logout`. The access token travels in the
/// `Authorization` header; the refresh token is optional.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct LogoutRequest {
    #[serde(default)]
    pub refresh: Option<String>,
}

/// Body of `POST /password/forgot`
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

/// Body of `POST /password/{id}/update?token=...`
#[derive(Serialize, Deserialize, Clone)]
pub struct UpdatePasswordRequest {
    pub new_password: String,
}

/// Query string of `POST /password/{id}/update`
#[derive(Serialize, Deserialize, Clone)]
pub struct ResetLinkQuery {
    #[serde(default)]
    pub token: String,
}

/// Body of `POST /user/{id}/password`
#[derive(Serialize, Deserialize, Clone)]
pub struct ResetPasswordRequest {
    pub old_password: String,
    pub new_password: String,
}

/// Free-form profile details a user maintains about themselves
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct Profile {
    #[serde(default)]
    pub bio: String,
    #[serde(default)]
    pub profile_picture: String,
    #[serde(default)]
    pub phone: String,
}

/// Body of `PATCH /user/{id}`. Absent fields are left unchanged; any other
/// key is rejected.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ProfileUpdate {
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub profile_picture: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
}

impl ProfileUpdate {
    pub fn is_empty(&self) -> bool {
        self.bio.is_none() && self.profile_picture.is_none() && self.phone.is_none()
    }

    /// Overwrite the fields present in this update
    pub fn apply_to(&self, profile: &mut Profile) {
        if let Some(bio) = &self.bio {
            profile.bio = bio.clone();
        }
        if let Some(picture) = &self.profile_picture {
            profile.profile_picture = picture.clone();
        }
        if let Some(phone) = &self.phone {
            profile.phone = phone.clone();
        }
    }
}

/// Public projection of a user account (never carries the password digest)
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct UserView {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub role: Role,
    pub status: UserStatus,
    #[serde(flatten)]
    pub profile: Profile,
}

/// Plain acknowledgement body
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_wire_format() {
        assert_eq!(serde_json::to_string(&Role::Admin).unwrap(), "\"admin\"");
        assert_eq!("user".parse::<Role>().unwrap(), Role::User);
        assert!("root".parse::<Role>().is_err());
    }

    #[test]
    fn test_user_id_parsing() {
        assert_eq!("42".parse::<UserId>().unwrap(), UserId(42));
        assert_eq!(UserId(7).to_string(), "7");

        let err = "abc".parse::<UserId>().unwrap_err();
        assert_eq!(err.to_string(), "unknown user id: \"abc\"");
    }

    #[test]
    fn test_statuses_serialize_lowercase() {
        let view = UserView {
            id: UserId(1),
            username: "alice".into(),
            email: "alice@x.com".into(),
            role: Role::User,
            status: UserStatus::Inactive,
            profile: Profile::default(),
        };
        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["bio"], "");
        assert_eq!(json["status"], "inactive");
        assert_eq!(json["role"], "user");
        assert_eq!(json["id"], 1);

        assert_eq!(TokenStatus::Blocked.to_string(), "blocked");
        assert_eq!(TokenKind::Refresh.as_str(), "refresh");
    }

    #[test]
    fn test_profile_update_only_touches_present_fields() {
        let update: ProfileUpdate = serde_json::from_str(r#"{"bio":"hello"}"#).unwrap();
        let mut profile = Profile {
            bio: "old".into(),
            profile_picture: String::new(),
            phone: "555".into(),
        };
        update.apply_to(&mut profile);
        assert_eq!(profile.bio, "hello");
        assert_eq!(profile.phone, "555");

        let empty: ProfileUpdate = serde_json::from_str("{}").unwrap();
        assert!(empty.is_empty());
        assert!(serde_json::from_str::<ProfileUpdate>(r#"{"role":"admin"}"#).is_err());
    }

    #[test]
    fn test_logout_request_refresh_is_optional() {
        let req: LogoutRequest = serde_json::from_str("{}").unwrap();
        assert!(req.refresh.is_none());
    }
}
