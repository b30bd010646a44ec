// ============================
// crates/backend-lib/src/validation/mod.rs
// ============================
//! Input shape checks for identifiers, emails and path ids.

use crate::error::AppError;
use inkwell_common::{ProfileUpdate, UserId};
use regex::Regex;
use std::sync::LazyLock;

const MAX_EMAIL_LENGTH: usize = 254; // RFC 5321 SMTP limit
const MAX_BIO_LENGTH: usize = 2000;
const MAX_PICTURE_URL_LENGTH: usize = 500;
const MAX_PHONE_LENGTH: usize = 255;

static EMAIL_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").unwrap());
// No '@', so a username is never email-shaped.
static USERNAME_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_.-]{3,32}$").unwrap());

/// Whether `value` looks like an email address
pub fn is_email_shaped(value: &str) -> bool {
    value.len() <= MAX_EMAIL_LENGTH && EMAIL_REGEX.is_match(value)
}

/// Trimmed, lower-cased form used for storage and lookup
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Validate and normalize an email address
pub fn validate_email(email: &str) -> Result<String, AppError> {
    let normalized = normalize_email(email);
    if !is_email_shaped(&normalized) {
        return Err(AppError::InvalidEmail);
    }
    Ok(normalized)
}

/// Validate a username
pub fn validate_username(username: &str) -> Result<&str, AppError> {
    let len = username.chars().count();
    if len < 3 {
        return Err(AppError::InvalidUsername("must be at least 3 characters"));
    }
    if len > 32 {
        return Err(AppError::InvalidUsername("must be at most 32 characters"));
    }
    if !USERNAME_REGEX.is_match(username) {
        return Err(AppError::InvalidUsername(
            "may only contain letters, digits, '_', '.' and '-'",
        ));
    }
    Ok(username)
}

/// Length limits on the profile fields present in `update`
pub fn validate_profile_update(update: &ProfileUpdate) -> Result<(), AppError> {
    let too_long = |value: &Option<String>, max: usize| {
        value.as_deref().is_some_and(|v| v.chars().count() > max)
    };

    if too_long(&update.bio, MAX_BIO_LENGTH) {
        return Err(AppError::InvalidProfile("bio must be at most 2000 characters"));
    }
    if too_long(&update.profile_picture, MAX_PICTURE_URL_LENGTH) {
        return Err(AppError::InvalidProfile("profile_picture must be at most 500 characters"));
    }
    if too_long(&update.phone, MAX_PHONE_LENGTH) {
        return Err(AppError::InvalidProfile("phone must be at most 255 characters"));
    }
    Ok(())
}

/// Parse a path-supplied user id
pub fn parse_user_id(raw: &str) -> Result<UserId, AppError> {
    raw.trim().parse::<UserId>().map_err(|_| AppError::InvalidUserId)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_email_validation() {
        assert_eq!(validate_email(" Alice@X.com ").unwrap(), "alice@x.com");
        assert!(validate_email("user.name+tag@example.co.uk").is_ok());

        assert!(matches!(validate_email(""), Err(AppError::InvalidEmail)));
        assert!(matches!(validate_email("alice"), Err(AppError::InvalidEmail)));
        assert!(matches!(validate_email("alice@x"), Err(AppError::InvalidEmail)));
        assert!(matches!(validate_email("@x.com"), Err(AppError::InvalidEmail)));

        let long_email = format!("{}@example.com", "a".repeat(250));
        assert!(!is_email_shaped(&long_email));
    }

    #[test]
    fn test_username_validation() {
        assert!(validate_username("alice").is_ok());
        assert!(validate_username("bob_the.builder-2").is_ok());

        assert!(validate_username("al").is_err());
        assert!(validate_username(&"a".repeat(33)).is_err());
        assert!(validate_username("alice@x.com").is_err());
        assert!(validate_username("alice smith").is_err());
    }

    #[test]
    fn test_usernames_are_never_email_shaped() {
        for name in ["alice", "a.b.c", "x-y_z"] {
            assert!(validate_username(name).is_ok());
            assert!(!is_email_shaped(name));
        }
    }

    #[test]
    fn test_profile_update_limits() {
        let ok = ProfileUpdate {
            bio: Some("b".repeat(2000)),
            profile_picture: Some("https://img.example.com/a.png".into()),
            phone: None,
        };
        assert!(validate_profile_update(&ok).is_ok());

        let long_bio = ProfileUpdate {
            bio: Some("b".repeat(2001)),
            ..ProfileUpdate::default()
        };
        assert!(matches!(
            validate_profile_update(&long_bio),
            Err(AppError::InvalidProfile(_))
        ));

        let long_picture = ProfileUpdate {
            profile_picture: Some("p".repeat(501)),
            ..ProfileUpdate::default()
        };
        assert!(validate_profile_update(&long_picture).is_err());
    }

    #[test]
    fn test_parse_user_id() {
        assert_eq!(parse_user_id("42").unwrap(), UserId(42));
        assert!(matches!(parse_user_id("abc"), Err(AppError::InvalidUserId)));
        assert!(matches!(parse_user_id(""), Err(AppError::InvalidUserId)));
    }
}
