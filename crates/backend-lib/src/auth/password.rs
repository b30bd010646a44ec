// ============================
// inkwell-backend-lib/src/auth/password.rs
// ============================
//! Password strength policy, hashing and verification.
use scrypt::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Params, Scrypt,
};
use serde::Deserialize;
use thiserror::Error;

/// Minimum password length
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Password complexity requirements
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PasswordRequirements {
    pub min_length: usize,
    pub require_uppercase: bool,
    pub require_lowercase: bool,
    pub require_digit: bool,
    pub require_special: bool,
}

impl Default for PasswordRequirements {
    fn default() -> Self {
        Self {
            min_length: MIN_PASSWORD_LENGTH,
            require_uppercase: true,
            require_lowercase: true,
            require_digit: true,
            require_special: true,
        }
    }
}

/// Check if a password meets the complexity requirements.
///
/// Length counts characters, not bytes. A "special" character is any
/// punctuation or symbol: not alphanumeric, not whitespace, not a control.
pub fn validate_password_strength(password: &str, requirements: &PasswordRequirements) -> bool {
    if password.chars().count() < requirements.min_length {
        return false;
    }

    let (mut upper, mut lower, mut digit, mut special) = (false, false, false, false);
    for c in password.chars() {
        if c.is_uppercase() {
            upper = true;
        } else if c.is_lowercase() {
            lower = true;
        } else if c.is_numeric() {
            digit = true;
        } else if !c.is_alphanumeric() && !c.is_whitespace() && !c.is_control() {
            special = true;
        }
    }

    (upper || !requirements.require_uppercase)
        && (lower || !requirements.require_lowercase)
        && (digit || !requirements.require_digit)
        && (special || !requirements.require_special)
}

/// The single password rule applied at registration, authenticated reset
/// and link-based update.
#[derive(Debug, Clone, Default)]
pub struct PasswordPolicy {
    requirements: PasswordRequirements,
}

impl PasswordPolicy {
    pub fn new(requirements: PasswordRequirements) -> Self {
        Self { requirements }
    }

    pub fn validate(&self, password: &str) -> bool {
        validate_password_strength(password, &self.requirements)
    }

    pub fn min_length(&self) -> usize {
        self.requirements.min_length
    }
}

/// Failures of [`CredentialHasher`]. Messages never include the plaintext
/// or the digest.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HashError {
    #[error("credential does not match")]
    CredentialMismatch,

    #[error("stored digest is not recognizable")]
    MalformedDigest,

    #[error("hashing failed: {0}")]
    Hashing(String),
}

/// One-way salted password hashing with constant-time verification.
/// Implementations are CPU bound; async callers run them on a blocking thread.
pub trait CredentialHasher: Send + Sync {
    /// Produce a digest with a freshly generated salt
    fn hash(&self, plain: &str) -> Result<String, HashError>;

    /// Check `plain` against a digest produced by [`CredentialHasher::hash`]
    fn verify(&self, digest: &str, plain: &str) -> Result<(), HashError>;
}

/// scrypt in PHC string format. Cost parameters travel inside each digest,
/// so raising the cost only affects new hashes.
#[derive(Debug, Clone, Copy)]
pub struct ScryptHasher {
    params: Params,
}

impl ScryptHasher {
    /// Build a hasher with cost `2^log_n`, block size `r` and parallelism `p`
    pub fn new(log_n: u8, r: u32, p: u32) -> Result<Self, HashError> {
        let params = Params::new(log_n, r, p, Params::RECOMMENDED_LEN)
            .map_err(|e| HashError::Hashing(e.to_string()))?;
        Ok(Self { params })
    }
}

impl Default for ScryptHasher {
    fn default() -> Self {
        Self {
            params: Params::recommended(),
        }
    }
}

impl CredentialHasher for ScryptHasher {
    fn hash(&self, plain: &str) -> Result<String, HashError> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = Scrypt
            .hash_password_customized(plain.as_bytes(), None, None, self.params, &salt)
            .map_err(|e| HashError::Hashing(e.to_string()))?
            .to_string();
        Ok(hash)
    }

    fn verify(&self, digest: &str, plain: &str) -> Result<(), HashError> {
        let parsed_hash = PasswordHash::new(digest).map_err(|_| HashError::MalformedDigest)?;
        match Scrypt.verify_password(plain.as_bytes(), &parsed_hash) {
            Ok(()) => Ok(()),
            Err(scrypt::password_hash::Error::Password) => Err(HashError::CredentialMismatch),
            Err(_) => Err(HashError::MalformedDigest),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cheap_hasher() -> ScryptHasher {
        ScryptHasher::new(4, 8, 1).unwrap()
    }

    #[test]
    fn test_password_strength_validation() {
        let requirements = PasswordRequirements::default();

        assert!(validate_password_strength("Passw0rd!", &requirements));
        assert!(validate_password_strength("NewPass1!", &requirements));

        // Too short
        assert!(!validate_password_strength("Pa0!x", &requirements));
        // Missing uppercase
        assert!(!validate_password_strength("passw0rd!", &requirements));
        // Missing lowercase
        assert!(!validate_password_strength("PASSW0RD!", &requirements));
        // Missing digit
        assert!(!validate_password_strength("Password!", &requirements));
        // Missing special character
        assert!(!validate_password_strength("Passw0rdd", &requirements));
        // Whitespace is not a symbol
        assert!(!validate_password_strength("Passw0rd ", &requirements));
        assert!(!validate_password_strength("", &requirements));
    }

    #[test]
    fn test_length_counts_characters() {
        let requirements = PasswordRequirements::default();
        // 7 characters, more than 8 bytes
        assert!(!validate_password_strength("Ää1!Ööx", &requirements));
        assert!(validate_password_strength("Ää1!Ööxy", &requirements));
    }

    #[test]
    fn test_custom_requirements() {
        let custom = PasswordRequirements {
            min_length: 10,
            require_uppercase: false,
            require_lowercase: true,
            require_digit: true,
            require_special: false,
        };
        assert!(validate_password_strength("securepassw0rd", &custom));
        assert!(!validate_password_strength("secure0rd", &custom));

        let policy = PasswordPolicy::new(custom);
        assert_eq!(policy.min_length(), 10);
    }

    #[test]
    fn test_hash_and_verify() {
        let hasher = cheap_hasher();
        let digest = hasher.hash("Passw0rd!").unwrap();

        assert!(!digest.contains("Passw0rd!"));
        assert!(digest.starts_with("$scrypt$"));
        assert_eq!(hasher.verify(&digest, "Passw0rd!"), Ok(()));
        assert_eq!(
            hasher.verify(&digest, "wrong_password"),
            Err(HashError::CredentialMismatch)
        );
    }

    #[test]
    fn test_hash_is_salted_per_call() {
        let hasher = cheap_hasher();
        let first = hasher.hash("Passw0rd!").unwrap();
        let second = hasher.hash("Passw0rd!").unwrap();

        assert_ne!(first, second);
        assert!(hasher.verify(&first, "Passw0rd!").is_ok());
        assert!(hasher.verify(&second, "Passw0rd!").is_ok());
    }

    #[test]
    fn test_single_character_mutations_fail() {
        let hasher = cheap_hasher();
        let plain = "Passw0rd!";
        let digest = hasher.hash(plain).unwrap();

        for (i, _) in plain.char_indices() {
            let mut mutated: Vec<char> = plain.chars().collect();
            mutated[i] = if mutated[i] == 'x' { 'y' } else { 'x' };
            let mutated: String = mutated.into_iter().collect();
            assert_eq!(
                hasher.verify(&digest, &mutated),
                Err(HashError::CredentialMismatch),
                "mutation at {i} verified"
            );
        }
    }

    #[test]
    fn test_malformed_digest() {
        let hasher = cheap_hasher();
        assert_eq!(
            hasher.verify("not-a-digest", "Passw0rd!"),
            Err(HashError::MalformedDigest)
        );
    }

    #[test]
    fn test_invalid_cost_parameters() {
        assert!(ScryptHasher::new(4, 0, 1).is_err());
    }
}
