// ============================
// inkwell-backend-lib/src/auth/mod.rs
// ============================
//! Authentication module.

pub mod claims;
pub mod password;
pub mod recovery;
pub mod session;
pub mod signer;
mod token_generator;

pub use claims::Claims;
pub use password::{
    validate_password_strength, CredentialHasher, HashError, PasswordPolicy, PasswordRequirements,
    ScryptHasher, MIN_PASSWORD_LENGTH,
};
pub use recovery::PasswordRecoveryService;
pub use session::SessionService;
pub use signer::{TokenError, TokenLifetimes, TokenSigner};
