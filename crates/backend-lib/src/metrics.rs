// ==============
// crates/backend-lib/src/metrics.rs

//! Central place for metric keys
pub const LOGIN_SUCCEEDED: &str = "auth.login.succeeded";
pub const LOGIN_FAILED: &str = "auth.login.failed";
pub const TOKEN_REFRESHED: &str = "auth.token.refreshed";
pub const TOKEN_REVOKED: &str = "auth.token.revoked";
pub const USER_REGISTERED: &str = "auth.user.registered";
pub const PASSWORD_RESET_REQUESTED: &str = "auth.password.reset_requested";
pub const PASSWORD_UPDATED: &str = "auth.password.updated";
