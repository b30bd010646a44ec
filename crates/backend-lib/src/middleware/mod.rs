// crates/backend-lib/src/middleware/mod.rs

//! Middleware for the inkwell HTTP server.

pub mod auth;

pub use auth::{
    authenticate, require_account_owner, require_admin, require_owner, require_role,
    AuthorizationGate, Identity,
};
