// ============================
// crates/backend-lib/src/auth/token_generator.rs
// ============================
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
/** Random nonces for signed tokens
Each signed token carries one of these as its `jti` claim, so that two
tokens minted for the same subject within the same second still have
distinct content. */
use rand::RngCore;

/// Default nonce size in bytes (16 bytes = 128 bits of entropy)
const DEFAULT_NONCE_BYTES: usize = 16;

/** Generate a random token nonce
# Returns
A base64 URL-safe encoded string without padding */
pub fn generate_token_id() -> String {
    generate_token_id_with_size(DEFAULT_NONCE_BYTES)
}

/** Generate a random nonce with specified size
# Arguments
* `bytes` - The size of the nonce in bytes */
pub fn generate_token_id_with_size(bytes: usize) -> String {
    let mut buffer = vec![0u8; bytes];
    rand::rng().fill_bytes(&mut buffer);
    URL_SAFE_NO_PAD.encode(buffer)
}
