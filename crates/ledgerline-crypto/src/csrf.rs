//! # CSRF Tokens
//!
//! Double-submit tokens: the server sets the token in a cookie, the client
//! echoes it in a header, and the two must match exactly. A cross-site
//! attacker can make the browser send the cookie but cannot read it to
//! produce the header.

use rand::rngs::OsRng;
use rand::RngCore;

use crate::compare::constant_time_str_eq;

/// Random bytes per token. Hex encoding doubles this to 64 characters.
pub const CSRF_TOKEN_BYTES: usize = 32;

/// Generate a fresh CSRF token: 32 bytes from the OS CSPRNG, hex encoded.
pub fn generate_csrf_token() -> String {
    let mut bytes = [0u8; CSRF_TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Double-submit check. Both values must be present, non-empty, and equal.
pub fn csrf_tokens_match(cookie: Option<&str>, header: Option<&str>) -> bool {
    match (cookie, header) {
        (Some(cookie), Some(header)) if !cookie.is_empty() => constant_time_str_eq(cookie, header),
        _ => false,
    }
}
