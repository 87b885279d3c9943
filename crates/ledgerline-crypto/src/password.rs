//! # Password Hashing
//!
//! PBKDF2-HMAC-SHA256, 100 000 iterations, 16-byte random salt, 32-byte
//! derived key. Stored form is `hex(salt):hex(key)`.
//!
//! Derivation takes hundreds of milliseconds by construction. Only login and
//! registration call into this module, never per-request authorization.

use pbkdf2::pbkdf2_hmac;
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::Sha256;
use zeroize::Zeroizing;

use crate::compare::constant_time_eq;

/// Key-derivation work factor.
pub const PBKDF2_ITERATIONS: u32 = 100_000;

const SALT_LEN: usize = 16;
const KEY_LEN: usize = 32;

/// Hash a password with a fresh random salt.
///
/// Two calls with the same input return different strings.
pub fn hash_password(plaintext: &str) -> String {
    let mut salt = [0u8; SALT_LEN];
    OsRng.fill_bytes(&mut salt);

    let mut key = Zeroizing::new([0u8; KEY_LEN]);
    pbkdf2_hmac::<Sha256>(plaintext.as_bytes(), &salt, PBKDF2_ITERATIONS, &mut key[..]);

    format!("{}:{}", hex::encode(salt), hex::encode(&key[..]))
}

/// Check a password against a stored `hex(salt):hex(key)` value.
///
/// Malformed stored values (no separator, empty halves, bad hex) return
/// `false`; this never panics.
pub fn verify_password(plaintext: &str, stored: &str) -> bool {
    let Some((salt_hex, key_hex)) = stored.split_once(':') else {
        return false;
    };
    if salt_hex.is_empty() || key_hex.is_empty() {
        return false;
    }
    let (Ok(salt), Ok(expected)) = (hex::decode(salt_hex), hex::decode(key_hex)) else {
        return false;
    };

    let mut derived = Zeroizing::new(vec![0u8; expected.len()]);
    pbkdf2_hmac::<Sha256>(plaintext.as_bytes(), &salt, PBKDF2_ITERATIONS, &mut derived[..]);

    constant_time_eq(&derived[..], &expected)
}
