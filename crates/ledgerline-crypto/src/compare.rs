//! Constant-time equality for secret-dependent comparisons.
//!
//! Length is checked first and a mismatch returns immediately: the length of
//! a CSRF token or derived key is public. Equal-length inputs are compared
//! over every byte with `subtle`, which never exits on the first difference.

use subtle::ConstantTimeEq;

/// Compare two byte strings without leaking the position of the first
/// differing byte.
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.ct_eq(b).into()
}

/// [`constant_time_eq`] over the UTF-8 bytes of two strings.
pub fn constant_time_str_eq(a: &str, b: &str) -> bool {
    constant_time_eq(a.as_bytes(), b.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_inputs_match() {
        assert!(constant_time_str_eq("secret-token-123", "secret-token-123"));
    }

    #[test]
    fn different_inputs_do_not_match() {
        assert!(!constant_time_str_eq("secret-token-124", "secret-token-123"));
        assert!(!constant_time_str_eq("Xecret-token-123", "secret-token-123"));
    }

    #[test]
    fn prefix_does_not_match() {
        assert!(!constant_time_str_eq("secret", "secret-token-123"));
    }

    #[test]
    fn empty_matches_only_empty() {
        assert!(constant_time_eq(b"", b""));
        assert!(!constant_time_eq(b"", b"x"));
    }
}
