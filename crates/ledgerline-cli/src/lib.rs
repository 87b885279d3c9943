//! # ledgerline-cli: Operator Command-Line Interface
//!
//! Offline helpers for operating a Ledgerline deployment: preparing the
//! users file, generating a signing secret, and minting or inspecting
//! session tokens while debugging.
//!
//! ## Subcommands
//!
//! - `password`: Hash a password for the users file, or check one
//! - `secret`: Generate a `SESSION_SECRET`
//! - `csrf`: Print a fresh CSRF token
//! - `token`: Sign a session token, or verify and decode one
//!
//! ## Crate Policy
//!
//! - Argument parsing lives beside each handler; `main.rs` only dispatches.
//! - Handlers write to the `Write` they are given so they can be tested.
//! - Cryptography is delegated to `ledgerline-crypto`.

pub mod password;
pub mod secret;
pub mod token;

use std::io::BufRead;

use anyhow::{bail, Context};

/// Use `value` if given, otherwise read one line from `input`.
///
/// The trailing line break is stripped; other whitespace is kept.
pub fn value_or_line(value: Option<String>, input: &mut impl BufRead) -> anyhow::Result<String> {
    if let Some(value) = value {
        return Ok(value);
    }
    let mut line = String::new();
    input
        .read_line(&mut line)
        .context("failed to read from stdin")?;
    let trimmed = line.trim_end_matches(['\r', '\n']);
    if trimmed.is_empty() {
        bail!("no input provided");
    }
    Ok(trimmed.to_string())
}
