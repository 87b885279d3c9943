//! # Password Subcommand
//!
//! Produces `passwordHash` values for the users file and checks a password
//! against a stored hash.

use std::io::{BufRead, Write};

use clap::{Args, Subcommand};

use crate::value_or_line;

/// Arguments for the password subcommand.
#[derive(Args, Debug)]
pub struct PasswordArgs {
    #[command(subcommand)]
    pub command: PasswordCommand,
}

#[derive(Subcommand, Debug)]
pub enum PasswordCommand {
    /// Hash a password. Reads it from stdin unless `--password` is given.
    Hash {
        #[arg(long)]
        password: Option<String>,
    },
    /// Check a password against a stored `salt:key` hash. Exits non-zero
    /// on mismatch.
    Verify {
        /// Stored hash from the users file.
        #[arg(long)]
        hash: String,
        #[arg(long)]
        password: Option<String>,
    },
}

/// Run the password subcommand. Returns whether the check passed.
pub fn run(args: PasswordArgs, input: &mut impl BufRead, out: &mut impl Write) -> anyhow::Result<bool> {
    match args.command {
        PasswordCommand::Hash { password } => {
            let password = value_or_line(password, input)?;
            writeln!(out, "{}", ledgerline_crypto::hash_password(&password))?;
            Ok(true)
        }
        PasswordCommand::Verify { hash, password } => {
            let password = value_or_line(password, input)?;
            let matches = ledgerline_crypto::verify_password(&password, &hash);
            tracing::debug!(matches, "password checked");
            writeln!(out, "{}", if matches { "match" } else { "mismatch" })?;
            Ok(matches)
        }
    }
}
