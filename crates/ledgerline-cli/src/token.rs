//! # Token Subcommand
//!
//! Mints session tokens for local testing and decodes tokens seen in logs
//! or bug reports. Both use the secret from `SESSION_SECRET`, falling back
//! to the development secret exactly as the server does.

use std::io::{BufRead, Write};

use anyhow::Context;
use chrono::{DateTime, Utc};
use clap::{Args, Subcommand};
use ledgerline_core::{AuthContext, Role, TokenKind};
use ledgerline_crypto::{CredentialService, SigningSecret};

use crate::value_or_line;

/// Arguments for the token subcommand.
#[derive(Args, Debug)]
pub struct TokenArgs {
    #[command(subcommand)]
    pub command: TokenCommand,
}

#[derive(Subcommand, Debug)]
pub enum TokenCommand {
    /// Sign a session token and print it.
    Sign(SignArgs),
    /// Verify a token and print its payload. Reads stdin unless the token
    /// is given. Exits non-zero if the token is invalid or expired.
    Inspect {
        token: Option<String>,
    },
}

#[derive(Args, Debug)]
pub struct SignArgs {
    #[arg(long)]
    pub subject: String,
    #[arg(long)]
    pub email: String,
    #[arg(long)]
    pub name: Option<String>,
    /// One of admin, approver, clerk, viewer, external_party.
    #[arg(long, value_parser = parse_role)]
    pub role: Role,
    #[arg(long)]
    pub tenant: String,
    /// `staff` or `portal`.
    #[arg(long, default_value = "staff", value_parser = parse_kind)]
    pub kind: TokenKind,
    /// Issue an extended-lifetime token.
    #[arg(long)]
    pub remember_me: bool,
    /// Issue time (RFC 3339). Defaults to now.
    #[arg(long)]
    pub issued_at: Option<DateTime<Utc>>,
}

fn parse_role(name: &str) -> Result<Role, String> {
    Role::parse(name).ok_or_else(|| format!("unknown role `{name}`"))
}

fn parse_kind(name: &str) -> Result<TokenKind, String> {
    match name {
        "staff" => Ok(TokenKind::Staff),
        "portal" => Ok(TokenKind::Portal),
        other => Err(format!("unknown token kind `{other}`")),
    }
}

/// The configured `SESSION_SECRET`, or the development secret.
pub fn secret_from_env() -> anyhow::Result<SigningSecret> {
    match std::env::var("SESSION_SECRET") {
        Ok(value) if !value.is_empty() => {
            SigningSecret::new(value.into_bytes()).context("SESSION_SECRET is not usable")
        }
        _ => {
            tracing::warn!("SESSION_SECRET not set, using the development secret");
            Ok(SigningSecret::development())
        }
    }
}

pub fn run(
    args: TokenArgs,
    secret: &SigningSecret,
    input: &mut impl BufRead,
    out: &mut impl Write,
) -> anyhow::Result<bool> {
    let service = CredentialService::new(secret);
    match args.command {
        TokenCommand::Sign(args) => {
            let identity = AuthContext {
                display_name: args.name.unwrap_or_else(|| args.email.clone()),
                subject_id: args.subject,
                email: args.email,
                role: args.role.as_str().to_string(),
                tenant_id: args.tenant,
                token_kind: args.kind,
            };
            let issued_at = args.issued_at.unwrap_or_else(Utc::now);
            let token = service.sign_at(&identity, args.remember_me, issued_at)?;
            tracing::debug!(subject = %identity.subject_id, %issued_at, "token signed");
            writeln!(out, "{token}")?;
            Ok(true)
        }
        TokenCommand::Inspect { token } => {
            let token = value_or_line(token, input)?;
            match service.verify(token.trim()) {
                Some(payload) => {
                    writeln!(out, "{}", serde_json::to_string_pretty(&payload)?)?;
                    Ok(true)
                }
                None => {
                    writeln!(out, "invalid or expired token")?;
                    Ok(false)
                }
            }
        }
    }
}
