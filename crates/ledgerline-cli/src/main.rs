//! # ledgerline CLI Entry Point
//!
//! Assembles subcommands and dispatches to handler modules.

use std::io::Write;
use std::process::ExitCode;

use clap::{ArgAction, Parser};
use ledgerline_cli::{password, secret, token};
use tracing_subscriber::EnvFilter;

/// Ledgerline operator toolkit.
///
/// Prepares credentials for the users file, generates signing secrets, and
/// issues or inspects session tokens.
#[derive(Parser, Debug)]
#[command(name = "ledgerline", version, about)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace). `RUST_LOG` overrides.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Hash or check passwords.
    Password(password::PasswordArgs),
    /// Generate a session signing secret.
    Secret(secret::SecretArgs),
    /// Print a fresh CSRF token.
    Csrf,
    /// Sign or inspect session tokens.
    Token(token::TokenArgs),
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn dispatch(command: Commands) -> anyhow::Result<bool> {
    let mut stdin = std::io::stdin().lock();
    let mut stdout = std::io::stdout().lock();
    match command {
        Commands::Password(args) => password::run(args, &mut stdin, &mut stdout),
        Commands::Secret(args) => secret::run(args, &mut stdout),
        Commands::Csrf => {
            writeln!(stdout, "{}", ledgerline_crypto::generate_csrf_token())?;
            Ok(true)
        }
        Commands::Token(args) => {
            let secret = token::secret_from_env()?;
            token::run(args, &secret, &mut stdin, &mut stdout)
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match dispatch(cli.command) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::from(2)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_token_sign() {
        let cli = Cli::try_parse_from([
            "ledgerline", "-v", "token", "sign", "--subject", "usr_1", "--email", "a@b.test",
            "--role", "clerk", "--tenant", "ten_1", "--remember-me",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 1);
        assert!(matches!(cli.command, Commands::Token(_)));
    }

    #[test]
    fn parses_password_hash() {
        let cli = Cli::try_parse_from(["ledgerline", "password", "hash", "--password", "pw"]).unwrap();
        let Commands::Password(args) = cli.command else {
            panic!("expected password subcommand");
        };
        assert!(matches!(
            args.command,
            password::PasswordCommand::Hash { password: Some(ref p) } if p == "pw"
        ));
        assert!(Cli::try_parse_from(["ledgerline", "hash-password"]).is_err());
    }

    #[test]
    fn rejects_unknown_role() {
        let parsed = Cli::try_parse_from([
            "ledgerline", "token", "sign", "--subject", "usr_1", "--email", "a@b.test",
            "--role", "root", "--tenant", "ten_1",
        ]);
        assert!(parsed.is_err());
    }
}
