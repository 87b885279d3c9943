//! # Secret Subcommand
//!
//! Generates values for `SESSION_SECRET`.

use std::io::Write;

use anyhow::ensure;
use clap::Args;
use ledgerline_crypto::secret::MIN_SECRET_LEN;
use rand::RngCore;

/// Upper bound on `--bytes`.
pub const MAX_SECRET_BYTES: u16 = 4096;

/// Arguments for the secret subcommand.
#[derive(Args, Debug)]
pub struct SecretArgs {
    /// Random bytes to generate. The hex output is twice as long.
    #[arg(
        long,
        default_value_t = 64,
        value_parser = clap::value_parser!(u16).range(1..=i64::from(MAX_SECRET_BYTES))
    )]
    pub bytes: u16,
}

/// Hex-encoded random secret of `bytes` bytes.
pub fn generate(bytes: u16) -> anyhow::Result<String> {
    let bytes = usize::from(bytes);
    // The service measures the configured string, and hex doubles the length.
    ensure!(
        bytes * 2 >= MIN_SECRET_LEN,
        "a secret needs at least {} bytes",
        MIN_SECRET_LEN.div_ceil(2)
    );
    ensure!(
        bytes <= usize::from(MAX_SECRET_BYTES),
        "a secret is limited to {MAX_SECRET_BYTES} bytes"
    );
    let mut buf = vec![0u8; bytes];
    rand::rngs::OsRng.fill_bytes(&mut buf);
    Ok(hex::encode(buf))
}

/// Run the secret subcommand, printing one secret per invocation.
pub fn run(args: SecretArgs, out: &mut impl Write) -> anyhow::Result<bool> {
    writeln!(out, "{}", generate(args.bytes)?)?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use ledgerline_crypto::SigningSecret;

    #[derive(Parser, Debug)]
    struct SecretCli {
        #[command(flatten)]
        args: SecretArgs,
    }

    #[test]
    fn bytes_flag_is_bounded() {
        assert_eq!(SecretCli::try_parse_from(["secret"]).unwrap().args.bytes, 64);
        assert_eq!(
            SecretCli::try_parse_from(["secret", "--bytes", "4096"]).unwrap().args.bytes,
            MAX_SECRET_BYTES
        );
        for bad in ["0", "4097", "18446744073709551615", "-1"] {
            assert!(SecretCli::try_parse_from(["secret", "--bytes", bad]).is_err(), "{bad}");
        }
    }

    #[test]
    fn generated_secret_is_accepted() {
        let secret = generate(64).unwrap();
        assert_eq!(secret.len(), 128);
        assert!(SigningSecret::new(secret).is_ok());
    }

    #[test]
    fn secrets_differ() {
        assert_ne!(generate(32).unwrap(), generate(32).unwrap());
    }

    #[test]
    fn too_short_is_refused() {
        assert!(generate(8).is_err());
        assert!(generate(16).is_ok());
        assert!(generate(MAX_SECRET_BYTES).is_ok());
        assert!(generate(MAX_SECRET_BYTES + 1).is_err());
    }
}
