//! # Configuration
//!
//! Read once at startup from environment variables.
//!
//! | Variable                          | Default             |
//! |-----------------------------------|---------------------|
//! | `PORT`                            | `8080`              |
//! | `APP_ENV`                         | `development`       |
//! | `SESSION_SECRET`                  | development secret  |
//! | `DATABASE_URL`                    | unset (in-memory)   |
//! | `USERS_FILE`                      | unset               |
//! | `AUDIT_QUEUE_CAPACITY`            | `1024`              |
//! | `RATE_LIMIT_SWEEP_SECS`           | longest window      |
//! | `RATE_LIMIT_<PROFILE>_MAX`        | per profile         |
//! | `RATE_LIMIT_<PROFILE>_WINDOW_SECS`| per profile         |
//!
//! `<PROFILE>` is `API`, `AUTH` or `SENSITIVE`. In production a missing
//! `SESSION_SECRET` is a startup error rather than a silent fallback.

use std::path::PathBuf;
use std::time::Duration;

use ledgerline_crypto::{CryptoError, SigningSecret};
use thiserror::Error;

use crate::audit::DEFAULT_QUEUE_CAPACITY;
use crate::rate_limit::RateLimitProfile;

/// Configuration errors. Each one aborts startup.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A variable is set but cannot be parsed.
    #[error("invalid value for {key}: {value:?}")]
    InvalidValue {
        /// Variable name.
        key: &'static str,
        /// Raw value.
        value: String,
    },

    /// Production refuses to run on the built-in development secret.
    #[error("SESSION_SECRET must be set when APP_ENV=production")]
    MissingSecretInProduction,

    /// The configured secret is unusable.
    #[error("SESSION_SECRET rejected: {0}")]
    Secret(#[from] CryptoError),
}

/// Deployment environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    /// Local development and tests.
    Development,
    /// Anything facing real users.
    Production,
}

impl Environment {
    fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "production" | "prod" => Self::Production,
            _ => Self::Development,
        }
    }

    /// Whether this is [`Environment::Production`].
    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }
}

/// The three named rate-limit profiles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitProfiles {
    /// General API traffic.
    pub api: RateLimitProfile,
    /// Sign-in and other credential endpoints.
    pub auth: RateLimitProfile,
    /// Approvals, payouts and similar.
    pub sensitive: RateLimitProfile,
}

impl Default for RateLimitProfiles {
    fn default() -> Self {
        Self {
            api: RateLimitProfile::api(),
            auth: RateLimitProfile::auth(),
            sensitive: RateLimitProfile::sensitive(),
        }
    }
}

impl RateLimitProfiles {
    /// Longest window of any profile.
    pub fn longest_window(&self) -> Duration {
        [&self.api, &self.auth, &self.sensitive]
            .iter()
            .map(|p| p.window)
            .max()
            .unwrap_or(Duration::from_secs(60))
    }
}

/// Application configuration.
#[derive(Clone)]
pub struct AppConfig {
    /// Port to bind.
    pub port: u16,
    /// Deployment environment.
    pub environment: Environment,
    /// Token signing secret.
    pub signing_secret: SigningSecret,
    /// PostgreSQL connection string.
    pub database_url: Option<String>,
    /// JSON file of sign-in records loaded at startup.
    pub users_file: Option<PathBuf>,
    /// Rate-limit profiles.
    pub rate_limits: RateLimitProfiles,
    /// Capacity of the audit queue.
    pub audit_queue_capacity: usize,
    /// How often empty rate-limit keys are swept.
    pub sweep_interval: Duration,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("port", &self.port)
            .field("environment", &self.environment)
            .field("signing_secret", &self.signing_secret)
            .field(
                "database_url",
                &self.database_url.as_ref().map(|_| "[REDACTED]"),
            )
            .field("users_file", &self.users_file)
            .field("rate_limits", &self.rate_limits)
            .field("audit_queue_capacity", &self.audit_queue_capacity)
            .field("sweep_interval", &self.sweep_interval)
            .finish()
    }
}

impl Default for AppConfig {
    /// Development configuration with the built-in secret.
    fn default() -> Self {
        let rate_limits = RateLimitProfiles::default();
        Self {
            port: 8080,
            environment: Environment::Development,
            signing_secret: SigningSecret::development(),
            database_url: None,
            users_file: None,
            sweep_interval: rate_limits.longest_window(),
            rate_limits,
            audit_queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }
}

impl AppConfig {
    /// Read configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read configuration through `lookup`. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        let environment = get("APP_ENV")
            .map(|v| Environment::parse(&v))
            .unwrap_or(defaults.environment);

        let signing_secret = match get("SESSION_SECRET") {
            Some(secret) => SigningSecret::new(secret.into_bytes())?,
            None if environment.is_production() => {
                return Err(ConfigError::MissingSecretInProduction)
            }
            None => SigningSecret::development(),
        };

        let rate_limits = RateLimitProfiles {
            api: profile(&get, "API", defaults.rate_limits.api)?,
            auth: profile(&get, "AUTH", defaults.rate_limits.auth)?,
            sensitive: profile(&get, "SENSITIVE", defaults.rate_limits.sensitive)?,
        };

        // Sweeping more often than the longest window only wastes work.
        let longest = rate_limits.longest_window();
        let sweep_interval = parse::<u64>(&get, "RATE_LIMIT_SWEEP_SECS")?
            .map(Duration::from_secs)
            .map_or(longest, |d| d.max(longest));

        Ok(Self {
            port: parse(&get, "PORT")?.unwrap_or(defaults.port),
            environment,
            signing_secret,
            database_url: get("DATABASE_URL"),
            users_file: get("USERS_FILE").map(PathBuf::from),
            rate_limits,
            audit_queue_capacity: parse::<usize>(&get, "AUDIT_QUEUE_CAPACITY")?
                .filter(|&n| n > 0)
                .unwrap_or(defaults.audit_queue_capacity),
            sweep_interval,
        })
    }
}

fn parse<T: std::str::FromStr>(
    get: &impl Fn(&str) -> Option<String>,
    key: &'static str,
) -> Result<Option<T>, ConfigError> {
    get(key)
        .map(|raw| {
            raw.trim()
                .parse::<T>()
                .map_err(|_| ConfigError::InvalidValue { key, value: raw })
        })
        .transpose()
}

fn profile(
    get: &impl Fn(&str) -> Option<String>,
    name: &'static str,
    default: RateLimitProfile,
) -> Result<RateLimitProfile, ConfigError> {
    let (max_key, window_key) = match name {
        "API" => ("RATE_LIMIT_API_MAX", "RATE_LIMIT_API_WINDOW_SECS"),
        "AUTH" => ("RATE_LIMIT_AUTH_MAX", "RATE_LIMIT_AUTH_WINDOW_SECS"),
        _ => ("RATE_LIMIT_SENSITIVE_MAX", "RATE_LIMIT_SENSITIVE_WINDOW_SECS"),
    };
    let max_requests = parse::<u32>(get, max_key)?.unwrap_or(default.max_requests);
    let window = match parse::<u64>(get, window_key)? {
        Some(0) => {
            return Err(ConfigError::InvalidValue {
                key: window_key,
                value: "0".into(),
            })
        }
        Some(secs) => Duration::from_secs(secs),
        None => default.window,
    };
    Ok(RateLimitProfile {
        max_requests,
        window,
        ..default
    })
}
