//! # Session Tokens
//!
//! HS256 JWTs carrying a [`TokenPayload`]. The service fixes issuer,
//! audience, and issue time; the caller only chooses the identity and
//! whether the session is extended ("remember me").
//!
//! ## Security invariant
//!
//! [`CredentialService::verify`] returns `Option`, not `Result`. Malformed,
//! forged, expired, and mis-addressed tokens are indistinguishable to the
//! caller so an attacker cannot use the response as an oracle.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use ledgerline_core::{AuthContext, Role, TokenPayload, ValidationError};

use crate::error::CryptoError;
use crate::secret::SigningSecret;

/// Issuer stamped into every token.
pub const TOKEN_ISSUER: &str = "ledgerline";
/// Audience stamped into every token.
pub const TOKEN_AUDIENCE: &str = "ledgerline-api";

/// Session lengths.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenLifetimes {
    /// Default session.
    pub session: Duration,
    /// "Remember me" session.
    pub extended: Duration,
}

impl Default for TokenLifetimes {
    fn default() -> Self {
        Self {
            session: Duration::hours(8),
            extended: Duration::days(30),
        }
    }
}

/// Issues and verifies session tokens.
#[derive(Clone)]
pub struct CredentialService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    lifetimes: TokenLifetimes,
    insecure_secret: bool,
}

impl std::fmt::Debug for CredentialService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialService")
            .field("issuer", &TOKEN_ISSUER)
            .field("audience", &TOKEN_AUDIENCE)
            .field("lifetimes", &self.lifetimes)
            .field("insecure_secret", &self.insecure_secret)
            .finish()
    }
}

impl CredentialService {
    /// Create a service with the default session lengths.
    pub fn new(secret: &SigningSecret) -> Self {
        Self::with_lifetimes(secret, TokenLifetimes::default())
    }

    /// Create a service with explicit session lengths.
    pub fn with_lifetimes(secret: &SigningSecret, lifetimes: TokenLifetimes) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[TOKEN_ISSUER]);
        validation.set_audience(&[TOKEN_AUDIENCE]);
        validation.set_required_spec_claims(&["exp", "iss", "aud", "sub"]);
        // Expiry is checked against an explicit clock in `verify_at`.
        validation.validate_exp = false;
        validation.leeway = 0;

        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            lifetimes,
            insecure_secret: secret.is_insecure_default(),
        }
    }

    /// Configured session lengths.
    pub fn lifetimes(&self) -> TokenLifetimes {
        self.lifetimes
    }

    /// Sign a session token for `claims`, issued now.
    pub fn sign(&self, claims: &AuthContext, remember_me: bool) -> Result<String, CryptoError> {
        self.sign_at(claims, remember_me, Utc::now())
    }

    /// Sign a session token as if issued at `now`.
    pub fn sign_at(
        &self,
        claims: &AuthContext,
        remember_me: bool,
        now: DateTime<Utc>,
    ) -> Result<String, CryptoError> {
        validate_claims(claims)?;

        let ttl = if remember_me {
            self.lifetimes.extended
        } else {
            self.lifetimes.session
        };

        let payload = TokenPayload {
            subject_id: claims.subject_id.clone(),
            email: claims.email.clone(),
            display_name: claims.display_name.clone(),
            role: claims.role.clone(),
            tenant_id: claims.tenant_id.clone(),
            token_kind: claims.token_kind,
            issued_at: now.timestamp(),
            expires_at: (now + ttl).timestamp(),
            issuer: TOKEN_ISSUER.to_string(),
            audience: TOKEN_AUDIENCE.to_string(),
        };

        Ok(jsonwebtoken::encode(
            &Header::new(Algorithm::HS256),
            &payload,
            &self.encoding,
        )?)
    }

    /// Verify a token against the current time.
    pub fn verify(&self, token: &str) -> Option<TokenPayload> {
        self.verify_at(token, Utc::now())
    }

    /// Verify signature, issuer, audience, and expiry (against `now`).
    ///
    /// Any failure yields `None`.
    pub fn verify_at(&self, token: &str, now: DateTime<Utc>) -> Option<TokenPayload> {
        if token.is_empty() {
            return None;
        }
        let payload =
            match jsonwebtoken::decode::<TokenPayload>(token, &self.decoding, &self.validation) {
                Ok(data) => data.claims,
                Err(e) => {
                    tracing::debug!(error = %e, "session token rejected");
                    return None;
                }
            };
        if payload.expires_at <= now.timestamp() {
            tracing::debug!(subject = %payload.subject_id, "session token expired");
            return None;
        }
        Some(payload)
    }
}

fn validate_claims(claims: &AuthContext) -> Result<(), ValidationError> {
    if claims.subject_id.is_empty() {
        return Err(ValidationError::EmptyField("subject_id"));
    }
    if claims.tenant_id.is_empty() {
        return Err(ValidationError::EmptyField("tenant_id"));
    }
    if Role::parse(&claims.role).is_none() {
        return Err(ValidationError::UnknownRole(claims.role.clone()));
    }
    Ok(())
}


#[cfg(test)]
mod proptests {
    use super::*;
    use ledgerline_core::TokenKind;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        /// For every valid identity, verify(sign(claims)) recovers it.
        #[test]
        fn sign_verify_round_trip(
            subject in "[a-z0-9_]{1,24}",
            tenant in "[a-z0-9_]{1,24}",
            name in "[A-Za-z ]{0,32}",
            role_idx in 0usize..5,
            portal in any::<bool>(),
            remember in any::<bool>(),
        ) {
            let secret = SigningSecret::new("proptest-secret-with-at-least-32-bytes").unwrap();
            let svc = CredentialService::new(&secret);
            let claims = AuthContext {
                subject_id: subject,
                email: "p@t.test".into(),
                display_name: name,
                role: Role::ALL[role_idx].as_str().into(),
                tenant_id: tenant,
                token_kind: if portal { TokenKind::Portal } else { TokenKind::Staff },
            };
            let token = svc.sign(&claims, remember).unwrap();
            let payload = svc.verify(&token);
            prop_assert!(payload.is_some());
            let payload = payload.unwrap();
            prop_assert_eq!(payload.auth_context(), claims);
        }
    }
}
