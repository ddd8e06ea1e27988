//! Stateless session token service.
//!
//! Issues and verifies HS256-signed JWTs carrying `{sub, iat, exp}`.
//! Verification is CPU-only: it checks the signature and expiry against
//! the configured secret and never consults storage.

use std::time::Duration;

use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use uuid::Uuid;

use questline_core::auth::{AuthError, Result, SessionClaims};

/// Token-service configuration, constructed once at process start and
/// passed by value. `issue`/`verify` never read ambient environment state.
#[derive(Debug, Clone)]
pub struct TokenConfig {
    /// Server-held HMAC signing secret.
    pub signing_secret: String,
    /// Fixed session TTL; there is no per-call override.
    pub ttl: Duration,
}

/// Issues and verifies session tokens.
#[derive(Clone)]
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl TokenService {
    pub fn new(config: &TokenConfig) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        // No clock-skew tolerance: a token presented at or after its expiry
        // instant is expired.
        validation.leeway = 0;

        Self {
            encoding_key: EncodingKey::from_secret(config.signing_secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.signing_secret.as_bytes()),
            validation,
            ttl: config.ttl,
        }
    }

    /// Issues a signed token for `user_id` expiring after the fixed TTL.
    pub fn issue(&self, user_id: Uuid) -> Result<String> {
        let claims = SessionClaims::new(user_id, Utc::now(), self.ttl);
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AuthError::TokenInvalid(format!("failed to sign session token: {e}")))
    }

    /// Verifies a presented token and recovers the user id.
    ///
    /// Fails closed with [`AuthError::TokenExpired`] when the signature is
    /// valid but the token is at or past its expiry instant, and
    /// [`AuthError::TokenInvalid`] for every other problem (malformed
    /// input, bad signature, wrong algorithm). Callers map both to the same
    /// unauthorized outcome but log them distinctly.
    pub fn verify(&self, token: &str) -> Result<Uuid> {
        let data =
            decode::<SessionClaims>(token, &self.decoding_key, &self.validation).map_err(|e| {
                match e.kind() {
                    jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                    _ => AuthError::TokenInvalid(e.to_string()),
                }
            })?;

        // The library check is strict-past only (`exp < now` passes
        // `exp == now`); the domain rule is `exp <= now` means expired.
        if data.claims.is_expired(Utc::now()) {
            return Err(AuthError::TokenExpired);
        }

        data.claims.user_id()
    }
}
