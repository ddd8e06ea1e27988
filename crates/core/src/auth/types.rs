use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

use super::AuthError;

/// Supported OIDC identity providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OidcProvider {
    Google,
    Apple,
}

impl std::fmt::Display for OidcProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Google => write!(f, "google"),
            Self::Apple => write!(f, "apple"),
        }
    }
}

impl std::str::FromStr for OidcProvider {
    type Err = AuthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "google" => Ok(Self::Google),
            "apple" => Ok(Self::Apple),
            other => Err(AuthError::Provider(format!("unknown provider: {other}"))),
        }
    }
}

/// Verified external identity extracted from a provider's ID token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OidcClaims {
    /// Provider-assigned subject identifier. Together with `provider` this
    /// is the globally unique anchor for account linking.
    pub subject: String,
    pub email: Option<String>,
    pub name: Option<String>,
    /// Avatar URL, when the provider supplies one.
    pub picture: Option<String>,
    pub provider: OidcProvider,
}

/// PKCE and CSRF state persisted between the consent redirect and the
/// provider callback. Single use: consumed atomically by
/// [`super::FlowRepository::take_flow`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthFlowState {
    pub pkce_verifier: String,
    pub provider: OidcProvider,
    pub created_at: DateTime<Utc>,
    /// Relative URL to send the client to after authentication, already
    /// validated by [`super::validate_return_to`].
    pub return_to: Option<String>,
}

/// Claims carried by the stateless session token.
///
/// Validity is fully determined by the signature and `exp`; no database
/// lookup is ever involved in verification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    /// The internal user id, as a UUID string.
    pub sub: String,
    /// Issued-at, seconds since the UNIX epoch.
    pub iat: i64,
    /// Expiry, seconds since the UNIX epoch.
    pub exp: i64,
}

impl SessionClaims {
    /// Builds claims for a user issued at `issued_at` with a fixed `ttl`.
    pub fn new(user_id: Uuid, issued_at: DateTime<Utc>, ttl: Duration) -> Self {
        let iat = issued_at.timestamp();
        Self {
            sub: user_id.to_string(),
            iat,
            exp: iat + ttl.as_secs() as i64,
        }
    }

    /// A token verified at any instant `now >= exp` is expired.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.exp <= now.timestamp()
    }

    /// Recovers the user id from the `sub` claim.
    pub fn user_id(&self) -> Result<Uuid, AuthError> {
        self.sub
            .parse()
            .map_err(|_| AuthError::TokenInvalid(format!("subject is not a UUID: {}", self.sub)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn provider_round_trips_through_display_and_from_str() {
        for provider in [OidcProvider::Google, OidcProvider::Apple] {
            let parsed: OidcProvider = provider.to_string().parse().unwrap();
            assert_eq!(parsed, provider);
        }
    }

    #[test]
    fn unknown_provider_is_rejected() {
        assert!("facebook".parse::<OidcProvider>().is_err());
    }

    #[test]
    fn session_claims_encode_issuance_and_expiry() {
        let user_id = Uuid::new_v4();
        let issued_at = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let claims = SessionClaims::new(user_id, issued_at, Duration::from_secs(3600));

        assert_eq!(claims.sub, user_id.to_string());
        assert_eq!(claims.iat, issued_at.timestamp());
        assert_eq!(claims.exp, issued_at.timestamp() + 3600);
        assert_eq!(claims.user_id().unwrap(), user_id);
    }

    #[test]
    fn claims_expire_at_the_boundary_instant() {
        let issued_at = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let claims = SessionClaims::new(Uuid::new_v4(), issued_at, Duration::from_secs(60));

        let just_before = issued_at + chrono::Duration::seconds(59);
        let at_expiry = issued_at + chrono::Duration::seconds(60);

        assert!(!claims.is_expired(just_before));
        assert!(claims.is_expired(at_expiry));
    }

    #[test]
    fn non_uuid_subject_is_invalid() {
        let claims = SessionClaims {
            sub: "not-a-uuid".to_string(),
            iat: 0,
            exp: i64::MAX,
        };
        assert!(matches!(
            claims.user_id(),
            Err(AuthError::TokenInvalid(_))
        ));
    }
}
