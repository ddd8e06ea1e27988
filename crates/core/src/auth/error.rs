use thiserror::Error;

/// Failure taxonomy for identity federation and session issuance.
///
/// The provisioning *race* (two concurrent first-logins for the same
/// external identity) is deliberately not represented here: it is an
/// expected, recoverable condition modeled as
/// [`crate::account::BootstrapOutcome::Conflict`].
#[derive(Debug, Error)]
pub enum AuthError {
    /// OAuth state parameter unknown or already consumed.
    #[error("invalid OIDC state parameter")]
    InvalidState,

    /// The authorization code was rejected or the provider was unreachable.
    /// Codes are single use, so this is never retried.
    #[error("failed to exchange authorization code: {0}")]
    IdentityExchange(String),

    /// Account bootstrap failed for a reason other than the uniqueness race.
    #[error("failed to provision account: {0}")]
    ProvisioningFailed(String),

    /// Session token is malformed or its signature does not verify.
    #[error("invalid session token: {0}")]
    TokenInvalid(String),

    /// Session token has a valid signature but is past its expiry.
    #[error("session token expired")]
    TokenExpired,

    /// No bearer credential was presented on an authenticated route.
    #[error("missing bearer credential")]
    NoCredential,

    #[error("storage error: {0}")]
    Storage(String),

    #[error("provider error: {0}")]
    Provider(String),
}
