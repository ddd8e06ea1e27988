use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

/// Auth errors for the questline_auth crate.
///
/// This wraps the core `AuthError` and adds crate-specific variants for
/// configuration and routing problems that can't live in the functional
/// core.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Error from the core auth module (exchange, token, storage, etc.)
    #[error(transparent)]
    Core(#[from] questline_core::auth::AuthError),

    /// Error from the account repository.
    #[error(transparent)]
    Repository(#[from] questline_core::account::RepositoryError),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Route provider segment did not name a known provider
    #[error("unknown provider: {0}")]
    UnknownProvider(String),

    /// Provider known but not enabled in this deployment
    #[error("provider not configured: {0}")]
    ProviderNotConfigured(String),
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        use questline_core::auth::AuthError as CoreError;

        let (status, message) = match &self {
            AuthError::Core(core_err) => match core_err {
                CoreError::InvalidState => (StatusCode::BAD_REQUEST, self.to_string()),
                // Credential failures are deliberately indistinguishable to
                // the client; the distinct cause only goes to logs.
                CoreError::TokenInvalid(_) => {
                    tracing::warn!("rejected request with invalid session token");
                    (StatusCode::UNAUTHORIZED, "unauthorized".to_string())
                }
                CoreError::TokenExpired => {
                    tracing::warn!("rejected request with expired session token");
                    (StatusCode::UNAUTHORIZED, "unauthorized".to_string())
                }
                CoreError::NoCredential => {
                    (StatusCode::UNAUTHORIZED, "unauthorized".to_string())
                }
                CoreError::IdentityExchange(_)
                | CoreError::ProvisioningFailed(_)
                | CoreError::Storage(_)
                | CoreError::Provider(_) => {
                    tracing::error!("auth error: {}", self);
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "Internal server error".to_string(),
                    )
                }
            },
            AuthError::Repository(_) => {
                tracing::error!("repository error during auth: {}", self);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
            AuthError::Config(_) => {
                tracing::error!("config error: {}", self);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Server configuration error".to_string(),
                )
            }
            AuthError::UnknownProvider(provider) => (
                StatusCode::NOT_FOUND,
                format!("Unknown authentication provider '{}'", provider),
            ),
            AuthError::ProviderNotConfigured(provider) => (
                StatusCode::NOT_FOUND,
                format!("Authentication provider '{}' is not configured", provider),
            ),
        };

        (status, message).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use questline_core::auth::AuthError as CoreError;

    #[test]
    fn credential_failures_map_to_uniform_unauthorized() {
        for err in [
            AuthError::Core(CoreError::NoCredential),
            AuthError::Core(CoreError::TokenExpired),
            AuthError::Core(CoreError::TokenInvalid("bad signature".to_string())),
        ] {
            let response = err.into_response();
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        }
    }

    #[test]
    fn unknown_provider_maps_to_not_found() {
        let response = AuthError::UnknownProvider("facebook".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn invalid_state_maps_to_bad_request() {
        let response = AuthError::Core(CoreError::InvalidState).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
