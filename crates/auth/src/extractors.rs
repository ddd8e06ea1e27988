//! Axum extractors for authentication.

use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts, StatusCode},
};
use questline_core::auth::AuthError;
use uuid::Uuid;

use crate::AuthState;

/// Extractor for the authenticated user id. Returns 401 if the request
/// carries no valid bearer token.
///
/// Token verification is purely local (signature + expiry); no storage is
/// touched, so adding this guard to a route costs no I/O.
pub struct CurrentUser(pub Uuid);

impl<S> FromRequestParts<S> for CurrentUser
where
    AuthState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = (StatusCode, &'static str);

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let auth_state = AuthState::from_ref(state);

        let header_value = parts
            .headers
            .get(AUTHORIZATION)
            .ok_or((StatusCode::UNAUTHORIZED, "unauthorized"))?
            .to_str()
            .map_err(|_| (StatusCode::UNAUTHORIZED, "unauthorized"))?;

        let token = header_value
            .strip_prefix("Bearer ")
            .ok_or((StatusCode::UNAUTHORIZED, "unauthorized"))?;

        // The rejection body never distinguishes expired from invalid;
        // only the log does.
        let user_id = auth_state.tokens.verify(token).map_err(|e| {
            match e {
                AuthError::TokenExpired => {
                    tracing::warn!("rejected expired session token");
                }
                _ => {
                    tracing::warn!(error = %e, "rejected invalid session token");
                }
            }
            (StatusCode::UNAUTHORIZED, "unauthorized")
        })?;

        Ok(CurrentUser(user_id))
    }
}
