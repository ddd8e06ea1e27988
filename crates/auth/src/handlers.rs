//! HTTP handlers for auth routes.

use axum::{
    extract::{Path, Query, State},
    response::{IntoResponse, Redirect, Response},
    routing::get,
    Form, Json, Router,
};
use chrono::Utc;
use openidconnect::PkceCodeChallenge;
use questline_core::account::{HeroProfile, User};
use questline_core::auth::{
    generate_state, validate_return_to, AuthFlowState, OidcProvider,
};
use serde::{Deserialize, Serialize};

use crate::error::AuthError;
use crate::extractors::CurrentUser;
use crate::AuthState;

/// Query parameters for OAuth callback.
#[derive(Deserialize)]
pub struct CallbackQuery {
    pub code: String,
    pub state: String,
}

/// Query parameters for login endpoints.
#[derive(Deserialize, Default)]
pub struct LoginQuery {
    /// Relative URL the client wants to land on after authentication.
    pub return_to: Option<String>,
}

/// Body returned on successful login.
#[derive(Serialize)]
pub struct SessionResponse {
    pub token: String,
    pub user: User,
    pub is_new_account: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub return_to: Option<String>,
}

/// Body returned by `/auth/me`.
#[derive(Serialize)]
pub struct MeResponse {
    pub user: User,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile: Option<HeroProfile>,
}

/// Creates the auth router with all authentication routes.
///
/// Routes:
/// - `GET /auth/{provider}` - Initiate the OIDC flow for a provider
/// - `GET|POST /auth/{provider}/callback` - Handle the OIDC callback
///   (Apple uses `response_mode=form_post`, so its callback is a form POST;
///   Google redirects with query parameters)
/// - `GET /auth/me` - Get the current authenticated user and hero profile
pub fn auth_routes() -> Router<AuthState> {
    Router::new()
        .route("/auth/me", get(me))
        .route("/auth/{provider}", get(login))
        .route(
            "/auth/{provider}/callback",
            get(callback).post(callback_form),
        )
}

fn parse_provider(name: &str) -> Result<OidcProvider, AuthError> {
    name.parse()
        .map_err(|_| AuthError::UnknownProvider(name.to_string()))
}

async fn login(
    State(state): State<AuthState>,
    Path(provider): Path<String>,
    Query(query): Query<LoginQuery>,
) -> Result<Redirect, AuthError> {
    let provider = parse_provider(&provider)?;

    let (pkce_challenge, pkce_verifier) = PkceCodeChallenge::new_random_sha256();
    let csrf_state = generate_state();

    // Validate return_to to prevent open redirect attacks
    let validated_return_to = query
        .return_to
        .as_deref()
        .and_then(validate_return_to)
        .map(String::from);

    // Store PKCE verifier for the callback
    let flow = AuthFlowState {
        pkce_verifier: pkce_verifier.secret().to_string(),
        provider,
        created_at: Utc::now(),
        return_to: validated_return_to,
    };
    state.flows.store_flow(&csrf_state, &flow).await?;

    let provider_client = state.get_provider(provider)?;
    let auth_url = provider_client
        .authorization_url(&csrf_state, pkce_challenge.as_str())
        .await?;

    Ok(Redirect::to(auth_url.as_str()))
}

async fn callback(
    State(state): State<AuthState>,
    Path(provider): Path<String>,
    Query(params): Query<CallbackQuery>,
) -> Result<Response, AuthError> {
    handle_callback(&state, &provider, params).await
}

/// Apple sends its callback as a form POST (`response_mode=form_post`);
/// extra form fields such as Apple's first-login `user` blob are ignored.
async fn callback_form(
    State(state): State<AuthState>,
    Path(provider): Path<String>,
    Form(params): Form<CallbackQuery>,
) -> Result<Response, AuthError> {
    handle_callback(&state, &provider, params).await
}

async fn handle_callback(
    state: &AuthState,
    provider: &str,
    params: CallbackQuery,
) -> Result<Response, AuthError> {
    let provider = parse_provider(provider)?;

    // Single-use flow lookup; a replayed or forged state fails here.
    let flow = state
        .flows
        .take_flow(&params.state)
        .await?
        .ok_or(AuthError::Core(
            questline_core::auth::AuthError::InvalidState,
        ))?;

    if flow.provider != provider {
        return Err(AuthError::Core(
            questline_core::auth::AuthError::InvalidState,
        ));
    }

    let provider_client = state.get_provider(provider)?;

    let session = match state
        .authenticator
        .authenticate(provider_client, &params.code, &flow.pkce_verifier)
        .await
    {
        Ok(session) => session,
        // Exchange and provisioning failures send the user back to the
        // login page rather than surfacing a raw error response.
        Err(
            e @ (questline_core::auth::AuthError::IdentityExchange(_)
            | questline_core::auth::AuthError::ProvisioningFailed(_)),
        ) => {
            tracing::warn!(provider = %provider, error = %e, "login failed");
            return Ok(Redirect::to("/login?error=auth_failed").into_response());
        }
        Err(e) => return Err(e.into()),
    };

    Ok(Json(SessionResponse {
        token: session.token,
        user: session.user,
        is_new_account: session.is_new_account,
        return_to: flow.return_to,
    })
    .into_response())
}

async fn me(
    State(state): State<AuthState>,
    CurrentUser(user_id): CurrentUser,
) -> Result<Json<MeResponse>, AuthError> {
    let user = state
        .accounts
        .get_user(user_id)
        .await?
        .ok_or(questline_core::auth::AuthError::NoCredential)?;

    let profile = state.accounts.get_profile(user_id).await?;

    Ok(Json(MeResponse { user, profile }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use http_body_util::BodyExt;
    use sqlx::sqlite::SqlitePoolOptions;
    use tower::ServiceExt;
    use url::Url;

    use questline_core::account::{AccountRepository, BootstrapOutcome};
    use questline_core::auth::OidcClaims;

    use crate::config::AuthConfig;
    use crate::store::AccountStore;
    use crate::token::TokenConfig;

    async fn state() -> (AuthState, AccountStore) {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        let store = AccountStore::new(pool);
        store.migrate().await.unwrap();

        let config = AuthConfig {
            google: None,
            apple: None,
            token: TokenConfig {
                signing_secret: "handler-test-secret".to_string(),
                ttl: Duration::from_secs(3600),
            },
            base_url: Url::parse("http://localhost:3000").unwrap(),
        };

        let auth_state =
            AuthState::new(Arc::new(store.clone()), Arc::new(store.clone()), config)
                .await
                .unwrap();
        (auth_state, store)
    }

    async fn bootstrap_user(store: &AccountStore) -> questline_core::account::User {
        let outcome = store
            .bootstrap_account(&OidcClaims {
                subject: "abc123".to_string(),
                email: Some("u@example.com".to_string()),
                name: Some("Test User".to_string()),
                picture: None,
                provider: OidcProvider::Google,
            })
            .await
            .unwrap();
        match outcome {
            BootstrapOutcome::Created(user) => user,
            BootstrapOutcome::Conflict => panic!("bootstrap must succeed on empty store"),
        }
    }

    #[tokio::test]
    async fn me_returns_user_and_profile_for_valid_token() {
        let (state, store) = state().await;
        let user = bootstrap_user(&store).await;
        let token = state.tokens.issue(user.id).unwrap();

        let app = auth_routes().with_state(state);
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/auth/me")
                    .header("authorization", format!("Bearer {token}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["user"]["id"], user.id.to_string());
        assert_eq!(json["profile"]["level"], 1);
    }

    #[tokio::test]
    async fn me_rejects_token_for_a_deleted_user() {
        let (state, _store) = state().await;
        // Valid signature, but no such user in storage.
        let token = state.tokens.issue(uuid::Uuid::new_v4()).unwrap();

        let app = auth_routes().with_state(state);
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/auth/me")
                    .header("authorization", format!("Bearer {token}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn callback_accepts_form_posts() {
        let (state, _store) = state().await;

        // Apple posts the callback as a form; the route must not 405.
        // A forged state still fails flow lookup, hence 400.
        let app = auth_routes().with_state(state);
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/auth/apple/callback")
                    .header("content-type", "application/x-www-form-urlencoded")
                    .body(Body::from("code=whatever&state=forged&user=%7B%7D"))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn callback_with_unknown_state_is_bad_request() {
        let (state, _store) = state().await;

        let app = auth_routes().with_state(state);
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/auth/google/callback?code=whatever&state=forged")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
