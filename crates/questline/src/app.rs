use std::time::Duration;

use axum::{
    http::{header, Method, StatusCode},
    routing::get,
    Router,
};
use questline_auth::{auth_routes, AuthState};
use tower_http::{
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

/// Create the application router with all routes and middleware.
pub fn create_app(state: AuthState) -> Router {
    // Bearer tokens ride in the Authorization header, so CORS must allow it
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    Router::new()
        .merge(auth_routes())
        .route("/healthz", get(healthz))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(10),
        ))
        .with_state(state)
}

async fn healthz() -> &'static str {
    "ok"
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
    use questline_auth::{AccountStore, AuthConfig, TokenConfig};
    use sqlx::sqlite::SqlitePoolOptions;
    use tower::ServiceExt;
    use url::Url;

    async fn test_app() -> Router {
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
                signing_secret: "router-test-secret".to_string(),
                ttl: Duration::from_secs(3600),
            },
            base_url: Url::parse("http://localhost:3000").unwrap(),
        };

        let state = AuthState::new(Arc::new(store.clone()), Arc::new(store), config)
            .await
            .unwrap();

        create_app(state)
    }

    #[tokio::test]
    async fn healthz_responds_ok() {
        let app = test_app().await;

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/healthz")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], b"ok");
    }

    #[tokio::test]
    async fn me_without_credentials_is_unauthorized() {
        let app = test_app().await;

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/auth/me")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn me_with_malformed_authorization_header_is_unauthorized() {
        // Wrong scheme and a bare token both lack the `Bearer ` prefix.
        for header in ["Basic dXNlcjpwYXNz", "some-raw-token"] {
            let app = test_app().await;

            let response = app
                .oneshot(
                    Request::builder()
                        .uri("/auth/me")
                        .header("authorization", header)
                        .body(Body::empty())
                        .unwrap(),
                )
                .await
                .unwrap();

            assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        }
    }

    #[tokio::test]
    async fn me_with_garbage_token_is_unauthorized() {
        let app = test_app().await;

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/auth/me")
                    .header("authorization", "Bearer not.a.token")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn unknown_provider_is_not_found() {
        let app = test_app().await;

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/auth/github")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn unconfigured_provider_is_not_found() {
        let app = test_app().await;

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/auth/google")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
