//! Identity federation and session issuance for questline.
//!
//! This crate provides:
//! - OIDC code exchange against Google and Apple
//! - A stateless, signed session token service (issue + verify)
//! - The SQLite account store with atomic first-login bootstrap
//! - The authentication orchestrator tying the pieces together
//! - Axum routes and a fail-closed bearer-token extractor

mod config;
mod error;
mod extractors;
mod handlers;
mod orchestrator;
mod providers;
mod state;
mod store;
mod token;

pub use config::{AppleConfig, AuthConfig, ConfigError, ProviderConfig};
pub use error::AuthError;
pub use extractors::CurrentUser;
pub use handlers::auth_routes;
pub use orchestrator::{AuthSession, Authenticator};
#[cfg(feature = "mock")]
pub use providers::MockProvider;
pub use providers::{AppleProvider, GoogleProvider};
pub use state::AuthState;
pub use store::AccountStore;
pub use token::{TokenConfig, TokenService};
