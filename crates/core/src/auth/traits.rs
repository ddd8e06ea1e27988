use async_trait::async_trait;
use url::Url;

use super::{AuthError, AuthFlowState, OidcClaims, OidcProvider};

/// Result type for auth operations.
pub type Result<T> = std::result::Result<T, AuthError>;

/// Abstraction over OIDC identity providers.
///
/// Implementations treat the provider as a black box: one exchange attempt
/// per authorization code, fail fast on any rejection. Codes are single use
/// and expire quickly, so retrying is never correct.
#[async_trait]
pub trait IdentityProviderClient: Send + Sync {
    /// Generate the consent-screen URL for user redirect.
    async fn authorization_url(&self, state: &str, pkce_challenge: &str) -> Result<Url>;

    /// Exchange an authorization code for a verified identity.
    async fn exchange_code(&self, code: &str, pkce_verifier: &str) -> Result<OidcClaims>;

    /// Which provider this client represents.
    fn provider(&self) -> OidcProvider;
}

/// Storage for in-flight authorization flows (PKCE verifier + CSRF state).
#[async_trait]
pub trait FlowRepository: Send + Sync {
    /// Store flow state under its CSRF state parameter.
    async fn store_flow(&self, state: &str, flow: &AuthFlowState) -> Result<()>;

    /// Retrieve and delete flow state in one atomic step, making each state
    /// parameter single use.
    async fn take_flow(&self, state: &str) -> Result<Option<AuthFlowState>>;
}
