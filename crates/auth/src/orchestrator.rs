//! Authentication orchestrator.
//!
//! Sequences code exchange, identity resolution, account bootstrap, and
//! token issuance. Collaborators are constructor-injected trait objects;
//! there are no ambient singletons.

use std::sync::Arc;

use questline_core::account::{AccountRepository, BootstrapOutcome, User};
use questline_core::auth::{AuthError, IdentityProviderClient, OidcClaims, Result};

use crate::token::TokenService;

/// Successful authentication result.
#[derive(Debug, Clone)]
pub struct AuthSession {
    /// Signed session token for the user.
    pub token: String,
    pub user: User,
    /// Whether this call bootstrapped a brand-new account.
    pub is_new_account: bool,
}

/// Orchestrates one login: exchange, resolve-or-bootstrap, issue.
#[derive(Clone)]
pub struct Authenticator {
    accounts: Arc<dyn AccountRepository>,
    tokens: TokenService,
}

impl Authenticator {
    pub fn new(accounts: Arc<dyn AccountRepository>, tokens: TokenService) -> Self {
        Self { accounts, tokens }
    }

    /// Exchanges an authorization code for a session.
    ///
    /// The only internally recovered failure is the bootstrap uniqueness
    /// race: on [`BootstrapOutcome::Conflict`] the identity is re-resolved
    /// exactly once (the winning writer has committed by then) and treated
    /// as an existing account. Every other failure propagates immediately;
    /// authorization codes are single use, so no step is ever blindly
    /// retried.
    pub async fn authenticate(
        &self,
        provider: &dyn IdentityProviderClient,
        code: &str,
        pkce_verifier: &str,
    ) -> Result<AuthSession> {
        let identity = provider.exchange_code(code, pkce_verifier).await?;

        let (user, is_new_account) = self.resolve_or_bootstrap(&identity).await?;

        let token = self.tokens.issue(user.id)?;

        tracing::info!(
            user_id = %user.id,
            provider = %identity.provider,
            is_new_account,
            "authenticated"
        );

        Ok(AuthSession {
            token,
            user,
            is_new_account,
        })
    }

    async fn resolve_or_bootstrap(&self, identity: &OidcClaims) -> Result<(User, bool)> {
        let resolved = self
            .accounts
            .resolve_identity(identity.provider, &identity.subject)
            .await
            .map_err(|e| AuthError::Storage(e.to_string()))?;

        if let Some(linked) = resolved {
            return Ok((linked.user, false));
        }

        let outcome = self
            .accounts
            .bootstrap_account(identity)
            .await
            .map_err(|e| AuthError::ProvisioningFailed(e.to_string()))?;

        match outcome {
            BootstrapOutcome::Created(user) => Ok((user, true)),
            BootstrapOutcome::Conflict => {
                tracing::debug!(
                    provider = %identity.provider,
                    "lost bootstrap race, re-resolving"
                );
                let linked = self
                    .accounts
                    .resolve_identity(identity.provider, &identity.subject)
                    .await
                    .map_err(|e| AuthError::Storage(e.to_string()))?
                    .ok_or_else(|| {
                        AuthError::ProvisioningFailed(
                            "identity still unresolved after bootstrap conflict".to_string(),
                        )
                    })?;
                Ok((linked.user, false))
            }
        }
    }
}
