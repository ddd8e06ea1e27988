use async_trait::async_trait;
use uuid::Uuid;

use crate::auth::{OidcClaims, OidcProvider};

use super::{BootstrapOutcome, HeroProfile, LinkedAccount, Result, User};

/// Repository for account resolution and bootstrap.
#[async_trait]
pub trait AccountRepository: Send + Sync {
    /// Looks up whether an external identity is already linked to a user.
    ///
    /// Pure read over the unique `(provider, subject)` pair. Lookups never
    /// go through email, which may be absent or ambiguous across providers.
    async fn resolve_identity(
        &self,
        provider: OidcProvider,
        subject: &str,
    ) -> Result<Option<LinkedAccount>>;

    /// Atomically creates a user, its identity link, and its default hero
    /// profile. All three inserts commit together or roll back together;
    /// no partial account is ever observable.
    ///
    /// A uniqueness violation on `(provider, subject)` means a concurrent
    /// bootstrap won the race and is reported as
    /// [`BootstrapOutcome::Conflict`], not as an error.
    async fn bootstrap_account(&self, identity: &OidcClaims) -> Result<BootstrapOutcome>;

    /// Gets a user by id.
    async fn get_user(&self, id: Uuid) -> Result<Option<User>>;

    /// Gets the hero profile owned by a user.
    async fn get_profile(&self, user_id: Uuid) -> Result<Option<HeroProfile>>;
}
