use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::OidcProvider;

/// An internal account identity.
///
/// Users are created only by account bootstrap; no other path constructs
/// one. The id is immutable once assigned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Creates a user with a generated UUID and current timestamps.
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            email: None,
            display_name: None,
            avatar_url: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    pub fn with_avatar_url(mut self, url: impl Into<String>) -> Self {
        self.avatar_url = Some(url.into());
        self
    }
}

impl Default for User {
    fn default() -> Self {
        Self::new()
    }
}

/// Association between one external identity and exactly one user.
///
/// The `(provider, subject)` pair is globally unique; that uniqueness
/// constraint is the sole concurrency-correctness anchor for first-login
/// races. A link is never repointed to a different user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkedIdentity {
    pub provider: OidcProvider,
    pub subject: String,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
}

impl LinkedIdentity {
    pub fn new(provider: OidcProvider, subject: impl Into<String>, user_id: Uuid) -> Self {
        Self {
            provider,
            subject: subject.into(),
            user_id,
            created_at: Utc::now(),
        }
    }
}

/// Default gamification profile provisioned alongside a new user.
///
/// Exactly one active profile exists per user at creation time; its later
/// lifecycle belongs to the quest/leveling features, not to auth.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeroProfile {
    pub id: Uuid,
    pub user_id: Uuid,
    pub level: i64,
    pub xp: i64,
    pub streak_days: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl HeroProfile {
    /// A fresh level-1 profile for a newly bootstrapped user.
    pub fn new(user_id: Uuid) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id,
            level: 1,
            xp: 0,
            streak_days: 0,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Resolver result: a linked identity together with its owning user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkedAccount {
    pub link: LinkedIdentity,
    pub user: User,
}

/// Typed result of an account bootstrap attempt.
///
/// `Conflict` reports that a concurrent bootstrap for the same external
/// identity committed first: the caller recovers by re-resolving, it does
/// not treat this as an error.
#[derive(Debug, Clone)]
pub enum BootstrapOutcome {
    Created(User),
    Conflict,
}
