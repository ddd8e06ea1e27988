//! SQLite-backed account storage.
//!
//! Implements `AccountRepository` (resolution + atomic bootstrap) and
//! `FlowRepository` (single-use authorization flows) over one sqlx pool.
//!
//! The UNIQUE constraint on `linked_identities(provider, subject)` is the
//! system's only concurrency-correctness mechanism for first-login races:
//! whichever bootstrap commits first wins, the loser's insert fails with a
//! uniqueness violation and is reported as `BootstrapOutcome::Conflict`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;

use questline_core::account::{
    AccountRepository, BootstrapOutcome, HeroProfile, LinkedAccount, LinkedIdentity,
    RepositoryError, User,
};
use questline_core::auth::{AuthError, AuthFlowState, FlowRepository, OidcClaims, OidcProvider};

/// SQLite-backed account and flow store.
#[derive(Clone)]
pub struct AccountStore {
    pool: SqlitePool,
}

impl AccountStore {
    /// Creates a new store over an existing pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Runs database migrations to create required tables.
    pub async fn migrate(&self) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id TEXT PRIMARY KEY,
                email TEXT,
                display_name TEXT,
                avatar_url TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS linked_identities (
                provider TEXT NOT NULL,
                subject TEXT NOT NULL,
                user_id TEXT NOT NULL,
                created_at TEXT NOT NULL,
                PRIMARY KEY (provider, subject),
                FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
            );
            CREATE INDEX IF NOT EXISTS idx_linked_identities_user_id
                ON linked_identities(user_id);

            CREATE TABLE IF NOT EXISTS hero_profiles (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                level INTEGER NOT NULL,
                xp INTEGER NOT NULL,
                streak_days INTEGER NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
            );
            CREATE INDEX IF NOT EXISTS idx_hero_profiles_user_id
                ON hero_profiles(user_id);

            CREATE TABLE IF NOT EXISTS auth_flows (
                state TEXT PRIMARY KEY,
                pkce_verifier TEXT NOT NULL,
                provider TEXT NOT NULL,
                created_at TEXT NOT NULL,
                return_to TEXT
            );
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| RepositoryError::QueryFailed(e.to_string()))?;

        Ok(())
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(
        err,
        sqlx::Error::Database(db) if db.kind() == sqlx::error::ErrorKind::UniqueViolation
    )
}

fn query_err(e: sqlx::Error) -> RepositoryError {
    RepositoryError::QueryFailed(e.to_string())
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| RepositoryError::InvalidData(e.to_string()))
}

fn parse_user_row(
    row: (
        String,
        Option<String>,
        Option<String>,
        Option<String>,
        String,
        String,
    ),
) -> Result<User, RepositoryError> {
    let (id, email, display_name, avatar_url, created_at, updated_at) = row;
    Ok(User {
        id: id
            .parse()
            .map_err(|_| RepositoryError::InvalidData(format!("user id is not a UUID: {id}")))?,
        email,
        display_name,
        avatar_url,
        created_at: parse_timestamp(&created_at)?,
        updated_at: parse_timestamp(&updated_at)?,
    })
}

#[async_trait]
impl AccountRepository for AccountStore {
    async fn resolve_identity(
        &self,
        provider: OidcProvider,
        subject: &str,
    ) -> Result<Option<LinkedAccount>, RepositoryError> {
        type Row = (
            String,
            Option<String>,
            Option<String>,
            Option<String>,
            String,
            String,
            String,
        );

        let row = sqlx::query_as::<_, Row>(
            r#"
            SELECT u.id, u.email, u.display_name, u.avatar_url,
                   u.created_at, u.updated_at, l.created_at
            FROM linked_identities l
            INNER JOIN users u ON u.id = l.user_id
            WHERE l.provider = ? AND l.subject = ?
            "#,
        )
        .bind(provider.to_string())
        .bind(subject)
        .fetch_optional(&self.pool)
        .await
        .map_err(query_err)?;

        match row {
            Some((id, email, display_name, avatar_url, created_at, updated_at, linked_at)) => {
                let user = parse_user_row((
                    id, email, display_name, avatar_url, created_at, updated_at,
                ))?;
                let link = LinkedIdentity {
                    provider,
                    subject: subject.to_string(),
                    user_id: user.id,
                    created_at: parse_timestamp(&linked_at)?,
                };
                Ok(Some(LinkedAccount { link, user }))
            }
            None => Ok(None),
        }
    }

    async fn bootstrap_account(
        &self,
        identity: &OidcClaims,
    ) -> Result<BootstrapOutcome, RepositoryError> {
        let mut user = User::new();
        if let Some(email) = &identity.email {
            user = user.with_email(email.clone());
        }
        if let Some(name) = &identity.name {
            user = user.with_display_name(name.clone());
        } else if let Some(email) = &identity.email {
            user = user
                .with_display_name(questline_core::auth::display_name_from_email(email));
        }
        if let Some(picture) = &identity.picture {
            user = user.with_avatar_url(picture.clone());
        }

        let link = LinkedIdentity::new(identity.provider, identity.subject.clone(), user.id);
        let profile = HeroProfile::new(user.id);

        // Three inserts, one transaction, no external calls in between.
        let mut tx = self.pool.begin().await.map_err(query_err)?;

        sqlx::query(
            r#"
            INSERT INTO users (id, email, display_name, avatar_url, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(user.id.to_string())
        .bind(&user.email)
        .bind(&user.display_name)
        .bind(&user.avatar_url)
        .bind(user.created_at.to_rfc3339())
        .bind(user.updated_at.to_rfc3339())
        .execute(&mut *tx)
        .await
        .map_err(query_err)?;

        let inserted = sqlx::query(
            r#"
            INSERT INTO linked_identities (provider, subject, user_id, created_at)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(link.provider.to_string())
        .bind(&link.subject)
        .bind(link.user_id.to_string())
        .bind(link.created_at.to_rfc3339())
        .execute(&mut *tx)
        .await;

        if let Err(e) = inserted {
            if is_unique_violation(&e) {
                // A concurrent bootstrap committed this identity first.
                tx.rollback().await.map_err(query_err)?;
                return Ok(BootstrapOutcome::Conflict);
            }
            return Err(query_err(e));
        }

        sqlx::query(
            r#"
            INSERT INTO hero_profiles (id, user_id, level, xp, streak_days, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(profile.id.to_string())
        .bind(profile.user_id.to_string())
        .bind(profile.level)
        .bind(profile.xp)
        .bind(profile.streak_days)
        .bind(profile.created_at.to_rfc3339())
        .bind(profile.updated_at.to_rfc3339())
        .execute(&mut *tx)
        .await
        .map_err(query_err)?;

        tx.commit().await.map_err(query_err)?;

        Ok(BootstrapOutcome::Created(user))
    }

    async fn get_user(&self, id: Uuid) -> Result<Option<User>, RepositoryError> {
        type Row = (
            String,
            Option<String>,
            Option<String>,
            Option<String>,
            String,
            String,
        );

        let row = sqlx::query_as::<_, Row>(
            r#"
            SELECT id, email, display_name, avatar_url, created_at, updated_at
            FROM users
            WHERE id = ?
            "#,
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(query_err)?;

        row.map(parse_user_row).transpose()
    }

    async fn get_profile(&self, user_id: Uuid) -> Result<Option<HeroProfile>, RepositoryError> {
        type Row = (String, String, i64, i64, i64, String, String);

        let row = sqlx::query_as::<_, Row>(
            r#"
            SELECT id, user_id, level, xp, streak_days, created_at, updated_at
            FROM hero_profiles
            WHERE user_id = ?
            "#,
        )
        .bind(user_id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(query_err)?;

        match row {
            Some((id, owner, level, xp, streak_days, created_at, updated_at)) => {
                Ok(Some(HeroProfile {
                    id: id.parse().map_err(|_| {
                        RepositoryError::InvalidData(format!("profile id is not a UUID: {id}"))
                    })?,
                    user_id: owner.parse().map_err(|_| {
                        RepositoryError::InvalidData(format!("user id is not a UUID: {owner}"))
                    })?,
                    level,
                    xp,
                    streak_days,
                    created_at: parse_timestamp(&created_at)?,
                    updated_at: parse_timestamp(&updated_at)?,
                }))
            }
            None => Ok(None),
        }
    }
}

#[async_trait]
impl FlowRepository for AccountStore {
    async fn store_flow(&self, state: &str, flow: &AuthFlowState) -> Result<(), AuthError> {
        sqlx::query(
            r#"
            INSERT OR REPLACE INTO auth_flows (state, pkce_verifier, provider, created_at, return_to)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(state)
        .bind(&flow.pkce_verifier)
        .bind(flow.provider.to_string())
        .bind(flow.created_at.to_rfc3339())
        .bind(&flow.return_to)
        .execute(&self.pool)
        .await
        .map_err(|e| AuthError::Storage(e.to_string()))?;

        Ok(())
    }

    async fn take_flow(&self, state: &str) -> Result<Option<AuthFlowState>, AuthError> {
        // SELECT and DELETE in one transaction so each state is single use.
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| AuthError::Storage(e.to_string()))?;

        let row = sqlx::query_as::<_, (String, String, String, Option<String>)>(
            r#"
            SELECT pkce_verifier, provider, created_at, return_to
            FROM auth_flows
            WHERE state = ?
            "#,
        )
        .bind(state)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| AuthError::Storage(e.to_string()))?;

        if row.is_some() {
            sqlx::query("DELETE FROM auth_flows WHERE state = ?")
                .bind(state)
                .execute(&mut *tx)
                .await
                .map_err(|e| AuthError::Storage(e.to_string()))?;
        }

        tx.commit()
            .await
            .map_err(|e| AuthError::Storage(e.to_string()))?;

        match row {
            Some((pkce_verifier, provider, created_at, return_to)) => {
                let provider: OidcProvider = provider
                    .parse()
                    .map_err(|_| AuthError::Storage(format!("unknown provider: {provider}")))?;

                Ok(Some(AuthFlowState {
                    pkce_verifier,
                    provider,
                    created_at: DateTime::parse_from_rfc3339(&created_at)
                        .map_err(|e| AuthError::Storage(e.to_string()))?
                        .with_timezone(&Utc),
                    return_to,
                }))
            }
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn store() -> AccountStore {
        // A single connection keeps every query on the same in-memory
        // database.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        let store = AccountStore::new(pool);
        store.migrate().await.unwrap();
        store
    }

    fn identity(subject: &str) -> OidcClaims {
        OidcClaims {
            subject: subject.to_string(),
            email: Some("u@example.com".to_string()),
            name: Some("Test User".to_string()),
            picture: Some("https://cdn.example.com/u.png".to_string()),
            provider: OidcProvider::Google,
        }
    }

    async fn user_count(store: &AccountStore) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&store.pool)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn bootstrap_creates_user_link_and_profile() {
        let store = store().await;

        let outcome = store.bootstrap_account(&identity("abc123")).await.unwrap();
        let user = match outcome {
            BootstrapOutcome::Created(user) => user,
            BootstrapOutcome::Conflict => panic!("first bootstrap must not conflict"),
        };

        assert_eq!(user.email.as_deref(), Some("u@example.com"));
        assert_eq!(user.display_name.as_deref(), Some("Test User"));

        let linked = store
            .resolve_identity(OidcProvider::Google, "abc123")
            .await
            .unwrap()
            .expect("identity must resolve after bootstrap");
        assert_eq!(linked.user.id, user.id);
        assert_eq!(linked.link.user_id, user.id);

        let profile = store
            .get_profile(user.id)
            .await
            .unwrap()
            .expect("profile must exist after bootstrap");
        assert_eq!(profile.level, 1);
        assert_eq!(profile.xp, 0);
    }

    #[tokio::test]
    async fn display_name_falls_back_to_email_local_part() {
        let store = store().await;
        let mut id = identity("no-name");
        id.name = None;

        let outcome = store.bootstrap_account(&id).await.unwrap();
        let BootstrapOutcome::Created(user) = outcome else {
            panic!("expected Created");
        };
        assert_eq!(user.display_name.as_deref(), Some("u"));
    }

    #[tokio::test]
    async fn duplicate_bootstrap_reports_conflict_and_keeps_one_user() {
        let store = store().await;

        let first = store.bootstrap_account(&identity("abc123")).await.unwrap();
        assert!(matches!(first, BootstrapOutcome::Created(_)));

        let second = store.bootstrap_account(&identity("abc123")).await.unwrap();
        assert!(matches!(second, BootstrapOutcome::Conflict));

        assert_eq!(user_count(&store).await, 1);
    }

    #[tokio::test]
    async fn concurrent_bootstraps_leave_exactly_one_account() {
        let store = std::sync::Arc::new(store().await);

        let attempts = (0..8).map(|_| {
            let store = store.clone();
            async move { store.bootstrap_account(&identity("abc123")).await.unwrap() }
        });
        let outcomes = futures_util::future::join_all(attempts).await;

        let created = outcomes
            .iter()
            .filter(|o| matches!(o, BootstrapOutcome::Created(_)))
            .count();
        assert_eq!(created, 1);
        assert_eq!(user_count(&store).await, 1);
    }

    #[tokio::test]
    async fn resolve_unknown_identity_returns_none() {
        let store = store().await;
        let resolved = store
            .resolve_identity(OidcProvider::Google, "nobody")
            .await
            .unwrap();
        assert!(resolved.is_none());
    }

    #[tokio::test]
    async fn links_are_scoped_by_provider_not_just_subject() {
        let store = store().await;
        store.bootstrap_account(&identity("abc123")).await.unwrap();

        let other_provider = store
            .resolve_identity(OidcProvider::Apple, "abc123")
            .await
            .unwrap();
        assert!(other_provider.is_none());
    }

    #[tokio::test]
    async fn take_flow_is_single_use() {
        let store = store().await;
        let flow = AuthFlowState {
            pkce_verifier: "verifier".to_string(),
            provider: OidcProvider::Google,
            created_at: Utc::now(),
            return_to: Some("/quests".to_string()),
        };

        store.store_flow("state-1", &flow).await.unwrap();

        let taken = store.take_flow("state-1").await.unwrap().unwrap();
        assert_eq!(taken.pkce_verifier, "verifier");
        assert_eq!(taken.return_to.as_deref(), Some("/quests"));

        assert!(store.take_flow("state-1").await.unwrap().is_none());
    }
}
