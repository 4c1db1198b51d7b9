use std::future::Future;
use std::time::Duration;

use axum::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

/// User record in the database.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub created_at: OffsetDateTime,
    pub last_login: Option<OffsetDateTime>,
}

/// Fields the caller supplies on creation; id and created_at are assigned
/// by the store.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("email already registered")]
    DuplicateEmail,
    #[error("user not found")]
    NotFound,
    #[error("storage unavailable")]
    Unavailable,
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

/// Persistence seam for user records. Email uniqueness is the store's job
/// and must hold under concurrent creates, not a check-then-insert in the
/// caller.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Unknown ids are Ok(None), not an error.
    async fn get_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError>;
    /// Expects an already-lowercased email; lookups are case-insensitive
    /// because every write normalizes first.
    async fn get_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;
    async fn create(&self, new: NewUser) -> Result<User, StoreError>;
    /// Best-effort stamp; unknown id is NotFound and touches nothing else.
    async fn update_last_login(&self, id: Uuid) -> Result<(), StoreError>;
}

/// Postgres-backed store. The unique index on users.email makes duplicate
/// detection atomic; every round-trip runs under a bounded timeout so a
/// stuck database surfaces as Unavailable instead of a hung request.
pub struct PgUserStore {
    pool: PgPool,
    timeout: Duration,
}

impl PgUserStore {
    pub fn new(pool: PgPool, timeout: Duration) -> Self {
        Self { pool, timeout }
    }

    async fn bounded<T>(
        &self,
        fut: impl Future<Output = Result<T, sqlx::Error>>,
    ) -> Result<T, StoreError> {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(res) => res.map_err(StoreError::from),
            Err(_) => Err(StoreError::Unavailable),
        }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn get_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        let query = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, password_hash, first_name, last_name, created_at, last_login
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool);
        self.bounded(query).await
    }

    async fn get_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let query = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, password_hash, first_name, last_name, created_at, last_login
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool);
        self.bounded(query).await
    }

    async fn create(&self, new: NewUser) -> Result<User, StoreError> {
        let query = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (email, password_hash, first_name, last_name)
            VALUES ($1, $2, $3, $4)
            RETURNING id, email, password_hash, first_name, last_name, created_at, last_login
            "#,
        )
        .bind(&new.email)
        .bind(&new.password_hash)
        .bind(&new.first_name)
        .bind(&new.last_name)
        .fetch_one(&self.pool);

        match tokio::time::timeout(self.timeout, query).await {
            Err(_) => Err(StoreError::Unavailable),
            Ok(Err(sqlx::Error::Database(db))) if db.is_unique_violation() => {
                Err(StoreError::DuplicateEmail)
            }
            Ok(Err(e)) => Err(e.into()),
            Ok(Ok(user)) => Ok(user),
        }
    }

    async fn update_last_login(&self, id: Uuid) -> Result<(), StoreError> {
        let query = sqlx::query("UPDATE users SET last_login = now() WHERE id = $1")
            .bind(id)
            .execute(&self.pool);
        let result = self.bounded(query).await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }
}

/// In-memory store used by the test suites. Uniqueness is enforced under
/// one lock, which gives the same one-winner guarantee the unique index
/// provides in Postgres.
#[cfg(test)]
pub struct MemoryStore {
    users: std::sync::Mutex<Vec<User>>,
}

#[cfg(test)]
impl MemoryStore {
    pub fn new() -> Self {
        Self {
            users: std::sync::Mutex::new(Vec::new()),
        }
    }
}

#[cfg(test)]
#[async_trait]
impl UserStore for MemoryStore {
    async fn get_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        let users = self.users.lock().unwrap();
        Ok(users.iter().find(|u| u.id == id).cloned())
    }

    async fn get_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let users = self.users.lock().unwrap();
        Ok(users.iter().find(|u| u.email == email).cloned())
    }

    async fn create(&self, new: NewUser) -> Result<User, StoreError> {
        let mut users = self.users.lock().unwrap();
        if users.iter().any(|u| u.email == new.email) {
            return Err(StoreError::DuplicateEmail);
        }
        let user = User {
            id: Uuid::new_v4(),
            email: new.email,
            password_hash: new.password_hash,
            first_name: new.first_name,
            last_name: new.last_name,
            created_at: OffsetDateTime::now_utc(),
            last_login: None,
        };
        users.push(user.clone());
        Ok(user)
    }

    async fn update_last_login(&self, id: Uuid) -> Result<(), StoreError> {
        let mut users = self.users.lock().unwrap();
        match users.iter_mut().find(|u| u.id == id) {
            Some(user) => {
                user.last_login = Some(OffsetDateTime::now_utc());
                Ok(())
            }
            None => Err(StoreError::NotFound),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn new_user(email: &str) -> NewUser {
        NewUser {
            email: email.into(),
            password_hash: "$argon2id$fake".into(),
            first_name: "A".into(),
            last_name: "B".into(),
        }
    }

    #[tokio::test]
    async fn create_assigns_id_and_created_at() {
        let store = MemoryStore::new();
        let user = store.create(new_user("a@b.com")).await.expect("create");
        assert_eq!(user.email, "a@b.com");
        assert!(user.last_login.is_none());

        let found = store.get_by_id(user.id).await.expect("get").expect("some");
        assert_eq!(found.created_at, user.created_at);
    }

    #[tokio::test]
    async fn duplicate_email_is_rejected() {
        let store = MemoryStore::new();
        store.create(new_user("a@b.com")).await.expect("first create");
        let err = store.create(new_user("a@b.com")).await.unwrap_err();
        assert!(matches!(err, StoreError::DuplicateEmail));
    }

    #[tokio::test]
    async fn concurrent_duplicate_creates_have_exactly_one_winner() {
        let store = Arc::new(MemoryStore::new());
        let a = tokio::spawn({
            let store = store.clone();
            async move { store.create(new_user("race@b.com")).await }
        });
        let b = tokio::spawn({
            let store = store.clone();
            async move { store.create(new_user("race@b.com")).await }
        });
        let results = [a.await.unwrap(), b.await.unwrap()];
        let wins = results.iter().filter(|r| r.is_ok()).count();
        let duplicates = results
            .iter()
            .filter(|r| matches!(r, Err(StoreError::DuplicateEmail)))
            .count();
        assert_eq!(wins, 1);
        assert_eq!(duplicates, 1);
    }

    #[tokio::test]
    async fn unknown_id_is_none_not_an_error() {
        let store = MemoryStore::new();
        assert!(store.get_by_id(Uuid::new_v4()).await.expect("get").is_none());
        assert!(store.get_by_email("nobody@b.com").await.expect("get").is_none());
    }

    #[tokio::test]
    async fn update_last_login_touches_only_that_field() {
        let store = MemoryStore::new();
        let user = store.create(new_user("a@b.com")).await.expect("create");

        store.update_last_login(user.id).await.expect("update");

        let found = store.get_by_id(user.id).await.expect("get").expect("some");
        assert!(found.last_login.is_some());
        assert_eq!(found.email, user.email);
        assert_eq!(found.password_hash, user.password_hash);
        assert_eq!(found.created_at, user.created_at);
    }

    #[tokio::test]
    async fn update_last_login_on_unknown_id_is_not_found() {
        let store = MemoryStore::new();
        let err = store.update_last_login(Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound));
    }
}
