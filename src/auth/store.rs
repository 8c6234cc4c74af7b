use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use thiserror::Error;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::auth::dto::PublicUser;

/// User record as persisted. `id` and `created_at` are assigned by the
/// store, never by callers.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: OffsetDateTime,
}

impl User {
    /// The record with the password hash stripped, the only shape that
    /// crosses the service boundary or enters a token.
    pub fn public(&self) -> PublicUser {
        PublicUser {
            id: self.id,
            email: self.email.clone(),
            name: self.name.clone(),
            created_at: self.created_at,
        }
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("user with email {0} not found")]
    NotFound(String),
    #[error("user with email {0} already exists")]
    Duplicate(String),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Durable keyed storage of user records. The auth core holds this behind
/// `Arc<dyn UserStore>` so tests can substitute an in-memory store.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;
    async fn create(
        &self,
        email: &str,
        name: &str,
        password_hash: &str,
    ) -> Result<User, StoreError>;
    async fn update_password(&self, email: &str, password_hash: &str)
        -> Result<User, StoreError>;
    async fn delete(&self, email: &str) -> Result<User, StoreError>;
}

/// Postgres-backed store. The unique index on `email` is the authoritative
/// guard against duplicate accounts under concurrent registration.
pub struct PgUserStore {
    db: PgPool,
}

impl PgUserStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, name, password_hash, created_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn create(
        &self,
        email: &str,
        name: &str,
        password_hash: &str,
    ) -> Result<User, StoreError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (email, name, password_hash)
            VALUES ($1, $2, $3)
            RETURNING id, email, name, password_hash, created_at
            "#,
        )
        .bind(email)
        .bind(name)
        .bind(password_hash)
        .fetch_one(&self.db)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(db) = &e {
                if db.is_unique_violation() {
                    return StoreError::Duplicate(email.to_string());
                }
            }
            StoreError::Database(e)
        })?;
        Ok(user)
    }

    async fn update_password(
        &self,
        email: &str,
        password_hash: &str,
    ) -> Result<User, StoreError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET password_hash = $2
            WHERE email = $1
            RETURNING id, email, name, password_hash, created_at
            "#,
        )
        .bind(email)
        .bind(password_hash)
        .fetch_optional(&self.db)
        .await?;
        user.ok_or_else(|| StoreError::NotFound(email.to_string()))
    }

    async fn delete(&self, email: &str) -> Result<User, StoreError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            DELETE FROM users
            WHERE email = $1
            RETURNING id, email, name, password_hash, created_at
            "#,
        )
        .bind(email)
        .fetch_optional(&self.db)
        .await?;
        user.ok_or_else(|| StoreError::NotFound(email.to_string()))
    }
}

#[cfg(test)]
pub use memory::MemoryUserStore;

/// In-process store keyed by email, substituted for Postgres in unit tests.
#[cfg(test)]
mod memory {
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use time::OffsetDateTime;
    use uuid::Uuid;

    use super::{StoreError, User, UserStore};

    #[derive(Default, Clone)]
    pub struct MemoryUserStore {
        users: Arc<Mutex<HashMap<String, User>>>,
    }

    impl MemoryUserStore {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn len(&self) -> usize {
            self.users.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl UserStore for MemoryUserStore {
        async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
            Ok(self.users.lock().unwrap().get(email).cloned())
        }

        async fn create(
            &self,
            email: &str,
            name: &str,
            password_hash: &str,
        ) -> Result<User, StoreError> {
            let mut users = self.users.lock().unwrap();
            if users.contains_key(email) {
                return Err(StoreError::Duplicate(email.to_string()));
            }
            let user = User {
                id: Uuid::new_v4(),
                email: email.to_string(),
                name: name.to_string(),
                password_hash: password_hash.to_string(),
                created_at: OffsetDateTime::now_utc(),
            };
            users.insert(email.to_string(), user.clone());
            Ok(user)
        }

        async fn update_password(
            &self,
            email: &str,
            password_hash: &str,
        ) -> Result<User, StoreError> {
            let mut users = self.users.lock().unwrap();
            let user = users
                .get_mut(email)
                .ok_or_else(|| StoreError::NotFound(email.to_string()))?;
            user.password_hash = password_hash.to_string();
            Ok(user.clone())
        }

        async fn delete(&self, email: &str) -> Result<User, StoreError> {
            self.users
                .lock()
                .unwrap()
                .remove(email)
                .ok_or_else(|| StoreError::NotFound(email.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn create_and_find_roundtrip() {
        let store = MemoryUserStore::new();
        let created = store.create("a@x.com", "A", "hash").await.expect("create");
        let found = store
            .find_by_email("a@x.com")
            .await
            .expect("find")
            .expect("present");
        assert_eq!(found.id, created.id);
        assert_eq!(found.name, "A");
    }

    #[tokio::test]
    async fn duplicate_create_is_rejected() {
        let store = MemoryUserStore::new();
        store.create("a@x.com", "A", "hash").await.expect("create");
        let err = store.create("a@x.com", "B", "hash2").await.unwrap_err();
        assert!(matches!(err, StoreError::Duplicate(_)));
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn delete_missing_is_not_found() {
        let store = MemoryUserStore::new();
        let err = store.delete("ghost@x.com").await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn update_password_replaces_hash() {
        let store = MemoryUserStore::new();
        store.create("a@x.com", "A", "old").await.expect("create");
        let updated = store
            .update_password("a@x.com", "new")
            .await
            .expect("update");
        assert_eq!(updated.password_hash, "new");
    }

    #[test]
    fn password_hash_is_never_serialized() {
        let user = User {
            id: Uuid::new_v4(),
            email: "a@x.com".into(),
            name: "A".into(),
            password_hash: "secret-hash".into(),
            created_at: OffsetDateTime::now_utc(),
        };
        let json = serde_json::to_string(&user).unwrap();
        assert!(!json.contains("secret-hash"));
        assert!(!json.contains("password_hash"));
    }
}
