use std::sync::Arc;

use tracing::{info, warn};

use crate::auth::dto::{AuthResponse, PublicUser};
use crate::auth::password::{hash_password, verify_password};
use crate::auth::store::{StoreError, UserStore};
use crate::auth::token::TokenKeys;
use crate::error::AuthError;

impl From<StoreError> for AuthError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(_) => AuthError::BadRequest(e.to_string()),
            StoreError::Duplicate(_) => AuthError::Conflict("User already exists".to_string()),
            StoreError::Database(_) => AuthError::Internal(e.to_string()),
        }
    }
}

const INVALID_CREDENTIALS: &str = "User/Password not valid";

/// The authentication core. Stateless between calls: every operation
/// re-reads the store, and the only shared pieces are the store handle and
/// the read-only signing keys.
#[derive(Clone)]
pub struct AuthService {
    store: Arc<dyn UserStore>,
    keys: TokenKeys,
}

impl AuthService {
    pub fn new(store: Arc<dyn UserStore>, keys: TokenKeys) -> Self {
        Self { store, keys }
    }

    /// Creates an account and signs it in. The find-by-email pre-check is a
    /// fast path; the store's unique constraint is the authoritative guard,
    /// so a concurrent duplicate still surfaces as `Conflict`.
    pub async fn register(
        &self,
        email: &str,
        name: &str,
        password: &str,
    ) -> Result<AuthResponse, AuthError> {
        if self.store.find_by_email(email).await?.is_some() {
            warn!(email, "registration for existing email");
            return Err(AuthError::Conflict("User already exists".to_string()));
        }

        let hash = hash_password(password).map_err(|e| AuthError::BadRequest(e.to_string()))?;
        let user = self.store.create(email, name, &hash).await?;
        let public = user.public();
        let token = self.keys.issue(&public)?;

        info!(user_id = %public.id, email, "user registered");
        Ok(AuthResponse {
            user: public,
            token,
        })
    }

    /// Verifies credentials and issues a fresh token. An unknown email and a
    /// wrong password fail with the identical message so callers cannot
    /// enumerate accounts.
    pub async fn login(&self, email: &str, password: &str) -> Result<AuthResponse, AuthError> {
        let user = match self.store.find_by_email(email).await? {
            Some(u) => u,
            None => {
                warn!(email, "login for unknown email");
                return Err(AuthError::Unauthorized(INVALID_CREDENTIALS.to_string()));
            }
        };

        if !verify_password(password, &user.password_hash) {
            warn!(email, "login with invalid password");
            return Err(AuthError::Unauthorized(INVALID_CREDENTIALS.to_string()));
        }

        let public = user.public();
        let token = self.keys.issue(&public)?;

        info!(user_id = %public.id, email, "user logged in");
        Ok(AuthResponse {
            user: public,
            token,
        })
    }

    /// Validates a bearer token and reissues it with a fresh expiry. The
    /// store is not consulted: a previously issued token for a deleted or
    /// password-reset account stays valid until it expires.
    pub fn verify_token(&self, token: &str) -> Result<AuthResponse, AuthError> {
        let user = self.keys.verify(token)?;
        let token = self.keys.reissue(&user)?;
        Ok(AuthResponse { user, token })
    }

    /// Removes the account and returns its last public state. No token
    /// invalidation occurs. Deleting an absent email is a `BadRequest`.
    pub async fn delete_user(&self, email: &str) -> Result<PublicUser, AuthError> {
        let user = self.store.delete(email).await?;
        info!(user_id = %user.id, email, "user deleted");
        Ok(user.public())
    }

    /// Looks up an account by email. Secret fields are always excluded from
    /// the returned record.
    pub async fn get_user(&self, email: &str) -> Result<Option<PublicUser>, AuthError> {
        let user = self.store.find_by_email(email).await?;
        Ok(user.map(|u| u.public()))
    }

    /// Replaces the stored password hash. Previously issued tokens are not
    /// invalidated. A missing email is a `BadRequest`.
    pub async fn forgot_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<PublicUser, AuthError> {
        let hash = hash_password(password).map_err(|e| AuthError::BadRequest(e.to_string()))?;
        let user = self.store.update_password(email, &hash).await?;
        info!(user_id = %user.id, email, "password reset");
        Ok(user.public())
    }
}
