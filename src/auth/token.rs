use std::time::Duration;

use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use time::{Duration as TimeDuration, OffsetDateTime};
use tracing::debug;

use crate::auth::dto::PublicUser;
use crate::config::JwtConfig;
use crate::error::AuthError;

/// Signed token payload: the user's public fields plus temporal claims.
/// `iat` and `exp` are generated here, never supplied by callers.
#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    #[serde(flatten)]
    user: PublicUser,
    iat: usize,
    exp: usize,
}

/// Holds the process-wide HS256 signing secret and token lifetime.
/// Read-only after construction; safe to share across request tasks.
#[derive(Clone)]
pub struct TokenKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl TokenKeys {
    pub fn new(config: &JwtConfig) -> Self {
        Self {
            encoding: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding: DecodingKey::from_secret(config.secret.as_bytes()),
            ttl: Duration::from_secs((config.ttl_minutes as u64) * 60),
        }
    }

    /// Signs a bearer token over the user's public fields with a fresh
    /// issued-at and expiry.
    pub fn issue(&self, user: &PublicUser) -> Result<String, AuthError> {
        let now = OffsetDateTime::now_utc();
        let exp = now + TimeDuration::seconds(self.ttl.as_secs() as i64);
        let claims = Claims {
            user: user.clone(),
            iat: now.unix_timestamp() as usize,
            exp: exp.unix_timestamp() as usize,
        };
        let token = encode(&Header::default(), &claims, &self.encoding)
            .map_err(|e| AuthError::Internal(e.to_string()))?;
        debug!(email = %user.email, "token issued");
        Ok(token)
    }

    /// Checks signature and expiry, then returns the embedded identity
    /// claims with the temporal fields stripped. Does not consult any
    /// store: a bearer token is self-contained proof until it expires.
    pub fn verify(&self, token: &str) -> Result<PublicUser, AuthError> {
        let validation = Validation::default();
        let data = decode::<Claims>(token, &self.decoding, &validation)
            .map_err(|_| AuthError::Unauthorized("Invalid token".to_string()))?;
        debug!(email = %data.claims.user.email, "token verified");
        Ok(data.claims.user)
    }

    /// Signs a fresh token over the same identity claims; used after a
    /// successful verification to slide the expiry forward.
    pub fn reissue(&self, user: &PublicUser) -> Result<String, AuthError> {
        self.issue(user)
    }
}
