//! Session lifecycle service
//!
//! One session per user, moving between three states: no session, an active
//! cached token, and a cached token that has aged out. Tokens are
//! self-describing (expiry is checked by decoding `iat`, no cache round
//! trip), but validity is cache-backed: a structurally valid token presented
//! after logout is invalid. That split keeps expiry checks cheap while still
//! giving O(1) revocation.

use std::future::Future;

use anyhow::Result;
use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use crate::{
    error::AuthError,
    models::UserProfile,
    session_cache::SessionTokenCache,
    token::{SessionClaims, TokenCodec},
};

/// Contract the session service requires from the user store
pub trait UserLookup {
    /// Resolve a user's identity and current account association.
    /// Lookup failure surfaces as `AuthError::UserNotFound`.
    fn get_by_id(&self, user_id: Uuid) -> impl Future<Output = Result<UserProfile, AuthError>> + Send;
}

/// Session configuration
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Shared secret used to sign session tokens
    pub secret: String,
    /// Session lifetime in seconds; also the cache TTL
    pub ttl_seconds: u64,
}

impl SessionConfig {
    /// Create a new SessionConfig from environment variables
    ///
    /// # Environment Variables
    /// - `SESSION_TOKEN_SECRET`: token signing secret (required)
    /// - `SESSION_TTL_SECONDS`: session lifetime in seconds (default: 10800 = 3 hours)
    pub fn from_env() -> Result<Self> {
        let secret = std::env::var("SESSION_TOKEN_SECRET")
            .map_err(|_| anyhow::anyhow!("SESSION_TOKEN_SECRET environment variable not set"))?;

        let ttl_seconds = std::env::var("SESSION_TTL_SECONDS")
            .unwrap_or_else(|_| "10800".to_string())
            .parse()
            .unwrap_or(10800);

        Ok(SessionConfig {
            secret,
            ttl_seconds,
        })
    }
}

/// Session service
#[derive(Clone)]
pub struct SessionService<L, C> {
    users: L,
    cache: C,
    codec: TokenCodec,
    ttl_seconds: u64,
}

impl<L: UserLookup, C: SessionTokenCache> SessionService<L, C> {
    /// Create a new session service
    pub fn new(config: &SessionConfig, users: L, cache: C) -> Self {
        Self {
            users,
            cache,
            codec: TokenCodec::new(&config.secret),
            ttl_seconds: config.ttl_seconds,
        }
    }

    /// Issue a session token for a user, reusing the cached one while it
    /// lives
    ///
    /// A still-fresh cached token is returned unchanged; no renewal is
    /// performed until it ages out. An aged-out cache entry is deleted
    /// before a fresh token is issued. With `allow_pending` false, a user
    /// without an account fails with `PendingAccount`.
    pub async fn create_session(
        &self,
        user_id: Uuid,
        allow_pending: bool,
    ) -> Result<String, AuthError> {
        if let Some(existing) = self.cache.get(user_id).await? {
            if !self.is_expired_token(&existing)? {
                return Ok(existing);
            }
            self.clear_session(user_id).await?;
        }

        let user = self.users.get_by_id(user_id).await?;

        if !allow_pending && user.account.is_none() {
            return Err(AuthError::PendingAccount(user_id));
        }

        let claims = SessionClaims {
            sub: user.id,
            email: user.email,
            name: user.name,
            created_at: user.created_at,
            iat: Utc::now().timestamp_millis(),
        };
        let token = self.codec.sign(&claims)?;
        self.cache.set(user_id, &token, self.ttl_seconds).await?;

        info!("Created session for user: {}", user_id);
        Ok(token)
    }

    /// Decode-only expiry check; never touches the cache
    pub fn is_expired_token(&self, token: &str) -> Result<bool, AuthError> {
        let claims = self.parse_session(token)?;
        Ok(self.is_expired_session(&claims))
    }

    /// Expiry check on already-decoded claims
    pub fn is_expired_session(&self, claims: &SessionClaims) -> bool {
        Utc::now().timestamp_millis() - claims.iat >= self.ttl_ms()
    }

    /// Decode a token into its claims, propagating decode failure
    pub fn parse_session(&self, token: &str) -> Result<SessionClaims, AuthError> {
        self.codec.verify(token)
    }

    /// Cache-backed validity: the token must decode and its user must still
    /// have a live cache entry
    pub async fn is_valid_token(&self, token: &str) -> Result<bool, AuthError> {
        let claims = self.parse_session(token)?;
        Ok(self.cache.exists(claims.sub).await?)
    }

    /// Revoke a user's session; clearing a non-existent session is not an
    /// error
    pub async fn clear_session(&self, user_id: Uuid) -> Result<(), AuthError> {
        self.cache.delete(user_id).await?;
        info!("Cleared session for user: {}", user_id);
        Ok(())
    }

    fn ttl_ms(&self) -> i64 {
        i64::try_from(self.ttl_seconds)
            .unwrap_or(i64::MAX)
            .saturating_mul(1000)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FailingSessionCache, MemorySessionCache, StaticUserLookup};
    use chrono::Duration;

    fn service(
        lookup: StaticUserLookup,
    ) -> (
        SessionService<StaticUserLookup, MemorySessionCache>,
        MemorySessionCache,
    ) {
        let cache = MemorySessionCache::default();
        let config = SessionConfig {
            secret: "test-secret".to_string(),
            ttl_seconds: 10800,
        };
        let service = SessionService::new(&config, lookup, cache.clone());
        (service, cache)
    }

    #[tokio::test]
    async fn test_create_session_is_idempotent_within_lifetime() {
        let lookup = StaticUserLookup::with_account();
        let user_id = lookup.profile.id;
        let (service, _cache) = service(lookup);

        let first = service.create_session(user_id, false).await.unwrap();
        let second = service.create_session(user_id, false).await.unwrap();

        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_create_session_replaces_expired_cached_token() {
        let lookup = StaticUserLookup::with_account();
        let user_id = lookup.profile.id;
        let profile = lookup.profile.clone();
        let (service, cache) = service(lookup);

        // Seed the cache with a token issued well past the lifetime.
        let stale_claims = SessionClaims {
            sub: profile.id,
            email: profile.email.clone(),
            name: profile.name.clone(),
            created_at: profile.created_at,
            iat: (Utc::now() - Duration::hours(4)).timestamp_millis(),
        };
        let stale = TokenCodec::new("test-secret").sign(&stale_claims).unwrap();
        cache.set(user_id, &stale, 10800).await.unwrap();

        let fresh = service.create_session(user_id, false).await.unwrap();

        assert_ne!(fresh, stale);
        assert_eq!(cache.get(user_id).await.unwrap(), Some(fresh.clone()));
        assert!(!service.is_expired_token(&fresh).unwrap());
    }

    #[tokio::test]
    async fn test_is_expired_token_ignores_cache_state() {
        let lookup = StaticUserLookup::with_account();
        let profile = lookup.profile.clone();
        let (service, _cache) = service(lookup);

        let old_claims = SessionClaims {
            sub: profile.id,
            email: profile.email,
            name: profile.name,
            created_at: profile.created_at,
            iat: (Utc::now() - Duration::hours(4)).timestamp_millis(),
        };
        let token = TokenCodec::new("test-secret").sign(&old_claims).unwrap();

        // Nothing was ever cached for this user; expiry is decode-only.
        assert!(service.is_expired_token(&token).unwrap());
    }

    #[tokio::test]
    async fn test_clear_session_revokes_structurally_valid_token() {
        let lookup = StaticUserLookup::with_account();
        let user_id = lookup.profile.id;
        let (service, _cache) = service(lookup);

        let token = service.create_session(user_id, false).await.unwrap();
        assert!(service.is_valid_token(&token).await.unwrap());

        service.clear_session(user_id).await.unwrap();

        assert!(!service.is_valid_token(&token).await.unwrap());
        // The token itself has not aged out; revocation is cache-backed.
        assert!(!service.is_expired_token(&token).unwrap());
    }

    #[tokio::test]
    async fn test_clear_session_is_idempotent() {
        let lookup = StaticUserLookup::with_account();
        let user_id = lookup.profile.id;
        let (service, _cache) = service(lookup);

        service.clear_session(user_id).await.unwrap();
        service.clear_session(user_id).await.unwrap();
    }

    #[tokio::test]
    async fn test_pending_account_gating() {
        let lookup = StaticUserLookup::without_account();
        let user_id = lookup.profile.id;
        let (service, _cache) = service(lookup);

        let denied = service.create_session(user_id, false).await;
        assert!(matches!(denied, Err(AuthError::PendingAccount(id)) if id == user_id));

        let token = service.create_session(user_id, true).await.unwrap();
        assert!(service.is_valid_token(&token).await.unwrap());
    }

    #[tokio::test]
    async fn test_unknown_user_fails_with_user_not_found() {
        let lookup = StaticUserLookup::with_account();
        let (service, _cache) = service(lookup);

        let result = service.create_session(Uuid::new_v4(), false).await;
        assert!(matches!(result, Err(AuthError::UserNotFound)));
    }

    #[tokio::test]
    async fn test_is_valid_token_propagates_decode_failure() {
        let lookup = StaticUserLookup::with_account();
        let (service, _cache) = service(lookup);

        let result = service.is_valid_token("garbage").await;
        assert!(matches!(result, Err(AuthError::InvalidToken(_))));
    }

    #[tokio::test]
    async fn test_cache_failure_propagates_not_degrades() {
        let lookup = StaticUserLookup::with_account();
        let user_id = lookup.profile.id;
        let profile = lookup.profile.clone();
        let config = SessionConfig {
            secret: "test-secret".to_string(),
            ttl_seconds: 10800,
        };
        let service = SessionService::new(&config, lookup, FailingSessionCache);

        let result = service.create_session(user_id, false).await;
        assert!(matches!(result, Err(AuthError::Cache(_))));

        // A decodable token must not be treated as valid or invalid when
        // the cache cannot answer.
        let claims = SessionClaims {
            sub: profile.id,
            email: profile.email,
            name: profile.name,
            created_at: profile.created_at,
            iat: Utc::now().timestamp_millis(),
        };
        let token = TokenCodec::new("test-secret").sign(&claims).unwrap();
        let result = service.is_valid_token(&token).await;
        assert!(matches!(result, Err(AuthError::Cache(_))));

        let result = service.clear_session(user_id).await;
        assert!(matches!(result, Err(AuthError::Cache(_))));
    }

    #[tokio::test]
    async fn test_huge_ttl_does_not_overflow_expiry_check() {
        let lookup = StaticUserLookup::with_account();
        let user_id = lookup.profile.id;
        let cache = MemorySessionCache::default();
        let config = SessionConfig {
            secret: "test-secret".to_string(),
            ttl_seconds: u64::MAX,
        };
        let service = SessionService::new(&config, lookup, cache);

        let token = service.create_session(user_id, false).await.unwrap();
        assert!(!service.is_expired_token(&token).unwrap());
    }

    #[test]
    #[serial_test::serial]
    fn test_session_config_from_env() {
        unsafe {
            std::env::set_var("SESSION_TOKEN_SECRET", "env-secret");
            std::env::remove_var("SESSION_TTL_SECONDS");
        }

        let config = SessionConfig::from_env().unwrap();
        assert_eq!(config.secret, "env-secret");
        assert_eq!(config.ttl_seconds, 10800);

        unsafe {
            std::env::remove_var("SESSION_TOKEN_SECRET");
        }
    }

    #[test]
    #[serial_test::serial]
    fn test_session_config_requires_secret() {
        unsafe {
            std::env::remove_var("SESSION_TOKEN_SECRET");
        }

        assert!(SessionConfig::from_env().is_err());
    }
}
