//! Session cache-of-record
//!
//! The cache holds the signed token string itself, keyed by user id, with a
//! TTL equal to the session lifetime. It owns the authoritative "is this
//! session still live" answer: deleting the entry revokes the session
//! immediately, regardless of the token's own embedded timestamp.

use std::future::Future;

use common::error::CacheResult;
use uuid::Uuid;

use common::cache::RedisPool;

/// Contract the session service requires from the cache
///
/// Every operation is fallible with `CacheError`; the caller propagates
/// failures rather than degrading to an implicit allow or deny.
pub trait SessionTokenCache {
    /// Fetch the cached token for a user, if any
    fn get(&self, user_id: Uuid) -> impl Future<Output = CacheResult<Option<String>>> + Send;

    /// Store a token for a user with the given TTL, overwriting any previous
    /// entry
    fn set(
        &self,
        user_id: Uuid,
        token: &str,
        ttl_seconds: u64,
    ) -> impl Future<Output = CacheResult<()>> + Send;

    /// Delete the cached token; deleting an absent entry is not an error
    fn delete(&self, user_id: Uuid) -> impl Future<Output = CacheResult<()>> + Send;

    /// Cheap boolean probe used by validation, no payload fetch
    fn exists(&self, user_id: Uuid) -> impl Future<Output = CacheResult<bool>> + Send;
}

fn session_key(user_id: Uuid) -> String {
    format!("session:{}", user_id)
}

/// Redis-backed session cache
#[derive(Clone)]
pub struct RedisSessionCache {
    pool: RedisPool,
}

impl RedisSessionCache {
    /// Create a new session cache over a Redis pool
    pub fn new(pool: RedisPool) -> Self {
        Self { pool }
    }
}

impl SessionTokenCache for RedisSessionCache {
    async fn get(&self, user_id: Uuid) -> CacheResult<Option<String>> {
        self.pool.get(&session_key(user_id)).await
    }

    async fn set(&self, user_id: Uuid, token: &str, ttl_seconds: u64) -> CacheResult<()> {
        self.pool
            .set(&session_key(user_id), token, Some(ttl_seconds))
            .await
    }

    async fn delete(&self, user_id: Uuid) -> CacheResult<()> {
        self.pool.delete(&session_key(user_id)).await
    }

    async fn exists(&self, user_id: Uuid) -> CacheResult<bool> {
        self.pool.exists(&session_key(user_id)).await
    }
}
