//! Custom error types for the common library
//!
//! This module defines the infrastructure-level error types shared across
//! services: database failures and cache failures.

use sqlx::Error as SqlxError;
use thiserror::Error;

/// Custom error type for database operations
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Error occurred during database connection
    #[error("Database connection error: {0}")]
    Connection(#[source] SqlxError),

    /// Error occurred during database query execution
    #[error("Database query error: {0}")]
    Query(#[source] SqlxError),

    /// Configuration error
    #[error("Database configuration error: {0}")]
    Configuration(String),
}

/// Type alias for Result with DatabaseError
pub type DatabaseResult<T> = Result<T, DatabaseError>;

/// Custom error type for cache operations
///
/// Every Redis failure surfaces as `Unavailable` so callers can map it to a
/// service-unavailable response. Cache failures must never be swallowed into
/// an implicit allow or deny.
#[derive(Error, Debug)]
pub enum CacheError {
    /// The cache could not be reached or the command failed
    #[error("Cache unavailable: {0}")]
    Unavailable(#[source] redis::RedisError),
}

impl From<redis::RedisError> for CacheError {
    fn from(err: redis::RedisError) -> Self {
        CacheError::Unavailable(err)
    }
}

/// Type alias for Result with CacheError
pub type CacheResult<T> = Result<T, CacheError>;
