//! Common library shared across services
//!
//! This crate provides the infrastructure used by the identity service:
//! PostgreSQL connection pooling, the Redis cache client, and the typed
//! errors both of them surface.

pub mod cache;
pub mod database;
pub mod error;
