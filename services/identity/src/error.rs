//! Custom error types for the identity service
//!
//! Two taxonomies live here: `AuthError` for the session/token subsystem and
//! `InvitationError` for the invitation state machine. Both map to distinct
//! HTTP responses so clients can tell an expired session from a forged token,
//! and a pending account from a missing user.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use common::error::{CacheError, DatabaseError};
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

/// Errors surfaced by the session/token subsystem
#[derive(Error, Debug)]
pub enum AuthError {
    /// The token is malformed, forged, or uses an unsupported algorithm.
    /// All decode failures collapse into this one kind on purpose.
    #[error("Invalid session token")]
    InvalidToken(#[from] jsonwebtoken::errors::Error),

    /// No user matched the lookup
    #[error("User not found")]
    UserNotFound,

    /// Authentication succeeded but the user is not associated with an
    /// account yet. Never reclassified as `UserNotFound`.
    #[error("User {0} needs to be associated with an account before logging in")]
    PendingAccount(Uuid),

    /// The session cache could not answer; propagated, never an implicit
    /// allow or deny
    #[error(transparent)]
    Cache(#[from] CacheError),

    /// No credentials were presented or they did not match
    #[error("Unauthorized")]
    Unauthorized,

    /// The presented token no longer maps to a live session
    #[error("Session expired, please login again")]
    SessionExpired,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            AuthError::InvalidToken(_) | AuthError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                json!({ "error": "Unauthorized" }),
            ),
            AuthError::SessionExpired => (
                StatusCode::UNAUTHORIZED,
                json!({
                    "expired": true,
                    "error": "Session expired, please login again",
                }),
            ),
            AuthError::UserNotFound => (
                StatusCode::NOT_FOUND,
                json!({ "error": "User not found" }),
            ),
            AuthError::PendingAccount(_) => (
                StatusCode::FORBIDDEN,
                json!({
                    "code": "pending_account",
                    "error": self.to_string(),
                }),
            ),
            AuthError::Cache(_) => (
                StatusCode::SERVICE_UNAVAILABLE,
                json!({ "error": "Session cache unavailable" }),
            ),
        };

        (status, Json(body)).into_response()
    }
}

/// Errors surfaced by the invitation state machine
#[derive(Error, Debug)]
pub enum InvitationError {
    /// No invitation matched the token
    #[error("Invitation not found")]
    NotFound,

    /// The invitation has already been accepted
    #[error("Invitation has already been accepted")]
    AlreadyAccepted,

    /// The invitation has expired
    #[error("Invitation has expired")]
    Expired,

    /// An active invitation already exists for this email and account
    #[error("An active invitation already exists for {0}")]
    Duplicate(String),

    /// The invitation store failed
    #[error(transparent)]
    Database(#[from] DatabaseError),
}

impl IntoResponse for InvitationError {
    fn into_response(self) -> Response {
        let status = match &self {
            InvitationError::NotFound => StatusCode::NOT_FOUND,
            InvitationError::AlreadyAccepted
            | InvitationError::Expired
            | InvitationError::Duplicate(_) => StatusCode::BAD_REQUEST,
            InvitationError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let message = match &self {
            InvitationError::Database(_) => "Internal server error".to_string(),
            other => other.to_string(),
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}
