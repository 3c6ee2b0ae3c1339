//! Middleware for session token validation and authentication

use axum::{
    body::Body,
    extract::State,
    http::{HeaderMap, Request, header},
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use crate::{AppState, error::AuthError};

/// Identity attached to authenticated requests
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub user_id: Uuid,
    pub user_name: String,
    pub user_email: String,
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix("Bearer").unwrap_or(value).trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

/// Validate the bearer session token and attach the caller's identity
///
/// A missing token is a plain 401. A token that decodes but is expired or no
/// longer cache-backed gets the `expired: true` marker so clients can
/// distinguish "session expired" from "never authenticated". A cache failure
/// is a hard reject, never an implicit pass.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, AuthError> {
    let token = bearer_token(req.headers()).ok_or(AuthError::Unauthorized)?;

    let is_expired = state.session_service.is_expired_token(&token)?;
    let is_valid = state.session_service.is_valid_token(&token).await?;
    if is_expired || !is_valid {
        return Err(AuthError::SessionExpired);
    }

    let claims = state.session_service.parse_session(&token)?;
    req.extensions_mut().insert(AuthContext {
        user_id: claims.sub,
        user_name: claims.name,
        user_email: claims.email,
    });

    Ok(next.run(req).await)
}
