//! Identity service routes
//!
//! Thin HTTP surface over the session and invitation services. Everything
//! behind the auth middleware sees an `AuthContext` in request extensions.

use axum::{
    Extension, Json, Router,
    extract::State,
    http::StatusCode,
    middleware::from_fn_with_state,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{error, info};
use uuid::Uuid;

use crate::{
    AppState,
    error::AuthError,
    middleware::{AuthContext, auth_middleware},
    models::{Invitation, NewUser},
};

/// Response for session issuance
#[derive(Serialize)]
pub struct SessionResponse {
    pub user_id: Uuid,
    pub token: String,
}

/// Request for user login
#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Request for invitation creation
#[derive(Deserialize)]
pub struct InviteRequest {
    pub email: String,
}

/// Request for invitation acceptance
#[derive(Deserialize)]
pub struct AcceptInvitationRequest {
    pub token: String,
}

/// Create the router for the identity service
pub fn create_router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/auth/logout", post(logout))
        .route("/auth/session", get(current_session))
        .route("/invitations", post(create_invitation))
        .route("/invitations/pending", get(pending_invitations))
        .route("/admin/invitations/cleanup", post(run_invitation_cleanup))
        .route_layer(from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .route("/health", get(health_check))
        .route("/auth/signup", post(signup))
        .route("/auth/login", post(login))
        .route("/invitations/accept", post(accept_invitation))
        .merge(protected)
        .with_state(state)
}

/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "service": "identity",
    }))
}

/// User signup endpoint
///
/// A fresh user has no account association yet, so the session is issued
/// with pending accounts allowed.
pub async fn signup(
    State(state): State<AppState>,
    Json(payload): Json<NewUser>,
) -> Result<impl IntoResponse, Response> {
    info!("Signup attempt for: {}", payload.email);

    let user = state.user_repository.create(&payload).await.map_err(|e| {
        error!("Failed to create user: {}", e);
        (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "User creation failed" })),
        )
            .into_response()
    })?;

    let token = state
        .session_service
        .create_session(user.id, true)
        .await
        .map_err(IntoResponse::into_response)?;

    Ok((
        StatusCode::CREATED,
        Json(SessionResponse {
            user_id: user.id,
            token,
        }),
    ))
}

/// User login endpoint
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, Response> {
    info!("Login attempt for: {}", payload.email);

    let user = state
        .user_repository
        .find_by_email(&payload.email)
        .await
        .map_err(|e| {
            error!("Login lookup failed: {}", e);
            AuthError::Unauthorized.into_response()
        })?
        .ok_or_else(|| AuthError::Unauthorized.into_response())?;

    let password_ok = state
        .user_repository
        .verify_password(&user, &payload.password)
        .await
        .map_err(|e| {
            error!("Password verification failed: {}", e);
            AuthError::Unauthorized.into_response()
        })?;
    if !password_ok {
        return Err(AuthError::Unauthorized.into_response());
    }

    let token = state
        .session_service
        .create_session(user.id, false)
        .await
        .map_err(IntoResponse::into_response)?;

    Ok(Json(SessionResponse {
        user_id: user.id,
        token,
    }))
}

/// Logout endpoint; revokes the session immediately
pub async fn logout(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
) -> Result<impl IntoResponse, AuthError> {
    state.session_service.clear_session(ctx.user_id).await?;
    Ok(Json(json!({ "message": "Logged out" })))
}

/// Introspection of the authenticated caller
pub async fn current_session(Extension(ctx): Extension<AuthContext>) -> impl IntoResponse {
    Json(json!({
        "user_id": ctx.user_id,
        "user_name": ctx.user_name,
        "user_email": ctx.user_email,
    }))
}

/// Invite an email address into the caller's account
pub async fn create_invitation(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Json(payload): Json<InviteRequest>,
) -> Result<impl IntoResponse, Response> {
    let account = caller_account(&state, &ctx).await?;

    let invitation = state
        .invitation_service
        .create_invitation(&payload.email, ctx.user_id, account)
        .await
        .map_err(IntoResponse::into_response)?;

    Ok((StatusCode::CREATED, Json(invitation)))
}

/// Pending invitations for the caller's account
pub async fn pending_invitations(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
) -> Result<Json<Vec<Invitation>>, Response> {
    let account = caller_account(&state, &ctx).await?;

    let invitations = state
        .invitation_service
        .get_pending_invitations(account)
        .await
        .map_err(IntoResponse::into_response)?;

    Ok(Json(invitations))
}

/// Accept an invitation by its opaque token
pub async fn accept_invitation(
    State(state): State<AppState>,
    Json(payload): Json<AcceptInvitationRequest>,
) -> Result<Json<Invitation>, Response> {
    let invitation = state
        .invitation_service
        .accept_invitation(&payload.token)
        .await
        .map_err(IntoResponse::into_response)?;

    Ok(Json(invitation))
}

/// Manual cleanup trigger for operational use; shares the scheduled job's
/// two-phase logic
pub async fn run_invitation_cleanup(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, Response> {
    let (marked_expired, soft_deleted) = state
        .cleanup_scheduler
        .run_cleanup_now()
        .await
        .map_err(IntoResponse::into_response)?;

    Ok(Json(json!({
        "marked_expired": marked_expired,
        "soft_deleted": soft_deleted,
    })))
}

async fn caller_account(state: &AppState, ctx: &AuthContext) -> Result<Uuid, Response> {
    use crate::session::UserLookup;

    let profile = state
        .user_repository
        .get_by_id(ctx.user_id)
        .await
        .map_err(IntoResponse::into_response)?;

    profile
        .account
        .map(|account| account.id)
        .ok_or_else(|| AuthError::PendingAccount(ctx.user_id).into_response())
}
