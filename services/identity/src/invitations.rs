//! Invitation lifecycle service
//!
//! Enforces the invitation state machine (pending to accepted, pending to
//! expired) and the one-active-invitation-per-email-and-account rule.
//! `validate_invitation` is the single choke point every acceptance flow
//! passes through.

use std::future::Future;

use chrono::{DateTime, Utc};
use rand::{Rng, distributions::Alphanumeric};
use tracing::info;
use uuid::Uuid;

use crate::{
    error::InvitationError,
    models::{Invitation, InvitationStatus, NewInvitation},
};

const INVITATION_TOKEN_LENGTH: usize = 48;

/// Contract the invitation service and the cleanup scheduler require from
/// the invitation store
///
/// All writes are unconditional and idempotent; re-applying any of them
/// never corrupts state, which is what lets the concurrency model skip
/// locking entirely.
pub trait InvitationStore {
    /// Persist a new pending invitation
    fn create(
        &self,
        invitation: NewInvitation,
    ) -> impl Future<Output = Result<Invitation, InvitationError>> + Send;

    /// Fetch by opaque token; soft-deleted rows are invisible
    fn find_by_token(
        &self,
        token: &str,
    ) -> impl Future<Output = Result<Option<Invitation>, InvitationError>> + Send;

    /// All invitations sent to an email address
    fn find_by_email(
        &self,
        email: &str,
    ) -> impl Future<Output = Result<Vec<Invitation>, InvitationError>> + Send;

    /// Unconditionally set the status and bump `updated_at`
    fn update_status(
        &self,
        id: Uuid,
        status: InvitationStatus,
    ) -> impl Future<Output = Result<Invitation, InvitationError>> + Send;

    /// Pending, unexpired invitations for an account
    fn find_pending(
        &self,
        account_id: Uuid,
    ) -> impl Future<Output = Result<Vec<Invitation>, InvitationError>> + Send;

    /// Bulk-expire pending rows whose `expires_at` has passed; returns the
    /// number of rows updated
    fn mark_expired(
        &self,
        now: DateTime<Utc>,
    ) -> impl Future<Output = Result<u64, InvitationError>> + Send;

    /// Bulk soft-delete expired rows whose `updated_at` predates the cutoff;
    /// returns the number of rows updated
    fn soft_delete_expired(
        &self,
        cutoff: DateTime<Utc>,
    ) -> impl Future<Output = Result<u64, InvitationError>> + Send;
}

/// Invitation configuration
#[derive(Debug, Clone)]
pub struct InvitationConfig {
    /// How long a new invitation stays acceptable, in hours
    pub expiration_hours: i64,
}

impl InvitationConfig {
    /// Create a new InvitationConfig from environment variables
    ///
    /// # Environment Variables
    /// - `INVITATION_EXPIRATION_HOURS`: expiration window in hours (default: 48)
    pub fn from_env() -> Self {
        let expiration_hours = std::env::var("INVITATION_EXPIRATION_HOURS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(48);

        InvitationConfig { expiration_hours }
    }
}

/// Invitation service
#[derive(Clone)]
pub struct InvitationService<R> {
    store: R,
    expiration_hours: i64,
}

impl<R: InvitationStore> InvitationService<R> {
    /// Create a new invitation service
    pub fn new(config: &InvitationConfig, store: R) -> Self {
        Self {
            store,
            expiration_hours: config.expiration_hours,
        }
    }

    /// Create a pending invitation for an email address
    ///
    /// Fails with `Duplicate` if the email already has a pending invitation
    /// for the same account; the check is enforced here, not by a uniqueness
    /// constraint.
    pub async fn create_invitation(
        &self,
        email: &str,
        invited_by: Uuid,
        account_id: Uuid,
    ) -> Result<Invitation, InvitationError> {
        let existing = self.store.find_by_email(email).await?;
        let has_pending = existing
            .iter()
            .any(|inv| inv.status == InvitationStatus::Pending && inv.account_id == account_id);

        if has_pending {
            return Err(InvitationError::Duplicate(email.to_string()));
        }

        let invitation = self
            .store
            .create(NewInvitation {
                email: email.to_string(),
                invited_by,
                account_id,
                token: generate_invitation_token(),
                expires_at: Utc::now() + chrono::Duration::hours(self.expiration_hours),
            })
            .await?;

        info!(
            "Created invitation {} for {} on account {}",
            invitation.id, invitation.email, account_id
        );
        Ok(invitation)
    }

    /// Validate an invitation token, lazily expiring it if its time has
    /// passed
    ///
    /// A pending row whose `expires_at` has passed is flipped to expired as
    /// a side effect of validation. The write is an unconditional status
    /// set, so two concurrent validations of the same borderline token are
    /// harmless.
    pub async fn validate_invitation(&self, token: &str) -> Result<Invitation, InvitationError> {
        let invitation = self
            .store
            .find_by_token(token)
            .await?
            .ok_or(InvitationError::NotFound)?;

        if invitation.status == InvitationStatus::Accepted {
            return Err(InvitationError::AlreadyAccepted);
        }

        if invitation.status == InvitationStatus::Expired || invitation.expires_at < Utc::now() {
            self.store
                .update_status(invitation.id, InvitationStatus::Expired)
                .await?;
            return Err(InvitationError::Expired);
        }

        Ok(invitation)
    }

    /// Accept a pending invitation, inheriting every failure mode of
    /// `validate_invitation`
    pub async fn accept_invitation(&self, token: &str) -> Result<Invitation, InvitationError> {
        let invitation = self.validate_invitation(token).await?;
        let accepted = self
            .store
            .update_status(invitation.id, InvitationStatus::Accepted)
            .await?;

        info!("Invitation {} accepted", accepted.id);
        Ok(accepted)
    }

    /// Pending, unexpired invitations for an account
    pub async fn get_pending_invitations(
        &self,
        account_id: Uuid,
    ) -> Result<Vec<Invitation>, InvitationError> {
        self.store.find_pending(account_id).await
    }
}

fn generate_invitation_token() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(INVITATION_TOKEN_LENGTH)
        .map(char::from)
        .collect()
}
