//! Invitation repository for database operations
//!
//! Reads exclude soft-deleted rows. Every UPDATE that changes `status` also
//! bumps `updated_at`, which is the clock the retention-based soft delete
//! runs on.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use common::error::DatabaseError;
use sqlx::{PgPool, Row, postgres::PgRow};
use uuid::Uuid;

use crate::{
    error::InvitationError,
    invitations::InvitationStore,
    models::{Invitation, InvitationStatus, NewInvitation},
};

const INVITATION_COLUMNS: &str =
    "id, email, status, invited_by, account_id, token, expires_at, created_at, updated_at, deleted_at";

/// PostgreSQL-backed invitation repository
#[derive(Clone)]
pub struct PgInvitationRepository {
    pool: PgPool,
}

impl PgInvitationRepository {
    /// Create a new invitation repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn invitation_from_row(row: &PgRow) -> Result<Invitation, InvitationError> {
    let status: String = row.get("status");
    let status = InvitationStatus::from_str(&status)
        .map_err(|e| DatabaseError::Query(sqlx::Error::Decode(e.into())))?;

    Ok(Invitation {
        id: row.get("id"),
        email: row.get("email"),
        status,
        invited_by: row.get("invited_by"),
        account_id: row.get("account_id"),
        token: row.get("token"),
        expires_at: row.get("expires_at"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
        deleted_at: row.get("deleted_at"),
    })
}

impl InvitationStore for PgInvitationRepository {
    async fn create(&self, invitation: NewInvitation) -> Result<Invitation, InvitationError> {
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO invitations (id, email, status, invited_by, account_id, token, expires_at)
            VALUES ($1, $2, 'pending', $3, $4, $5, $6)
            RETURNING {INVITATION_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(&invitation.email)
        .bind(invitation.invited_by)
        .bind(invitation.account_id)
        .bind(&invitation.token)
        .bind(invitation.expires_at)
        .fetch_one(&self.pool)
        .await
        .map_err(DatabaseError::Query)?;

        invitation_from_row(&row)
    }

    async fn find_by_token(&self, token: &str) -> Result<Option<Invitation>, InvitationError> {
        let row = sqlx::query(&format!(
            r#"
            SELECT {INVITATION_COLUMNS}
            FROM invitations
            WHERE token = $1 AND deleted_at IS NULL
            "#
        ))
        .bind(token)
        .fetch_optional(&self.pool)
        .await
        .map_err(DatabaseError::Query)?;

        row.as_ref().map(invitation_from_row).transpose()
    }

    async fn find_by_email(&self, email: &str) -> Result<Vec<Invitation>, InvitationError> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {INVITATION_COLUMNS}
            FROM invitations
            WHERE email = $1 AND deleted_at IS NULL
            ORDER BY created_at
            "#
        ))
        .bind(email)
        .fetch_all(&self.pool)
        .await
        .map_err(DatabaseError::Query)?;

        rows.iter().map(invitation_from_row).collect()
    }

    async fn update_status(
        &self,
        id: Uuid,
        status: InvitationStatus,
    ) -> Result<Invitation, InvitationError> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE invitations
            SET status = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING {INVITATION_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(status.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(DatabaseError::Query)?
        .ok_or(InvitationError::NotFound)?;

        invitation_from_row(&row)
    }

    async fn find_pending(&self, account_id: Uuid) -> Result<Vec<Invitation>, InvitationError> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {INVITATION_COLUMNS}
            FROM invitations
            WHERE account_id = $1
              AND status = 'pending'
              AND expires_at > NOW()
              AND deleted_at IS NULL
            ORDER BY created_at
            "#
        ))
        .bind(account_id)
        .fetch_all(&self.pool)
        .await
        .map_err(DatabaseError::Query)?;

        rows.iter().map(invitation_from_row).collect()
    }

    async fn mark_expired(&self, now: DateTime<Utc>) -> Result<u64, InvitationError> {
        let result = sqlx::query(
            r#"
            UPDATE invitations
            SET status = 'expired', updated_at = NOW()
            WHERE status = 'pending' AND expires_at < $1
            "#,
        )
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(DatabaseError::Query)?;

        Ok(result.rows_affected())
    }

    async fn soft_delete_expired(&self, cutoff: DateTime<Utc>) -> Result<u64, InvitationError> {
        let result = sqlx::query(
            r#"
            UPDATE invitations
            SET deleted_at = NOW()
            WHERE status = 'expired' AND updated_at < $1 AND deleted_at IS NULL
            "#,
        )
        .bind(cutoff)
        .execute(&self.pool)
        .await
        .map_err(DatabaseError::Query)?;

        Ok(result.rows_affected())
    }
}
