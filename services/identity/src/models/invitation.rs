//! Invitation model and related functionality

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Invitation lifecycle status
///
/// Status only moves forward: pending to accepted, or pending to expired.
/// Nothing leaves `Accepted` and nothing re-enters `Pending`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvitationStatus {
    Pending,
    Accepted,
    Expired,
}

impl InvitationStatus {
    /// Database/text representation
    pub fn as_str(&self) -> &'static str {
        match self {
            InvitationStatus::Pending => "pending",
            InvitationStatus::Accepted => "accepted",
            InvitationStatus::Expired => "expired",
        }
    }
}

impl FromStr for InvitationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(InvitationStatus::Pending),
            "accepted" => Ok(InvitationStatus::Accepted),
            "expired" => Ok(InvitationStatus::Expired),
            other => Err(format!("unknown invitation status: {other}")),
        }
    }
}

/// Invitation entity
///
/// `deleted_at` is a soft-delete marker set only once the row has been
/// expired for longer than the retention period; physical removal is left to
/// an external purge process.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Invitation {
    pub id: Uuid,
    pub email: String,
    pub status: InvitationStatus,
    pub invited_by: Uuid,
    pub account_id: Uuid,
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

/// New invitation creation payload
#[derive(Debug, Clone)]
pub struct NewInvitation {
    pub email: String,
    pub invited_by: Uuid,
    pub account_id: Uuid,
    pub token: String,
    pub expires_at: DateTime<Utc>,
}
