//! In-memory fakes for the collaborator seams, used by unit tests

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use common::error::{CacheError, CacheResult};
use uuid::Uuid;

use crate::{
    error::{AuthError, InvitationError},
    invitations::InvitationStore,
    models::{AccountSummary, Invitation, InvitationStatus, NewInvitation, UserProfile},
    session::UserLookup,
    session_cache::SessionTokenCache,
};

/// User lookup that knows exactly one user
pub(crate) struct StaticUserLookup {
    pub profile: UserProfile,
}

impl StaticUserLookup {
    pub fn with_account() -> Self {
        Self {
            profile: UserProfile {
                id: Uuid::new_v4(),
                name: "Nurse Joy".to_string(),
                email: "nurse@example.com".to_string(),
                created_at: Utc::now(),
                account: Some(AccountSummary {
                    id: Uuid::new_v4(),
                    name: "Sunrise Care".to_string(),
                    slug: "sunrise-care".to_string(),
                }),
            },
        }
    }

    pub fn without_account() -> Self {
        let mut lookup = Self::with_account();
        lookup.profile.account = None;
        lookup
    }
}

impl UserLookup for StaticUserLookup {
    async fn get_by_id(&self, user_id: Uuid) -> Result<UserProfile, AuthError> {
        if self.profile.id == user_id {
            Ok(self.profile.clone())
        } else {
            Err(AuthError::UserNotFound)
        }
    }
}

/// Session cache backed by a HashMap; TTL is ignored because expiry is
/// exercised through token timestamps in tests
#[derive(Clone, Default)]
pub(crate) struct MemorySessionCache {
    entries: Arc<Mutex<HashMap<Uuid, String>>>,
}

impl SessionTokenCache for MemorySessionCache {
    async fn get(&self, user_id: Uuid) -> CacheResult<Option<String>> {
        Ok(self.entries.lock().unwrap().get(&user_id).cloned())
    }

    async fn set(&self, user_id: Uuid, token: &str, _ttl_seconds: u64) -> CacheResult<()> {
        self.entries.lock().unwrap().insert(user_id, token.to_string());
        Ok(())
    }

    async fn delete(&self, user_id: Uuid) -> CacheResult<()> {
        self.entries.lock().unwrap().remove(&user_id);
        Ok(())
    }

    async fn exists(&self, user_id: Uuid) -> CacheResult<bool> {
        Ok(self.entries.lock().unwrap().contains_key(&user_id))
    }
}

/// Session cache where every operation fails as unavailable
#[derive(Clone, Default)]
pub(crate) struct FailingSessionCache;

fn cache_down() -> CacheError {
    CacheError::Unavailable(redis::RedisError::from((
        redis::ErrorKind::IoError,
        "connection refused",
    )))
}

impl SessionTokenCache for FailingSessionCache {
    async fn get(&self, _user_id: Uuid) -> CacheResult<Option<String>> {
        Err(cache_down())
    }

    async fn set(&self, _user_id: Uuid, _token: &str, _ttl_seconds: u64) -> CacheResult<()> {
        Err(cache_down())
    }

    async fn delete(&self, _user_id: Uuid) -> CacheResult<()> {
        Err(cache_down())
    }

    async fn exists(&self, _user_id: Uuid) -> CacheResult<bool> {
        Err(cache_down())
    }
}

/// Invitation store backed by a Vec
#[derive(Clone, Default)]
pub(crate) struct MemoryInvitationStore {
    rows: Arc<Mutex<Vec<Invitation>>>,
}

impl MemoryInvitationStore {
    pub fn insert(&self, invitation: Invitation) {
        self.rows.lock().unwrap().push(invitation);
    }

    pub fn get(&self, id: Uuid) -> Option<Invitation> {
        self.rows.lock().unwrap().iter().find(|r| r.id == id).cloned()
    }

    pub fn set_expires_at(&self, id: Uuid, expires_at: DateTime<Utc>) {
        let mut rows = self.rows.lock().unwrap();
        if let Some(row) = rows.iter_mut().find(|r| r.id == id) {
            row.expires_at = expires_at;
        }
    }
}

impl InvitationStore for MemoryInvitationStore {
    async fn create(&self, invitation: NewInvitation) -> Result<Invitation, InvitationError> {
        let now = Utc::now();
        let row = Invitation {
            id: Uuid::new_v4(),
            email: invitation.email,
            status: InvitationStatus::Pending,
            invited_by: invitation.invited_by,
            account_id: invitation.account_id,
            token: invitation.token,
            expires_at: invitation.expires_at,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };
        self.insert(row.clone());
        Ok(row)
    }

    async fn find_by_token(&self, token: &str) -> Result<Option<Invitation>, InvitationError> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.token == token && r.deleted_at.is_none())
            .cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Vec<Invitation>, InvitationError> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.email == email && r.deleted_at.is_none())
            .cloned()
            .collect())
    }

    async fn update_status(
        &self,
        id: Uuid,
        status: InvitationStatus,
    ) -> Result<Invitation, InvitationError> {
        let mut rows = self.rows.lock().unwrap();
        let row = rows
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or(InvitationError::NotFound)?;
        row.status = status;
        row.updated_at = Utc::now();
        Ok(row.clone())
    }

    async fn find_pending(&self, account_id: Uuid) -> Result<Vec<Invitation>, InvitationError> {
        let now = Utc::now();
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|r| {
                r.account_id == account_id
                    && r.status == InvitationStatus::Pending
                    && r.expires_at > now
                    && r.deleted_at.is_none()
            })
            .cloned()
            .collect())
    }

    async fn mark_expired(&self, now: DateTime<Utc>) -> Result<u64, InvitationError> {
        let mut rows = self.rows.lock().unwrap();
        let mut marked = 0;
        for row in rows.iter_mut() {
            if row.status == InvitationStatus::Pending && row.expires_at < now {
                row.status = InvitationStatus::Expired;
                row.updated_at = Utc::now();
                marked += 1;
            }
        }
        Ok(marked)
    }

    async fn soft_delete_expired(&self, cutoff: DateTime<Utc>) -> Result<u64, InvitationError> {
        let mut rows = self.rows.lock().unwrap();
        let mut deleted = 0;
        for row in rows.iter_mut() {
            if row.status == InvitationStatus::Expired
                && row.updated_at < cutoff
                && row.deleted_at.is_none()
            {
                row.deleted_at = Some(Utc::now());
                deleted += 1;
            }
        }
        Ok(deleted)
    }
}

/// Build an invitation row with explicit lifecycle timestamps
pub(crate) fn invitation_row(
    status: InvitationStatus,
    expires_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
) -> Invitation {
    Invitation {
        id: Uuid::new_v4(),
        email: "carer@example.com".to_string(),
        status,
        invited_by: Uuid::new_v4(),
        account_id: Uuid::new_v4(),
        token: Uuid::new_v4().simple().to_string(),
        expires_at,
        created_at: updated_at,
        updated_at,
        deleted_at: None,
    }
}
