//! Invitation cleanup scheduler
//!
//! A recurring two-phase reaper: first mark pending invitations past their
//! `expires_at` as expired, then soft-delete invitations that have been
//! expired longer than the retention period. Phase 2 runs strictly after
//! phase 1 within the same tick, so a row flipped in phase 1 only becomes a
//! soft-delete candidate on a later run, once its `updated_at` has gone
//! stale. Both phases are idempotent re-evaluations, so a missed or failed
//! tick is never fatal.

use anyhow::Result;
use chrono::{Duration, Utc};
use tokio::sync::Mutex;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{error, info};

use crate::{error::InvitationError, invitations::InvitationStore};

/// Cleanup configuration
#[derive(Debug, Clone)]
pub struct CleanupConfig {
    /// Cron expression (with seconds) for the recurring run
    pub schedule: String,
    /// How long expired invitations are kept before soft deletion, in days
    pub retention_days: i64,
}

impl CleanupConfig {
    /// Create a new CleanupConfig from environment variables
    ///
    /// # Environment Variables
    /// - `CLEANUP_SCHEDULE`: cron expression (default: "0 0 3 * * *", 3 AM daily)
    /// - `INVITATION_RETENTION_DAYS`: retention period in days (default: 7)
    pub fn from_env() -> Self {
        let schedule =
            std::env::var("CLEANUP_SCHEDULE").unwrap_or_else(|_| "0 0 3 * * *".to_string());

        let retention_days = std::env::var("INVITATION_RETENTION_DAYS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(7);

        CleanupConfig {
            schedule,
            retention_days,
        }
    }
}

/// Recurring invitation reaper
///
/// At most one schedule is active per instance; the stored scheduler handle
/// makes `start`/`stop` idempotent.
pub struct InvitationCleanupScheduler<R> {
    store: R,
    config: CleanupConfig,
    scheduler: Mutex<Option<JobScheduler>>,
}

impl<R> InvitationCleanupScheduler<R>
where
    R: InvitationStore + Clone + Send + Sync + 'static,
{
    /// Create a new cleanup scheduler
    pub fn new(config: CleanupConfig, store: R) -> Self {
        Self {
            store,
            config,
            scheduler: Mutex::new(None),
        }
    }

    /// Start the recurring cleanup job; a second start is a no-op
    pub async fn start_cleanup_schedule(&self) -> Result<()> {
        let mut guard = self.scheduler.lock().await;
        if guard.is_some() {
            info!("Cleanup schedule already running");
            return Ok(());
        }

        let scheduler = JobScheduler::new().await?;

        let store = self.store.clone();
        let retention = Duration::days(self.config.retention_days);
        let job = Job::new_async(self.config.schedule.as_str(), move |_uuid, _lock| {
            let store = store.clone();
            Box::pin(async move {
                if let Err(e) = cleanup_expired_invitations(&store, retention).await {
                    error!("Failed to cleanup expired invitations: {}", e);
                }
            })
        })?;

        scheduler.add(job).await?;
        scheduler.start().await?;
        *guard = Some(scheduler);

        info!("Invitation cleanup schedule started");
        Ok(())
    }

    /// Cancel the recurring job; an in-flight tick is allowed to finish.
    /// Stopping an already-stopped scheduler is a no-op.
    pub async fn stop_cleanup_schedule(&self) -> Result<()> {
        let mut guard = self.scheduler.lock().await;
        if let Some(mut scheduler) = guard.take() {
            scheduler.shutdown().await?;
            info!("Invitation cleanup schedule stopped");
        }
        Ok(())
    }

    /// Run one cleanup tick immediately, sharing the scheduled job's logic
    pub async fn run_cleanup_now(&self) -> Result<(u64, u64), InvitationError> {
        cleanup_expired_invitations(&self.store, Duration::days(self.config.retention_days)).await
    }
}

/// One two-phase cleanup tick; returns (marked expired, soft deleted)
async fn cleanup_expired_invitations<R: InvitationStore>(
    store: &R,
    retention: Duration,
) -> Result<(u64, u64), InvitationError> {
    let now = Utc::now();

    let marked = store.mark_expired(now).await?;
    let deleted = store.soft_delete_expired(now - retention).await?;

    info!(
        "Invitation cleanup completed: {} marked as expired, {} soft deleted",
        marked, deleted
    );
    Ok((marked, deleted))
}
