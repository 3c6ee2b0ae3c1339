use std::sync::Arc;

use anyhow::Result;
use tracing::{Level, info};
use tracing_subscriber::EnvFilter;

mod cleanup;
mod error;
mod invitations;
mod middleware;
mod models;
mod repositories;
mod routes;
mod session;
mod session_cache;
#[cfg(test)]
mod testing;
mod token;

use common::cache::{RedisConfig, RedisPool};
use common::database::{self, DatabaseConfig};

use crate::{
    cleanup::{CleanupConfig, InvitationCleanupScheduler},
    invitations::{InvitationConfig, InvitationService},
    repositories::{PgInvitationRepository, UserRepository},
    session::{SessionConfig, SessionService},
    session_cache::RedisSessionCache,
};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub session_service: SessionService<UserRepository, RedisSessionCache>,
    pub invitation_service: InvitationService<PgInvitationRepository>,
    pub user_repository: UserRepository,
    pub cleanup_scheduler: Arc<InvitationCleanupScheduler<PgInvitationRepository>>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_max_level(Level::INFO)
        .init();

    info!("Starting identity service");

    // Initialize database connection pool
    let db_config = DatabaseConfig::from_env()?;
    let pool = database::init_pool(&db_config).await?;

    if database::health_check(&pool).await? {
        info!("Database connection successful");
    } else {
        anyhow::bail!("Failed to connect to database");
    }

    // Initialize Redis connection pool
    let redis_config = RedisConfig::from_env();
    let redis_pool = RedisPool::new(&redis_config)?;

    if redis_pool.health_check().await? {
        info!("Redis connection successful");
    } else {
        anyhow::bail!("Failed to connect to Redis");
    }

    let user_repository = UserRepository::new(pool.clone());
    let invitation_repository = PgInvitationRepository::new(pool.clone());

    let session_config = SessionConfig::from_env()?;
    let session_service = SessionService::new(
        &session_config,
        user_repository.clone(),
        RedisSessionCache::new(redis_pool),
    );

    let invitation_service =
        InvitationService::new(&InvitationConfig::from_env(), invitation_repository.clone());

    // Start the recurring invitation reaper
    let cleanup_scheduler = Arc::new(InvitationCleanupScheduler::new(
        CleanupConfig::from_env(),
        invitation_repository,
    ));
    cleanup_scheduler.start_cleanup_schedule().await?;

    let app_state = AppState {
        session_service,
        invitation_service,
        user_repository,
        cleanup_scheduler: cleanup_scheduler.clone(),
    };

    // Start the web server
    let app = routes::create_router(app_state);

    let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await?;
    info!("Identity service listening on 0.0.0.0:3000");

    tokio::select! {
        result = axum::serve(listener, app) => result?,
        _ = tokio::signal::ctrl_c() => info!("Shutdown signal received"),
    }

    cleanup_scheduler.stop_cleanup_schedule().await?;
    info!("Identity service stopped");

    Ok(())
}
