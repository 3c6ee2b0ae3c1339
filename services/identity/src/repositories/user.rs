//! User repository for database operations

use anyhow::Result;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::SaltString};
use sqlx::{PgPool, Row};
use tracing::{error, info};
use uuid::Uuid;

use crate::{
    error::AuthError,
    models::{AccountSummary, NewUser, User, UserProfile},
    session::UserLookup,
};

/// User repository
#[derive(Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    /// Create a new user repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create a new user with no account association yet
    pub async fn create(&self, new_user: &NewUser) -> Result<User> {
        info!("Creating new user: {}", new_user.email);

        let salt = SaltString::generate(&mut rand::thread_rng());
        let argon2 = Argon2::default();
        let password_hash = argon2
            .hash_password(new_user.password.as_bytes(), &salt)
            .map_err(|e| anyhow::anyhow!("Failed to hash password: {}", e))?
            .to_string();

        let row = sqlx::query(
            r#"
            INSERT INTO users (id, name, email, password_hash)
            VALUES ($1, $2, $3, $4)
            RETURNING id, name, email, password_hash, account_id, created_at, updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&new_user.name)
        .bind(&new_user.email)
        .bind(&password_hash)
        .fetch_one(&self.pool)
        .await?;

        Ok(User {
            id: row.get("id"),
            name: row.get("name"),
            email: row.get("email"),
            password_hash: row.get("password_hash"),
            account_id: row.get("account_id"),
            created_at: row.get("created_at"),
            updated_at: row.get("updated_at"),
        })
    }

    /// Find a user by email
    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let row = sqlx::query(
            r#"
            SELECT id, name, email, password_hash, account_id, created_at, updated_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|row| User {
            id: row.get("id"),
            name: row.get("name"),
            email: row.get("email"),
            password_hash: row.get("password_hash"),
            account_id: row.get("account_id"),
            created_at: row.get("created_at"),
            updated_at: row.get("updated_at"),
        }))
    }

    /// Verify a user's password
    pub async fn verify_password(&self, user: &User, password: &str) -> Result<bool> {
        let parsed_hash = PasswordHash::new(&user.password_hash)
            .map_err(|e| anyhow::anyhow!("Failed to parse password hash: {}", e))?;

        let argon2 = Argon2::default();
        let result = argon2.verify_password(password.as_bytes(), &parsed_hash);

        Ok(result.is_ok())
    }
}

impl UserLookup for UserRepository {
    /// Resolve a user together with their account association
    ///
    /// Any lookup failure, including a query error, surfaces as
    /// `UserNotFound`; the pending-account decision belongs to the caller.
    async fn get_by_id(&self, user_id: Uuid) -> Result<UserProfile, AuthError> {
        let row = sqlx::query(
            r#"
            SELECT u.id, u.name, u.email, u.created_at,
                   a.id AS account_id, a.name AS account_name, a.slug AS account_slug
            FROM users u
            LEFT JOIN accounts a ON a.id = u.account_id
            WHERE u.id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            error!("User lookup failed for {}: {}", user_id, e);
            AuthError::UserNotFound
        })?
        .ok_or(AuthError::UserNotFound)?;

        let account = row
            .get::<Option<Uuid>, _>("account_id")
            .map(|account_id| AccountSummary {
                id: account_id,
                name: row.get("account_name"),
                slug: row.get("account_slug"),
            });

        Ok(UserProfile {
            id: row.get("id"),
            name: row.get("name"),
            email: row.get("email"),
            created_at: row.get("created_at"),
            account,
        })
    }
}
