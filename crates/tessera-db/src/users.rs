//! User and personal access token repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use sqlx::postgres::PgRow;
use sqlx::{Pool, Postgres, Row};
use uuid::Uuid;

use tessera_core::{Error, Result, User, UserRepository};

/// Prefix of every issued personal access token.
pub const TOKEN_PREFIX: &str = "tsr-";

/// Hex SHA-256 digest under which a token is stored.
pub fn token_digest(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

fn map_user(row: &PgRow) -> User {
    User {
        id: row.get("id"),
        username: row.get("username"),
        name: row.get("name"),
        admin: row.get("admin"),
    }
}

/// PostgreSQL implementation of UserRepository.
#[derive(Clone)]
pub struct PgUserRepository {
    pool: Pool<Postgres>,
}

impl PgUserRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Create a user.
    pub async fn create(&self, username: &str, name: &str, admin: bool) -> Result<User> {
        let row = sqlx::query(
            "INSERT INTO app_user (username, name, admin) VALUES ($1, $2, $3)
             RETURNING id, username, name, admin",
        )
        .bind(username)
        .bind(name)
        .bind(admin)
        .fetch_one(&self.pool)
        .await
        .map_err(Error::Database)?;
        Ok(map_user(&row))
    }

    /// Issue a personal access token. Only the digest is stored; the returned
    /// plaintext cannot be recovered later.
    pub async fn create_token(
        &self,
        user_id: i64,
        name: &str,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<String> {
        let token = format!("{}{}", TOKEN_PREFIX, Uuid::new_v4().simple());
        sqlx::query(
            "INSERT INTO personal_access_token (user_id, name, token_digest, expires_at)
             VALUES ($1, $2, $3, $4)",
        )
        .bind(user_id)
        .bind(name)
        .bind(token_digest(&token))
        .bind(expires_at)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;
        Ok(token)
    }

    /// Revoke every token of a user.
    pub async fn revoke_tokens(&self, user_id: i64) -> Result<u64> {
        let result =
            sqlx::query("UPDATE personal_access_token SET revoked = TRUE WHERE user_id = $1")
                .bind(user_id)
                .execute(&self.pool)
                .await
                .map_err(Error::Database)?;
        Ok(result.rows_affected())
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn find(&self, id: i64) -> Result<Option<User>> {
        let row = sqlx::query("SELECT id, username, name, admin FROM app_user WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::Database)?;
        Ok(row.as_ref().map(map_user))
    }

    async fn find_by_token(&self, token: &str) -> Result<Option<User>> {
        if !token.starts_with(TOKEN_PREFIX) {
            return Ok(None);
        }
        let row = sqlx::query(
            r#"
            SELECT u.id, u.username, u.name, u.admin
            FROM personal_access_token t
            JOIN app_user u ON u.id = t.user_id
            WHERE t.token_digest = $1
              AND NOT t.revoked
              AND (t.expires_at IS NULL OR t.expires_at > now())
            "#,
        )
        .bind(token_digest(token))
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;
        Ok(row.as_ref().map(map_user))
    }
}
