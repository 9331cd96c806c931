use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::{AccountRepository, TokenRepository};
use crate::auth::{AccessToken, Account};
use crate::error::AppError;

type TokenRow = (
    Uuid,
    Uuid,
    String,
    String,
    DateTime<Utc>,
    Option<DateTime<Utc>>,
    Option<DateTime<Utc>>,
    Option<DateTime<Utc>>,
);

fn token_from_row(row: TokenRow) -> AccessToken {
    let (id, account_id, device_label, token_hash, created_at, last_used_at, expires_at, revoked_at) =
        row;
    AccessToken {
        id,
        account_id,
        device_label,
        token_hash,
        created_at,
        last_used_at,
        expires_at,
        revoked_at,
    }
}

fn account_from_row((id, name, email, password_hash): (Uuid, String, String, String)) -> Account {
    Account {
        id,
        name,
        email,
        password_hash,
    }
}

/// `accounts` table access
#[derive(Clone)]
pub struct PostgresAccountRepository {
    pool: PgPool,
}

impl PostgresAccountRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AccountRepository for PostgresAccountRepository {
    async fn find_by_identifier(&self, identifier: &str) -> Result<Option<Account>, AppError> {
        let row = sqlx::query_as::<_, (Uuid, String, String, String)>(
            "SELECT id, name, email, password_hash FROM accounts WHERE lower(email) = lower($1)",
        )
        .bind(identifier)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(account_from_row))
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Account>, AppError> {
        let row = sqlx::query_as::<_, (Uuid, String, String, String)>(
            "SELECT id, name, email, password_hash FROM accounts WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(account_from_row))
    }
}

/// `personal_access_tokens` table access
#[derive(Clone)]
pub struct PostgresTokenRepository {
    pool: PgPool,
}

impl PostgresTokenRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TokenRepository for PostgresTokenRepository {
    async fn insert(&self, token: &AccessToken) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO personal_access_tokens
                (id, account_id, device_label, token_hash, created_at, last_used_at, expires_at, revoked_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(token.id)
        .bind(token.account_id)
        .bind(&token.device_label)
        .bind(&token.token_hash)
        .bind(token.created_at)
        .bind(token.last_used_at)
        .bind(token.expires_at)
        .bind(token.revoked_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_by_hash(&self, token_hash: &str) -> Result<Option<AccessToken>, AppError> {
        let row = sqlx::query_as::<_, TokenRow>(
            r#"
            SELECT id, account_id, device_label, token_hash, created_at, last_used_at, expires_at, revoked_at
            FROM personal_access_tokens
            WHERE token_hash = $1
            "#,
        )
        .bind(token_hash)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(token_from_row))
    }

    async fn revoke(&self, id: Uuid, at: DateTime<Utc>) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE personal_access_tokens
            SET revoked_at = $1
            WHERE id = $2 AND revoked_at IS NULL
            "#,
        )
        .bind(at)
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn touch(&self, id: Uuid, at: DateTime<Utc>) -> Result<(), AppError> {
        sqlx::query("UPDATE personal_access_tokens SET last_used_at = $1 WHERE id = $2")
            .bind(at)
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}
