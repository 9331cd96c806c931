/// Storage seams for accounts and access tokens
///
/// Each mutating method is a single storage statement; no invariant spans
/// two calls.

mod memory;
mod postgres;

pub use memory::{InMemoryAccountRepository, InMemoryTokenRepository};
pub use postgres::{PostgresAccountRepository, PostgresTokenRepository};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::auth::{AccessToken, Account};
use crate::error::AppError;

#[async_trait]
pub trait AccountRepository: Send + Sync {
    /// Case-insensitive exact match on the identifier.
    async fn find_by_identifier(&self, identifier: &str) -> Result<Option<Account>, AppError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Account>, AppError>;
}

#[async_trait]
pub trait TokenRepository: Send + Sync {
    async fn insert(&self, token: &AccessToken) -> Result<(), AppError>;

    async fn find_by_hash(&self, token_hash: &str) -> Result<Option<AccessToken>, AppError>;

    /// Sets `revoked_at` if the token is still active. Returns `false` when
    /// no active token with that id exists.
    async fn revoke(&self, id: Uuid, at: DateTime<Utc>) -> Result<bool, AppError>;

    async fn touch(&self, id: Uuid, at: DateTime<Utc>) -> Result<(), AppError>;
}
