use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use uuid::Uuid;

use super::{AccountRepository, TokenRepository};
use crate::auth::{AccessToken, Account};
use crate::error::AppError;

fn poisoned<T>(_: T) -> AppError {
    AppError::Internal("in-memory store lock poisoned".to_string())
}

/// Process-local account store, keyed by id
#[derive(Clone, Default)]
pub struct InMemoryAccountRepository {
    accounts: Arc<RwLock<HashMap<Uuid, Account>>>,
}

impl InMemoryAccountRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds an account. Identifiers must stay unique ignoring case.
    pub fn insert(&self, account: Account) -> Result<(), AppError> {
        let mut accounts = self.accounts.write().map_err(poisoned)?;

        let taken = accounts.values().any(|existing| {
            existing.id != account.id && existing.email.eq_ignore_ascii_case(&account.email)
        });
        if taken {
            return Err(AppError::Internal(format!(
                "account identifier already exists for {}",
                account.id
            )));
        }

        accounts.insert(account.id, account);
        Ok(())
    }
}

#[async_trait]
impl AccountRepository for InMemoryAccountRepository {
    async fn find_by_identifier(&self, identifier: &str) -> Result<Option<Account>, AppError> {
        let accounts = self.accounts.read().map_err(poisoned)?;
        Ok(accounts
            .values()
            .find(|account| account.email.eq_ignore_ascii_case(identifier))
            .cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Account>, AppError> {
        let accounts = self.accounts.read().map_err(poisoned)?;
        Ok(accounts.get(&id).cloned())
    }
}

/// Process-local token store, keyed by token digest
#[derive(Clone, Default)]
pub struct InMemoryTokenRepository {
    tokens: Arc<RwLock<HashMap<String, AccessToken>>>,
}

impl InMemoryTokenRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// All stored tokens for an account, revoked ones included.
    pub fn tokens_for(&self, account_id: Uuid) -> Result<Vec<AccessToken>, AppError> {
        let tokens = self.tokens.read().map_err(poisoned)?;
        Ok(tokens
            .values()
            .filter(|token| token.account_id == account_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl TokenRepository for InMemoryTokenRepository {
    async fn insert(&self, token: &AccessToken) -> Result<(), AppError> {
        let mut tokens = self.tokens.write().map_err(poisoned)?;
        if tokens.contains_key(&token.token_hash) {
            return Err(AppError::Internal("duplicate token digest".to_string()));
        }
        tokens.insert(token.token_hash.clone(), token.clone());
        Ok(())
    }

    async fn find_by_hash(&self, token_hash: &str) -> Result<Option<AccessToken>, AppError> {
        let tokens = self.tokens.read().map_err(poisoned)?;
        Ok(tokens.get(token_hash).cloned())
    }

    async fn revoke(&self, id: Uuid, at: DateTime<Utc>) -> Result<bool, AppError> {
        let mut tokens = self.tokens.write().map_err(poisoned)?;
        match tokens
            .values_mut()
            .find(|token| token.id == id && token.revoked_at.is_none())
        {
            Some(token) => {
                token.revoked_at = Some(at);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn touch(&self, id: Uuid, at: DateTime<Utc>) -> Result<(), AppError> {
        let mut tokens = self.tokens.write().map_err(poisoned)?;
        if let Some(token) = tokens.values_mut().find(|token| token.id == id) {
            token.last_used_at = Some(at);
        }
        Ok(())
    }
}
