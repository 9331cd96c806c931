/// Token Issuance, Resolution and Revocation
///
/// Tokens are bound to one account and one device label. Several tokens
/// per account may be active at once. Revocation is permanent.

use std::sync::Arc;

use chrono::{Duration, Utc};
use uuid::Uuid;

use crate::auth::models::{AccessToken, Account, CurrentToken, IssuedToken};
use crate::auth::token::{generate_token, hash_token};
use crate::error::{AppError, AuthError, FieldErrors};
use crate::repository::{AccountRepository, TokenRepository};
use crate::validators::{validate_device_label, DEVICE_LABEL_FIELD};

pub struct TokenIssuer {
    accounts: Arc<dyn AccountRepository>,
    tokens: Arc<dyn TokenRepository>,
    lifetime: Option<Duration>,
}

impl TokenIssuer {
    pub fn new(
        accounts: Arc<dyn AccountRepository>,
        tokens: Arc<dyn TokenRepository>,
        lifetime: Option<Duration>,
    ) -> Self {
        Self {
            accounts,
            tokens,
            lifetime,
        }
    }

    /// Mint a token for `account` labelled with `device_label`.
    ///
    /// The plaintext is only available on the returned `IssuedToken`;
    /// storage keeps its SHA-256 digest.
    ///
    /// # Errors
    /// - Validation error on `deviceLabel` when the label is blank or too long
    /// - Database errors from the insert
    pub async fn issue(&self, account: &Account, device_label: &str) -> Result<IssuedToken, AppError> {
        let device_label = validate_device_label(device_label)
            .map_err(|message| FieldErrors::single(DEVICE_LABEL_FIELD, message))?;

        let plaintext = generate_token();
        let created_at = Utc::now();
        let token = AccessToken {
            id: Uuid::new_v4(),
            account_id: account.id,
            device_label,
            token_hash: hash_token(&plaintext),
            created_at,
            last_used_at: None,
            expires_at: self.lifetime.map(|lifetime| created_at + lifetime),
            revoked_at: None,
        };

        self.tokens.insert(&token).await?;

        tracing::info!(
            account_id = %account.id,
            token_id = %token.id,
            device_label = %token.device_label,
            "Access token issued"
        );

        Ok(IssuedToken { plaintext, token })
    }

    /// Resolve a presented plaintext token to its record and account.
    ///
    /// Unknown, revoked and expired tokens, and tokens whose account is
    /// gone, all fail with `AuthError::Unauthenticated`. A successful
    /// resolution records `last_used_at`.
    pub async fn authenticate(&self, plaintext: &str) -> Result<CurrentToken, AppError> {
        let now = Utc::now();
        let token = self
            .tokens
            .find_by_hash(&hash_token(plaintext))
            .await?
            .filter(|token| token.is_active_at(now))
            .ok_or(AppError::Auth(AuthError::Unauthenticated))?;

        let account = self
            .accounts
            .find_by_id(token.account_id)
            .await?
            .ok_or(AppError::Auth(AuthError::Unauthenticated))?;

        if let Err(e) = self.tokens.touch(token.id, now).await {
            tracing::warn!(token_id = %token.id, error = %e, "Failed to record token use");
        }

        let token = AccessToken {
            last_used_at: Some(now),
            ..token
        };
        Ok(CurrentToken { token, account })
    }

    /// Revoke the given token.
    ///
    /// # Errors
    /// `AuthError::TokenNotFound` if the token is already revoked or does
    /// not exist. Repeating a revoke is an error, not a no-op.
    pub async fn revoke(&self, token: &AccessToken) -> Result<(), AppError> {
        if !self.tokens.revoke(token.id, Utc::now()).await? {
            return Err(AppError::Auth(AuthError::TokenNotFound));
        }

        tracing::info!(
            account_id = %token.account_id,
            token_id = %token.id,
            "Access token revoked"
        );
        Ok(())
    }
}
