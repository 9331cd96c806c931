/// Credential Verification
///
/// Resolves an account by identifier and checks the supplied secret
/// against its stored hash.
///
/// # Security Notes
/// - Unknown identifier and wrong secret produce the same error
/// - Exactly one hash verification runs per call; an unknown identifier is
///   checked against a dummy hash so both paths cost the same
/// - Neither the secret nor any hash is logged

use std::sync::Arc;

use crate::auth::models::Account;
use crate::auth::password::PasswordHasher;
use crate::error::{AppError, AuthError};
use crate::repository::AccountRepository;

const DUMMY_SECRET: &str = "dummy-secret-for-unknown-accounts";

pub struct CredentialVerifier {
    accounts: Arc<dyn AccountRepository>,
    hasher: Arc<dyn PasswordHasher>,
    dummy_hash: String,
}

impl CredentialVerifier {
    /// Hashes the dummy secret once up front with the same hasher, so the
    /// unknown-account path pays the configured cost.
    pub fn new(
        accounts: Arc<dyn AccountRepository>,
        hasher: Arc<dyn PasswordHasher>,
    ) -> Result<Self, AppError> {
        let dummy_hash = hasher.hash(DUMMY_SECRET)?;
        Ok(Self {
            accounts,
            hasher,
            dummy_hash,
        })
    }

    /// Returns the account owning `identifier` if `secret` matches its hash.
    ///
    /// # Errors
    /// - `AuthError::InvalidCredentials` for an unknown identifier or a
    ///   wrong secret
    /// - Database errors from the account lookup
    pub async fn verify(&self, identifier: &str, secret: &str) -> Result<Account, AppError> {
        let normalized = identifier.trim().to_lowercase();
        let account = self.accounts.find_by_identifier(&normalized).await?;

        let digest = account
            .as_ref()
            .map_or(self.dummy_hash.as_str(), |a| a.password_hash.as_str());
        let matches = self.check(secret, digest);

        match account {
            Some(account) if matches => {
                tracing::debug!(account_id = %account.id, "Credentials verified");
                Ok(account)
            }
            _ => Err(AppError::Auth(AuthError::InvalidCredentials)),
        }
    }

    fn check(&self, secret: &str, digest: &str) -> bool {
        match self.hasher.verify(secret, digest) {
            Ok(matches) => matches,
            Err(e) => {
                // Unparseable stored hash. Treat as a mismatch.
                tracing::error!(error = %e, "Stored password hash could not be verified");
                false
            }
        }
    }
}
