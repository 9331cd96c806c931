/// Account and access token records
///
/// Accounts are created outside this service and are read-only here.
/// Access tokens are created on login and move from active to revoked
/// exactly once.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use uuid::Uuid;

/// A stored account. The password hash never leaves this struct through
/// `Serialize` or `Debug`.
#[derive(Clone)]
pub struct Account {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub password_hash: String,
}

impl Account {
    pub fn summary(&self) -> AccountSummary {
        AccountSummary {
            id: self.id,
            name: self.name.clone(),
            identifier: self.email.clone(),
        }
    }
}

impl fmt::Debug for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Account")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("email", &self.email)
            .field("password_hash", &"<redacted>")
            .finish()
    }
}

/// Public view of an account
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct AccountSummary {
    pub id: Uuid,
    pub name: String,
    pub identifier: String,
}

/// Persisted access token. Only the SHA-256 digest of the plaintext is kept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessToken {
    pub id: Uuid,
    pub account_id: Uuid,
    pub device_label: String,
    pub token_hash: String,
    pub created_at: DateTime<Utc>,
    pub last_used_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
    pub revoked_at: Option<DateTime<Utc>>,
}

impl AccessToken {
    pub fn is_revoked(&self) -> bool {
        self.revoked_at.is_some()
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.map_or(false, |expires_at| expires_at <= now)
    }

    /// Usable for authentication at `now`.
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        !self.is_revoked() && !self.is_expired_at(now)
    }
}

/// Result of a successful `issue`. The plaintext is handed out here and
/// nowhere else.
#[derive(Debug)]
pub struct IssuedToken {
    pub plaintext: String,
    pub token: AccessToken,
}

/// The token presented on the current request, resolved together with its
/// owning account.
#[derive(Debug, Clone)]
pub struct CurrentToken {
    pub token: AccessToken,
    pub account: Account,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn token(expires_at: Option<DateTime<Utc>>, revoked_at: Option<DateTime<Utc>>) -> AccessToken {
        AccessToken {
            id: Uuid::new_v4(),
            account_id: Uuid::new_v4(),
            device_label: "laptop".to_string(),
            token_hash: "0".repeat(64),
            created_at: Utc::now(),
            last_used_at: None,
            expires_at,
            revoked_at,
        }
    }

    #[test]
    fn test_debug_redacts_password_hash() {
        let account = Account {
            id: Uuid::new_v4(),
            name: "Alice".to_string(),
            email: "alice@example.com".to_string(),
            password_hash: "$2b$04$secretsecretsecret".to_string(),
        };

        let debug = format!("{:?}", account);
        assert!(!debug.contains("secretsecret"));
        assert!(debug.contains("<redacted>"));
    }

    #[test]
    fn test_summary_serializes_identifier() {
        let account = Account {
            id: Uuid::new_v4(),
            name: "Alice".to_string(),
            email: "alice@example.com".to_string(),
            password_hash: "hash".to_string(),
        };

        let json = serde_json::to_value(account.summary()).unwrap();
        assert_eq!(json["identifier"], "alice@example.com");
        assert_eq!(json["name"], "Alice");
        assert!(json.get("password_hash").is_none());
    }

    #[test]
    fn test_token_activity() {
        let now = Utc::now();

        assert!(token(None, None).is_active_at(now));
        assert!(token(Some(now + Duration::minutes(5)), None).is_active_at(now));
        assert!(!token(Some(now - Duration::minutes(5)), None).is_active_at(now));
        assert!(!token(None, Some(now)).is_active_at(now));
    }
}
