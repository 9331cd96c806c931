/// Authentication module
///
/// Credential verification, password hashing, and issuance, resolution
/// and revocation of opaque bearer tokens.

mod credentials;
mod issuer;
mod models;
mod password;
mod token;

pub use credentials::CredentialVerifier;
pub use issuer::TokenIssuer;
pub use models::{AccessToken, Account, AccountSummary, CurrentToken, IssuedToken};
pub use password::{BcryptHasher, PasswordHasher};
pub use token::{generate_token, hash_token, parse_bearer};
