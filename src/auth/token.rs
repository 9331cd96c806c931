/// Bearer Token Material
///
/// Bearer tokens are:
/// - 64 alphanumeric characters drawn from the thread-local CSPRNG
///   (roughly 381 bits of entropy)
/// - Hashed with SHA-256 before storage, never stored in plaintext
/// - Looked up by digest, so comparison never touches the plaintext

use rand::distributions::Alphanumeric;
use rand::{thread_rng, Rng};
use sha2::{Digest, Sha256};

pub const TOKEN_LENGTH: usize = 64;

/// Generate a new plaintext bearer token
pub fn generate_token() -> String {
    thread_rng()
        .sample_iter(&Alphanumeric)
        .take(TOKEN_LENGTH)
        .map(char::from)
        .collect()
}

/// SHA-256 hex digest of a plaintext token
pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Pulls the token out of an `Authorization: Bearer <token>` header value.
/// The scheme is matched case-insensitively.
pub fn parse_bearer(header: &str) -> Option<&str> {
    let (scheme, token) = header.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }

    let token = token.trim();
    if token.is_empty() {
        None
    } else {
        Some(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_token() {
        let token = generate_token();

        assert_eq!(token.len(), TOKEN_LENGTH);
        assert!(token.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn test_tokens_are_distinct() {
        assert_ne!(generate_token(), generate_token());
    }

    #[test]
    fn test_token_hashing() {
        let token = generate_token();
        let hash1 = hash_token(&token);
        let hash2 = hash_token(&token);

        assert_eq!(hash1, hash2);
        assert_ne!(token, hash1);
        assert_eq!(hash1.len(), 64);
    }

    #[test]
    fn test_known_digest() {
        assert_eq!(
            hash_token("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_parse_bearer() {
        assert_eq!(parse_bearer("Bearer abc123"), Some("abc123"));
        assert_eq!(parse_bearer("bearer abc123"), Some("abc123"));
        assert_eq!(parse_bearer("Basic abc123"), None);
        assert_eq!(parse_bearer("Bearer "), None);
        assert_eq!(parse_bearer("Bearer"), None);
    }
}
