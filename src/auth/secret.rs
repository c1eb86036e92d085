//! Secret hashing, fixed-time comparison and credential generation.

use base64::{Engine as _, engine::general_purpose};
use rand::{RngCore, rngs::OsRng};
use sha2::{Digest, Sha256};
use std::io;
use subtle::ConstantTimeEq;

use crate::models::access_key::Secret;

const KEY_ID_BYTES: usize = 20;
const SECRET_BYTES: usize = 32;

/// SHA-256 of the secret, standard base64. This is what `access_keys.secret_hash` stores.
pub fn hash_secret(secret: &str) -> String {
    let digest = Sha256::digest(secret.as_bytes());
    general_purpose::STANDARD.encode(digest)
}

/// Byte comparison whose running time does not depend on where the inputs differ.
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.ct_eq(b).into()
}

/// Compare a digest from [`hash_secret`] against a stored hash.
pub fn hash_matches(presented_hash: &str, stored_hash: &str) -> bool {
    constant_time_eq(presented_hash.as_bytes(), stored_hash.as_bytes())
}

/// Check a presented secret against a stored hash.
pub fn verify_secret(secret: &str, stored_hash: &str) -> bool {
    hash_matches(&hash_secret(secret), stored_hash)
}

/// Fresh key id and secret from the OS RNG, both URL-safe base64.
pub fn generate_credentials() -> io::Result<(String, Secret)> {
    let mut rng = OsRng;

    let mut key_id = [0u8; KEY_ID_BYTES];
    rng.try_fill_bytes(&mut key_id)?;

    let mut secret = [0u8; SECRET_BYTES];
    rng.try_fill_bytes(&mut secret)?;

    Ok((
        general_purpose::URL_SAFE.encode(key_id),
        Secret::new(general_purpose::URL_SAFE.encode(secret)),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_is_deterministic_base64_sha256() {
        // sha256("") in base64
        assert_eq!(hash_secret(""), "47DEQpj8HBSa+/TImW+5JCeuQeRkm5NMpJWZG3hSuFU=");
        assert_eq!(hash_secret("abc"), hash_secret("abc"));
        assert_ne!(hash_secret("abc"), hash_secret("abd"));
    }

    #[test]
    fn verify_accepts_only_matching_secret() {
        let stored = hash_secret("hunter2");
        assert!(verify_secret("hunter2", &stored));
        assert!(!verify_secret("hunter3", &stored));
        assert!(!verify_secret("", &stored));
        assert!(!verify_secret("hunter2", ""));
    }

    #[test]
    fn precomputed_digest_matches_stored_hash() {
        let stored = hash_secret("hunter2");
        assert!(hash_matches(&hash_secret("hunter2"), &stored));
        assert!(!hash_matches(&hash_secret("hunter3"), &stored));
        assert!(!hash_matches("hunter2", &stored));
    }

    #[test]
    fn constant_time_eq_handles_lengths() {
        assert!(constant_time_eq(b"abc123", b"abc123"));
        assert!(!constant_time_eq(b"abc123", b"abc124"));
        assert!(!constant_time_eq(b"xbc123", b"abc123"));
        assert!(!constant_time_eq(b"abc", b"abcd"));
    }

    #[test]
    fn generated_credentials_are_unique_and_well_formed() {
        let (id_a, secret_a) = generate_credentials().unwrap();
        let (id_b, secret_b) = generate_credentials().unwrap();
        assert_ne!(id_a, id_b);
        assert_ne!(secret_a, secret_b);
        assert_eq!(id_a.len(), 28);
        assert_eq!(secret_a.expose().len(), 44);
        assert!(!id_a.contains(':'));
        assert_ne!(id_a, "admin");
    }
}
