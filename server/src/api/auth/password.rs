//! Password hashing
//!
//! Stored format is `hex(salt):hex(sha256(salt || password))` with a random
//! 16-byte salt per credential. Verification is constant-time over the hex
//! digests.

use crate::utils::crypto::{constant_time_eq, generate_key, sha256_hex};

const SALT_LEN: usize = 16;

/// Hash a password with a fresh random salt
pub fn hash_password(password: &str) -> String {
    let salt = generate_key(SALT_LEN);
    let digest = salted_digest(&salt, password);
    format!("{}:{}", hex::encode(salt), digest)
}

/// Verify a password against a stored hash. Malformed stored values fail
/// closed.
pub fn verify_password(password: &str, stored: &str) -> bool {
    let Some((salt_hex, digest_hex)) = stored.split_once(':') else {
        return false;
    };
    let Ok(salt) = hex::decode(salt_hex) else {
        return false;
    };
    constant_time_eq(&salted_digest(&salt, password), digest_hex)
}

fn salted_digest(salt: &[u8], password: &str) -> String {
    let mut input = Vec::with_capacity(salt.len() + password.len());
    input.extend_from_slice(salt);
    input.extend_from_slice(password.as_bytes());
    sha256_hex(&input)
}
