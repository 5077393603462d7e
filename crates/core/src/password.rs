//! Password hashing and verification

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use tracing::warn;

use crate::error::{Error, Result};

/// Hash a password into a PHC string
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| Error::PasswordHash(e.to_string()))
}

/// Whether a stored credential is a PHC hash rather than plaintext
pub fn looks_like_hash(stored: &str) -> bool {
    stored.starts_with("$argon2")
}

/// Verify a password against a PHC hash; malformed hashes never verify
pub fn verify_password(password: &str, hash: &str) -> bool {
    let parsed = match PasswordHash::new(hash) {
        Ok(h) => h,
        Err(e) => {
            warn!(error = %e, "Stored password hash is malformed");
            return false;
        }
    };

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

/// Check a password against a stored credential that may still be
/// legacy plaintext.
///
/// Deprecated path: plaintext credentials are compared directly and
/// logged so they get migrated to hashes.
pub fn verify_stored(password: &str, stored: &str, account: &str) -> bool {
    if looks_like_hash(stored) {
        return verify_password(password, stored);
    }

    warn!(
        account = account,
        "Credential is stored as plain text; migrate it to a hash"
    );
    stored == password
}
