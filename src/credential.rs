//! Password hashing.
//!
//! Secrets are stored as bcrypt hashes (salt and cost embedded in the
//! stored string). Plaintext secrets never reach the store.

use bcrypt::{hash, verify, BcryptError};
use tracing::warn;

#[cfg(not(test))]
const HASH_COST: u32 = bcrypt::DEFAULT_COST;
#[cfg(test)]
const HASH_COST: u32 = 4;

/// Hash `secret` with a fresh random salt.
pub fn hash_password(secret: &str) -> Result<String, BcryptError> {
    hash(secret, HASH_COST)
}

/// Check `secret` against a value produced by [`hash_password`].
///
/// A stored value that is not a bcrypt hash never verifies.
pub fn verify_password(secret: &str, stored: &str) -> bool {
    match verify(secret, stored) {
        Ok(valid) => valid,
        Err(e) => {
            warn!(error = %e, "stored credential is not a valid bcrypt hash");
            false
        }
    }
}
