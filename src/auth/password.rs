//! Salted and hashed passwords for logging in.

use std::fmt::Display;

use bcrypt::{BcryptError, hash, verify};

use crate::Error;

/// A salted and hashed password.
#[derive(Debug, Clone, PartialEq)]
pub struct PasswordHash(String);

impl PasswordHash {
    /// An alias for the default encryption cost for hashing passwords.
    pub const DEFAULT_COST: u32 = bcrypt::DEFAULT_COST;

    /// Hash `raw_password` with the specified `cost`.
    ///
    /// `cost` increases the rounds of hashing and therefore the time needed to verify a password.
    /// A value of at least 12 is recommended. Pass in [PasswordHash::DEFAULT_COST] to use the
    /// recommended cost.
    ///
    /// # Errors
    ///
    /// Returns [Error::HashingError] if the password could not be hashed.
    pub fn new(raw_password: &str, cost: u32) -> Result<Self, Error> {
        hash(raw_password, cost)
            .map(Self)
            .map_err(|error| Error::HashingError(error.to_string()))
    }

    /// Create a new `PasswordHash` from a hash string loaded from the database.
    ///
    /// The caller should ensure that `raw_password_hash` is a valid bcrypt hash,
    /// otherwise [PasswordHash::verify] will return an error.
    pub fn new_unchecked(raw_password_hash: &str) -> Self {
        Self(raw_password_hash.to_string())
    }

    /// Check that `raw_password` matches the stored password.
    pub fn verify(&self, raw_password: &str) -> Result<bool, BcryptError> {
        verify(raw_password, &self.0)
    }
}

impl Display for PasswordHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::PasswordHash;

    #[test]
    fn hash_verifies_original_password() {
        let hash = PasswordHash::new("s3cret", 4).unwrap();

        assert!(hash.verify("s3cret").unwrap());
        assert!(!hash.verify("not-s3cret").unwrap());
    }

    #[test]
    fn same_password_gets_unique_salt() {
        let hash = PasswordHash::new("s3cret", 4).unwrap();
        let dupe_hash = PasswordHash::new("s3cret", 4).unwrap();

        assert_ne!(hash, dupe_hash);
    }

    #[test]
    fn verify_errors_on_malformed_hash() {
        let hash = PasswordHash::new_unchecked("definitely-not-bcrypt");

        assert!(hash.verify("s3cret").is_err());
    }
}
