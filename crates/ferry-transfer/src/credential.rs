//! Password-hash migration.
//!
//! A migrated credential is never re-hashed: [`import_password_user`] picks the
//! destination's creation call for the hash's algorithm and passes the stored
//! material through untouched.

use async_trait::async_trait;

use crate::error::{Error, Result};
use crate::resources::{Hash, HashAlgorithm, User};

/// scrypt parameters forwarded with a standard scrypt hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScryptParams<'a> {
    /// Salt.
    pub salt: &'a str,
    /// CPU/memory cost.
    pub cpu: u32,
    /// Memory cost.
    pub memory: u32,
    /// Parallelization.
    pub parallel: u32,
    /// Derived key length.
    pub key_length: u32,
}

/// Modified-scrypt parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScryptModifiedParams<'a> {
    /// Salt.
    pub salt: &'a str,
    /// Salt separator.
    pub separator: &'a str,
    /// Signer key.
    pub signing_key: &'a str,
}

/// Destination-side user creation, one operation per hash algorithm.
#[async_trait]
pub trait HashedUserCreator: Send + Sync {
    /// Creates a user from a bcrypt hash.
    async fn create_bcrypt_user(&self, user: &User, hash: &str) -> Result<()>;

    /// Creates a user from an Argon2 hash.
    async fn create_argon2_user(&self, user: &User, hash: &str) -> Result<()>;

    /// Creates a user from a SHA hash of the given `version` (e.g. `sha256`).
    async fn create_sha_user(&self, user: &User, hash: &str, version: &str) -> Result<()>;

    /// Creates a user from a phpass hash.
    async fn create_phpass_user(&self, user: &User, hash: &str) -> Result<()>;

    /// Creates a user from a standard scrypt hash.
    async fn create_scrypt_user(&self, user: &User, hash: &str, params: ScryptParams<'_>)
        -> Result<()>;

    /// Creates a user from a modified scrypt hash.
    async fn create_scrypt_modified_user(
        &self,
        user: &User,
        hash: &str,
        params: ScryptModifiedParams<'_>,
    ) -> Result<()>;
}

/// Creates `user` through the creation call matching its hash algorithm.
///
/// # Errors
///
/// Returns [`Error::InvalidCredential`] when the hash is missing or empty, or
/// when a salted scheme has no salt. Errors from the creator are passed on.
pub async fn import_password_user(
    creator: &(impl HashedUserCreator + ?Sized),
    user: &User,
) -> Result<()> {
    let hash = validate(user)?;
    let material = hash.hash.as_str();

    match hash.algorithm {
        HashAlgorithm::Bcrypt => creator.create_bcrypt_user(user, material).await,
        HashAlgorithm::Argon2 => creator.create_argon2_user(user, material).await,
        HashAlgorithm::Sha256 => creator.create_sha_user(user, material, "sha256").await,
        HashAlgorithm::Phpass => creator.create_phpass_user(user, material).await,
        HashAlgorithm::Scrypt => {
            let params = ScryptParams {
                salt: hash.salt.as_deref().unwrap_or_default(),
                cpu: hash.cpu,
                memory: hash.memory,
                parallel: hash.parallel,
                key_length: hash.key_length,
            };
            creator.create_scrypt_user(user, material, params).await
        }
        HashAlgorithm::ScryptModified => {
            let params = ScryptModifiedParams {
                salt: hash.salt.as_deref().unwrap_or_default(),
                separator: hash.separator.as_deref().unwrap_or_default(),
                signing_key: hash.signing_key.as_deref().unwrap_or_default(),
            };
            creator
                .create_scrypt_modified_user(user, material, params)
                .await
        }
    }
}

fn validate(user: &User) -> Result<&Hash> {
    let hash = user
        .password_hash
        .as_ref()
        .filter(|h| !h.hash.is_empty())
        .ok_or_else(|| Error::invalid_credential(&user.id, "password hash is empty"))?;

    if hash.algorithm.requires_salt() && hash.salt.as_deref().unwrap_or_default().is_empty() {
        return Err(Error::invalid_credential(
            &user.id,
            format!("{:?} hash requires a salt", hash.algorithm),
        ));
    }
    Ok(hash)
}
