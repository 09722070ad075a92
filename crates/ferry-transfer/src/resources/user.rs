//! Users and password hashes.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use super::Resource;

/// Authentication method a user can sign in with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserType {
    /// Email + password.
    Email,
    /// Phone number.
    Phone,
    /// No credential at all.
    Anonymous,
}

impl UserType {
    /// Derives the type set from the credentials a user actually holds.
    ///
    /// No hash and no phone is exactly `{Anonymous}`; a non-empty hash adds
    /// `Email`, a non-empty phone adds `Phone`.
    #[must_use]
    pub fn derive(password_hash: Option<&Hash>, phone: &str) -> BTreeSet<UserType> {
        let has_hash = password_hash.is_some_and(|h| !h.hash.is_empty());
        let has_phone = !phone.is_empty();

        let mut types = BTreeSet::new();
        if !has_hash && !has_phone {
            types.insert(Self::Anonymous);
            return types;
        }
        if has_hash {
            types.insert(Self::Email);
        }
        if has_phone {
            types.insert(Self::Phone);
        }
        types
    }
}

/// Password hashing scheme of a migrated credential.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum HashAlgorithm {
    /// Standard scrypt with explicit cost parameters.
    Scrypt,
    /// Firebase-style modified scrypt (salt separator + signer key).
    ScryptModified,
    /// bcrypt modular-crypt string.
    Bcrypt,
    /// Argon2 PHC string.
    Argon2,
    /// Unsalted SHA-256.
    Sha256,
    /// phpass portable hash.
    Phpass,
}

impl HashAlgorithm {
    /// Whether the scheme cannot be verified without a salt.
    #[must_use]
    pub const fn requires_salt(self) -> bool {
        matches!(self, Self::Scrypt | Self::ScryptModified)
    }
}

/// A password hash carried verbatim from the origin backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Hash {
    /// Hashing scheme.
    pub algorithm: HashAlgorithm,
    /// Hash material exactly as stored by the origin.
    pub hash: String,
    /// Salt, for salted schemes.
    #[serde(default)]
    pub salt: Option<String>,
    /// Salt separator (modified scrypt).
    #[serde(default)]
    pub separator: Option<String>,
    /// Signer key (modified scrypt).
    #[serde(default)]
    pub signing_key: Option<String>,
    /// scrypt CPU/memory cost.
    #[serde(default = "default_cpu")]
    pub cpu: u32,
    /// scrypt memory cost.
    #[serde(default = "default_memory")]
    pub memory: u32,
    /// scrypt parallelization.
    #[serde(default = "default_parallel")]
    pub parallel: u32,
    /// scrypt derived key length.
    #[serde(default = "default_key_length")]
    pub key_length: u32,
}

fn default_cpu() -> u32 {
    8
}

fn default_memory() -> u32 {
    14
}

fn default_parallel() -> u32 {
    1
}

fn default_key_length() -> u32 {
    64
}

impl Hash {
    /// Creates an unsalted hash with default scrypt parameters.
    pub fn new(algorithm: HashAlgorithm, hash: impl Into<String>) -> Self {
        Self {
            algorithm,
            hash: hash.into(),
            salt: None,
            separator: None,
            signing_key: None,
            cpu: default_cpu(),
            memory: default_memory(),
            parallel: default_parallel(),
            key_length: default_key_length(),
        }
    }

    /// Sets the salt.
    #[must_use]
    pub fn with_salt(mut self, salt: impl Into<String>) -> Self {
        self.salt = Some(salt.into());
        self
    }

    /// Sets the modified-scrypt separator and signer key.
    #[must_use]
    pub fn with_signer(mut self, separator: impl Into<String>, signing_key: impl Into<String>) -> Self {
        self.separator = Some(separator.into());
        self.signing_key = Some(signing_key.into());
        self
    }

    /// Sets the scrypt cost parameters.
    #[must_use]
    pub fn with_cost(mut self, cpu: u32, memory: u32, parallel: u32, key_length: u32) -> Self {
        self.cpu = cpu;
        self.memory = memory;
        self.parallel = parallel;
        self.key_length = key_length;
        self
    }
}

/// An identity record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// User id.
    pub id: String,
    /// Email address.
    #[serde(default)]
    pub email: String,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Password hash, if the user has a password.
    #[serde(default)]
    pub password_hash: Option<Hash>,
    /// Phone number.
    #[serde(default)]
    pub phone: String,
    /// Sign-in methods.
    #[serde(default)]
    pub types: BTreeSet<UserType>,
    /// Username.
    #[serde(default)]
    pub username: String,
    /// Email verified flag.
    #[serde(default)]
    pub email_verified: bool,
    /// Phone verified flag.
    #[serde(default)]
    pub phone_verified: bool,
    /// Disabled flag.
    #[serde(default)]
    pub disabled: bool,
    /// Team/organisation memberships.
    #[serde(default)]
    pub memberships: Vec<String>,
}

impl User {
    /// Creates a user whose types are derived from `password_hash` and `phone`.
    pub fn new(
        id: impl Into<String>,
        email: impl Into<String>,
        name: impl Into<String>,
        password_hash: Option<Hash>,
        phone: impl Into<String>,
    ) -> Self {
        let phone = phone.into();
        let types = UserType::derive(password_hash.as_ref(), &phone);
        Self {
            id: id.into(),
            email: email.into(),
            name: name.into(),
            password_hash,
            phone,
            types,
            username: String::new(),
            email_verified: false,
            phone_verified: false,
            disabled: false,
            memberships: Vec::new(),
        }
    }

    /// Whether `user_type` is one of the user's sign-in methods.
    #[must_use]
    pub fn has_type(&self, user_type: UserType) -> bool {
        self.types.contains(&user_type)
    }
}

impl Resource for User {
    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &'static str {
        "User"
    }
}
