//! Portable resource model shared by every source and destination.

pub mod database;
pub mod function;
pub mod storage;
pub mod user;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub use database::{
    Attribute, AttributeKind, Collection, Database, Document, Index, IndexOrder, IndexType,
    DEFAULT_STRING_SIZE,
};
pub use function::Function;
pub use storage::{Bucket, File, FileData, FileResource};
pub use user::{Hash, HashAlgorithm, User, UserType};

/// The closed set of transferable resource kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ResourceKind {
    /// Identity records.
    Users,
    /// Databases (carry their collections).
    Databases,
    /// Collections, always transferred inside their database.
    Collections,
    /// Documents (rows).
    Documents,
    /// Buckets, file metadata and file payloads.
    Files,
    /// Serverless functions.
    Functions,
}

impl ResourceKind {
    /// Every kind, in declaration order.
    pub const ALL: [ResourceKind; 6] = [
        Self::Users,
        Self::Databases,
        Self::Collections,
        Self::Documents,
        Self::Files,
        Self::Functions,
    ];

    /// Kinds that are transferred as their own stage, in processing order.
    ///
    /// Documents come after Databases because document export resolves rows
    /// against cached collections.
    pub const TRANSFER_ORDER: [ResourceKind; 5] = [
        Self::Users,
        Self::Databases,
        Self::Documents,
        Self::Files,
        Self::Functions,
    ];

    /// Label used in staged output and reports.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Users => "Users",
            Self::Databases => "Databases",
            Self::Collections => "Collections",
            Self::Documents => "Documents",
            Self::Files => "Files",
            Self::Functions => "Functions",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceKind {
    type Err = crate::error::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| crate::error::Error::Config(format!("Unknown resource kind '{}'", s)))
    }
}

/// Common surface of every transferable entity.
pub trait Resource {
    /// Identifier of the resource.
    fn id(&self) -> &str;

    /// Label of the entity type, e.g. `"User"`.
    fn name(&self) -> &'static str;
}

/// One page of exported resources, as handed from a source to a destination.
#[derive(Debug, Clone)]
pub enum ResourceBatch {
    /// A page of users.
    Users(Vec<User>),
    /// A page of databases.
    Databases(Vec<Database>),
    /// A page of documents.
    Documents(Vec<Document>),
    /// A page of buckets, file metadata or file chunks.
    Files(Vec<FileResource>),
    /// A page of functions.
    Functions(Vec<Function>),
}

impl ResourceBatch {
    /// Resource kind carried by this batch.
    #[must_use]
    pub const fn kind(&self) -> ResourceKind {
        match self {
            Self::Users(_) => ResourceKind::Users,
            Self::Databases(_) => ResourceKind::Databases,
            Self::Documents(_) => ResourceKind::Documents,
            Self::Files(_) => ResourceKind::Files,
            Self::Functions(_) => ResourceKind::Functions,
        }
    }

    /// Number of items in the batch.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Users(items) => items.len(),
            Self::Databases(items) => items.len(),
            Self::Documents(items) => items.len(),
            Self::Files(items) => items.len(),
            Self::Functions(items) => items.len(),
        }
    }

    /// Whether the batch holds no items.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl From<Vec<User>> for ResourceBatch {
    fn from(items: Vec<User>) -> Self {
        Self::Users(items)
    }
}

impl From<Vec<Database>> for ResourceBatch {
    fn from(items: Vec<Database>) -> Self {
        Self::Databases(items)
    }
}

impl From<Vec<Document>> for ResourceBatch {
    fn from(items: Vec<Document>) -> Self {
        Self::Documents(items)
    }
}

impl From<Vec<FileResource>> for ResourceBatch {
    fn from(items: Vec<FileResource>) -> Self {
        Self::Files(items)
    }
}

impl From<Vec<Function>> for ResourceBatch {
    fn from(items: Vec<Function>) -> Self {
        Self::Functions(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resource_kind_serializes_as_label() {
        let json = serde_json::to_string(&ResourceKind::Documents).unwrap();
        assert_eq!(json, "\"Documents\"");
        let parsed: ResourceKind = serde_json::from_str("\"Functions\"").unwrap();
        assert_eq!(parsed, ResourceKind::Functions);
    }

    #[test]
    fn test_resource_kind_from_str_is_case_insensitive() {
        assert_eq!("users".parse::<ResourceKind>().unwrap(), ResourceKind::Users);
        assert_eq!(
            "DATABASES".parse::<ResourceKind>().unwrap(),
            ResourceKind::Databases
        );
        assert!("teams".parse::<ResourceKind>().is_err());
    }

    #[test]
    fn test_transfer_order_skips_collections() {
        assert!(!ResourceKind::TRANSFER_ORDER.contains(&ResourceKind::Collections));
        let databases = ResourceKind::TRANSFER_ORDER
            .iter()
            .position(|k| *k == ResourceKind::Databases);
        let documents = ResourceKind::TRANSFER_ORDER
            .iter()
            .position(|k| *k == ResourceKind::Documents);
        assert!(databases < documents);
    }

    #[test]
    fn test_batch_kind_and_len() {
        let batch = ResourceBatch::from(vec![Function::new("f1", "Resize", "node-18.0")]);
        assert_eq!(batch.kind(), ResourceKind::Functions);
        assert_eq!(batch.len(), 1);
        assert!(ResourceBatch::Users(Vec::new()).is_empty());
    }
}
