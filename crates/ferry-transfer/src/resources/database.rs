//! Databases, collections, attributes, indexes and documents.

use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};
use std::sync::Arc;

use super::Resource;

/// Default size of a string attribute when the origin declares no limit (10 MiB).
pub const DEFAULT_STRING_SIZE: u64 = 10_485_760;

/// Type-specific part of an [`Attribute`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum AttributeKind {
    /// Boolean.
    Bool,
    /// Integer, optionally bounded.
    Int {
        /// Lower bound (`None` = unbounded).
        min: Option<i64>,
        /// Upper bound (`None` = unbounded).
        max: Option<i64>,
    },
    /// Floating point, optionally bounded.
    Float {
        /// Lower bound.
        min: Option<f64>,
        /// Upper bound.
        max: Option<f64>,
    },
    /// String with a maximum size in bytes.
    String {
        /// Maximum size.
        size: u64,
    },
    /// Date and time.
    DateTime,
}

/// A typed field of a collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attribute {
    /// Field key.
    pub key: String,
    /// Whether a value is mandatory.
    #[serde(default)]
    pub required: bool,
    /// Whether the field holds a list of values.
    #[serde(default)]
    pub array: bool,
    /// Default value.
    #[serde(default)]
    pub default: Option<Value>,
    /// Variant payload.
    #[serde(flatten)]
    pub kind: AttributeKind,
}

impl Attribute {
    /// Creates an optional, scalar attribute without a default.
    pub fn new(key: impl Into<String>, kind: AttributeKind) -> Self {
        Self {
            key: key.into(),
            required: false,
            array: false,
            default: None,
            kind,
        }
    }

    /// Boolean attribute.
    pub fn boolean(key: impl Into<String>) -> Self {
        Self::new(key, AttributeKind::Bool)
    }

    /// Integer attribute with optional bounds.
    pub fn integer(key: impl Into<String>, min: Option<i64>, max: Option<i64>) -> Self {
        Self::new(key, AttributeKind::Int { min, max })
    }

    /// Unbounded float attribute.
    pub fn float(key: impl Into<String>) -> Self {
        Self::new(
            key,
            AttributeKind::Float {
                min: None,
                max: None,
            },
        )
    }

    /// String attribute of `size` bytes.
    pub fn string(key: impl Into<String>, size: u64) -> Self {
        Self::new(key, AttributeKind::String { size })
    }

    /// Date-time attribute.
    pub fn datetime(key: impl Into<String>) -> Self {
        Self::new(key, AttributeKind::DateTime)
    }

    /// Sets `required`.
    #[must_use]
    pub fn required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    /// Sets `array`.
    #[must_use]
    pub fn array(mut self, array: bool) -> Self {
        self.array = array;
        self
    }

    /// Sets the default value.
    #[must_use]
    pub fn with_default(mut self, default: Option<Value>) -> Self {
        self.default = default;
        self
    }

    /// Whether values of this attribute are date-times.
    #[must_use]
    pub const fn is_datetime(&self) -> bool {
        matches!(self.kind, AttributeKind::DateTime)
    }
}

/// Index flavour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexType {
    /// Plain lookup index.
    Key,
    /// Unique constraint.
    Unique,
    /// Full-text index.
    Fulltext,
}

impl IndexType {
    /// Wire label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Key => "key",
            Self::Unique => "unique",
            Self::Fulltext => "fulltext",
        }
    }
}

/// Per-attribute sort direction of an index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum IndexOrder {
    /// Ascending (default).
    #[default]
    Asc,
    /// Descending.
    Desc,
}

/// An index over one or more attributes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Index {
    /// Index id.
    pub id: String,
    /// Index name.
    pub name: String,
    /// Index flavour.
    #[serde(rename = "type")]
    pub index_type: IndexType,
    /// Indexed attribute keys.
    pub attributes: Vec<String>,
    /// Sort order, aligned with `attributes`.
    pub orders: Vec<IndexOrder>,
}

/// A table-like container of documents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Collection {
    /// Collection id.
    pub id: String,
    /// Collection name.
    pub name: String,
    /// Attributes in declaration order.
    #[serde(default)]
    pub attributes: Vec<Attribute>,
    /// Indexes.
    #[serde(default)]
    pub indexes: Vec<Index>,
}

impl Collection {
    /// Creates an empty collection.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            attributes: Vec::new(),
            indexes: Vec::new(),
        }
    }

    /// Looks up an attribute by key.
    #[must_use]
    pub fn attribute(&self, key: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.key == key)
    }
}

impl Resource for Collection {
    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &'static str {
        "Collection"
    }
}

/// A database and its collections.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Database {
    /// Database id.
    pub id: String,
    /// Database name.
    pub name: String,
    /// Collections in export order.
    #[serde(default)]
    pub collections: Vec<Arc<Collection>>,
}

impl Database {
    /// Creates an empty database.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            collections: Vec::new(),
        }
    }

    /// Looks up a collection by id.
    #[must_use]
    pub fn collection(&self, id: &str) -> Option<&Arc<Collection>> {
        self.collections.iter().find(|c| c.id == id)
    }
}

impl Resource for Database {
    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &'static str {
        "Database"
    }
}

/// A single record of a collection.
///
/// The collection is shared with the cached schema; it serializes as its id.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    /// Document id (`unique()` lets the destination assign one).
    pub id: String,
    /// Owning database id.
    pub database_id: String,
    /// Owning collection.
    #[serde(rename = "collectionId", serialize_with = "serialize_collection_id")]
    pub collection: Arc<Collection>,
    /// Attribute values keyed by attribute key.
    pub data: Map<String, Value>,
}

fn serialize_collection_id<S: Serializer>(
    collection: &Arc<Collection>,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_str(&collection.id)
}

impl Document {
    /// Id that asks the destination to generate one.
    pub const UNIQUE_ID: &'static str = "unique()";

    /// Creates a document.
    pub fn new(
        id: impl Into<String>,
        database_id: impl Into<String>,
        collection: Arc<Collection>,
        data: Map<String, Value>,
    ) -> Self {
        Self {
            id: id.into(),
            database_id: database_id.into(),
            collection,
            data,
        }
    }
}

impl Resource for Document {
    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &'static str {
        "Document"
    }
}
