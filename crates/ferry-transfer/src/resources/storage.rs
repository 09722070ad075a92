//! Buckets, files and file payload chunks.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::Resource;

/// A storage container.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bucket {
    /// Bucket id.
    pub id: String,
    /// Bucket name.
    pub name: String,
    /// Maximum accepted file size in bytes (0 = backend default).
    #[serde(default)]
    pub maximum_file_size: u64,
    /// Accepted file extensions (empty = any).
    #[serde(default)]
    pub allowed_file_extensions: Vec<String>,
    /// Whether uploads are compressed.
    #[serde(default)]
    pub compression: bool,
    /// Whether uploads are encrypted at rest.
    #[serde(default)]
    pub encryption: bool,
    /// Whether the bucket accepts operations.
    #[serde(default = "default_true")]
    pub enabled: bool,
}

fn default_true() -> bool {
    true
}

impl Bucket {
    /// Creates an enabled bucket with backend defaults.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            maximum_file_size: 0,
            allowed_file_extensions: Vec::new(),
            compression: false,
            encryption: false,
            enabled: true,
        }
    }
}

impl Resource for Bucket {
    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &'static str {
        "Bucket"
    }
}

/// File metadata; the payload travels separately as [`FileData`] chunks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct File {
    /// File id.
    pub id: String,
    /// Owning bucket id.
    pub bucket_id: String,
    /// Original file name.
    pub file_name: String,
    /// Size in bytes.
    #[serde(default)]
    pub size: u64,
    /// MIME type.
    #[serde(default)]
    pub mime_type: String,
    /// Content signature reported by the origin, if any.
    #[serde(default)]
    pub signature: Option<String>,
}

impl File {
    /// Creates file metadata.
    pub fn new(
        id: impl Into<String>,
        bucket_id: impl Into<String>,
        file_name: impl Into<String>,
        size: u64,
        mime_type: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            bucket_id: bucket_id.into(),
            file_name: file_name.into(),
            size,
            mime_type: mime_type.into(),
            signature: None,
        }
    }
}

impl Resource for File {
    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &'static str {
        "File"
    }
}

/// One chunk of a file's payload.
#[derive(Debug, Clone, PartialEq)]
pub struct FileData {
    /// File the chunk belongs to.
    pub file: Arc<File>,
    /// Raw bytes.
    pub chunk: Vec<u8>,
}

impl FileData {
    /// Creates a chunk for `file`.
    pub fn new(file: Arc<File>, chunk: Vec<u8>) -> Self {
        Self { file, chunk }
    }
}

impl Resource for FileData {
    fn id(&self) -> &str {
        &self.file.id
    }

    fn name(&self) -> &'static str {
        "FileData"
    }
}

/// Anything that travels in a Files batch.
#[derive(Debug, Clone, PartialEq)]
pub enum FileResource {
    /// A bucket.
    Bucket(Bucket),
    /// File metadata.
    File(Arc<File>),
    /// A payload chunk.
    Data(FileData),
}

impl FileResource {
    /// The resource behind the variant.
    #[must_use]
    pub fn as_resource(&self) -> &dyn Resource {
        match self {
            Self::Bucket(bucket) => bucket,
            Self::File(file) => file.as_ref(),
            Self::Data(data) => data,
        }
    }
}
