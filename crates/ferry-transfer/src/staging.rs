//! Local staging layout.
//!
//! A staging directory holds one `backup.json` with every transferred resource
//! grouped by kind, plus a `files/` directory with one sidecar per file
//! payload:
//!
//! ```text
//! staging/
//! ├── backup.json     {"Users": [...], "Databases": [...], "Documents": [...], ...}
//! └── files/
//!     └── avatar.png
//! ```

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::resources::{Bucket, Database, Document, File, Function, ResourceKind, User};

/// Name of the staged document.
pub const BACKUP_FILE: &str = "backup.json";

/// Name of the payload directory.
pub const FILES_DIR: &str = "files";

/// A document as staged: the collection is referenced by id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StagedDocument {
    /// Document id.
    pub id: String,
    /// Owning database id.
    pub database_id: String,
    /// Owning collection id.
    pub collection_id: String,
    /// Attribute values.
    #[serde(default)]
    pub data: Map<String, Value>,
}

impl From<&Document> for StagedDocument {
    fn from(document: &Document) -> Self {
        Self {
            id: document.id.clone(),
            database_id: document.database_id.clone(),
            collection_id: document.collection.id.clone(),
            data: document.data.clone(),
        }
    }
}

/// An entry of the staged `Files` array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "resource", rename_all = "lowercase")]
pub enum StagedFile {
    /// Bucket metadata.
    Bucket(Bucket),
    /// File metadata; the payload lives in the sidecar.
    File(File),
}

/// Contents of `backup.json`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StagedOutput {
    /// Users.
    #[serde(rename = "Users", default)]
    pub users: Vec<User>,
    /// Databases with their collections.
    #[serde(rename = "Databases", default)]
    pub databases: Vec<Database>,
    /// Documents.
    #[serde(rename = "Documents", default)]
    pub documents: Vec<StagedDocument>,
    /// Buckets and file metadata.
    #[serde(rename = "Files", default)]
    pub files: Vec<StagedFile>,
    /// Functions.
    #[serde(rename = "Functions", default)]
    pub functions: Vec<Function>,
}

impl StagedOutput {
    /// Number of staged entries of `kind`.
    #[must_use]
    pub fn count(&self, kind: ResourceKind) -> usize {
        match kind {
            ResourceKind::Users => self.users.len(),
            ResourceKind::Databases => self.databases.len(),
            ResourceKind::Collections => self.databases.iter().map(|d| d.collections.len()).sum(),
            ResourceKind::Documents => self.documents.len(),
            ResourceKind::Files => self.files.len(),
            ResourceKind::Functions => self.functions.len(),
        }
    }
}

/// Paths of one staging directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagingArea {
    root: PathBuf,
}

impl StagingArea {
    /// Staging area rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Path of `backup.json`.
    #[must_use]
    pub fn backup_path(&self) -> PathBuf {
        self.root.join(BACKUP_FILE)
    }

    /// Path of the payload directory.
    #[must_use]
    pub fn files_dir(&self) -> PathBuf {
        self.root.join(FILES_DIR)
    }

    /// Sidecar path for a file name; only the base name is kept.
    ///
    /// # Errors
    ///
    /// Returns an error if `file_name` has no usable base name (`..`, empty).
    pub fn sidecar_path(&self, file_name: &str) -> Result<PathBuf> {
        let base = Path::new(file_name)
            .file_name()
            .ok_or_else(|| Error::Import(format!("Invalid file name '{}'", file_name)))?;
        Ok(self.files_dir().join(base))
    }

    /// Creates the root and payload directories.
    ///
    /// # Errors
    ///
    /// Returns an error if the directories cannot be created.
    pub fn create_dirs(&self) -> Result<()> {
        fs::create_dir_all(self.files_dir())?;
        Ok(())
    }

    /// Reads `backup.json`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is missing or malformed.
    pub async fn load(&self) -> Result<StagedOutput> {
        let path = self.backup_path();
        let raw = tokio::fs::read(&path).await.map_err(|e| {
            Error::Extraction(format!("Failed to open {}: {}", path.display(), e))
        })?;
        Ok(serde_json::from_slice(&raw)?)
    }

    /// Rewrites `backup.json` atomically (temp file + rename).
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub async fn save(&self, output: &StagedOutput) -> Result<()> {
        let target = self.backup_path();
        let temp = self.root.join(format!("{}.tmp", BACKUP_FILE));
        tokio::fs::write(&temp, serde_json::to_vec_pretty(output)?).await?;
        tokio::fs::rename(&temp, &target).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::{Attribute, Collection};
    use std::sync::Arc;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_save_then_load() {
        let dir = TempDir::new().unwrap();
        let area = StagingArea::new(dir.path());
        area.create_dirs().unwrap();

        let mut collection = Collection::new("t", "t");
        collection
            .attributes
            .push(Attribute::integer("id", None, None));
        let mut database = Database::new("public", "public");
        database.collections.push(Arc::new(collection));

        let output = StagedOutput {
            databases: vec![database],
            files: vec![StagedFile::Bucket(Bucket::new("b1", "Avatars"))],
            ..Default::default()
        };
        area.save(&output).await.unwrap();

        assert!(area.backup_path().exists());
        assert!(!dir.path().join("backup.json.tmp").exists());
        assert_eq!(area.load().await.unwrap(), output);
    }

    #[tokio::test]
    async fn test_layout_uses_labelled_arrays() {
        let dir = TempDir::new().unwrap();
        let area = StagingArea::new(dir.path());
        area.save(&StagedOutput::default()).await.unwrap();

        let raw: Value =
            serde_json::from_str(&fs::read_to_string(area.backup_path()).unwrap()).unwrap();
        for key in ["Users", "Databases", "Documents", "Files", "Functions"] {
            assert!(raw[key].is_array(), "{}", key);
        }
    }

    #[test]
    fn test_staged_file_is_tagged() {
        let entry = StagedFile::File(File::new("f1", "b1", "a.png", 3, "image/png"));
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["resource"], "file");
        assert_eq!(json["bucketId"], "b1");
    }

    #[test]
    fn test_sidecar_keeps_base_name_only() {
        let area = StagingArea::new("/staging");
        assert_eq!(
            area.sidecar_path("nested/dir/avatar.png").unwrap(),
            PathBuf::from("/staging/files/avatar.png")
        );
        assert!(area.sidecar_path("..").is_err());
    }

    #[tokio::test]
    async fn test_load_missing_backup_is_an_extraction_error() {
        let dir = TempDir::new().unwrap();
        let area = StagingArea::new(dir.path());
        let err = area.load().await.unwrap_err();
        assert!(matches!(err, Error::Extraction(_)));
    }
}
