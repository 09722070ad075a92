//! Configuration types for ferry-transfer.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::destinations::appwrite::AppwriteConfig;
use crate::destinations::local::LocalDestinationConfig;
use crate::error::{Error, Result};
use crate::http::validate_endpoint;
use crate::resources::ResourceKind;
use crate::sources::local::{LocalSourceConfig, DEFAULT_FILE_CHUNK_SIZE};
use crate::sources::nhost::NHostConfig;
use crate::transfer::{DEFAULT_BATCH_SIZE, DEFAULT_FILE_BATCH_SIZE};

/// Main transfer configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationConfig {
    /// Where resources are read from.
    pub source: SourceConfig,
    /// Where resources are written to.
    pub destination: DestinationConfig,
    /// Transfer options.
    #[serde(default)]
    pub options: MigrationOptions,
}

/// Source backend, selected by `type`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SourceConfig {
    /// NHost project (Postgres).
    #[serde(rename = "nhost")]
    NHost(NHostConfig),
    /// Staging directory written by a previous run.
    #[serde(rename = "local")]
    Local(LocalSourceConfig),
}

/// Destination backend, selected by `type`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum DestinationConfig {
    /// Staging directory.
    #[serde(rename = "local")]
    Local(LocalDestinationConfig),
    /// Appwrite project.
    #[serde(rename = "appwrite")]
    Appwrite(AppwriteConfig),
}

/// Transfer options.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationOptions {
    /// Page size for every kind except files.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Page size for files.
    #[serde(default = "default_file_batch_size")]
    pub file_batch_size: usize,
    /// Size of one file payload chunk in bytes.
    #[serde(default = "default_file_chunk_size")]
    pub file_chunk_size: usize,
    /// Kinds to transfer (empty = everything both ends support).
    #[serde(default)]
    pub resources: Vec<ResourceKind>,
    /// Check both ends without transferring anything.
    #[serde(default)]
    pub dry_run: bool,
}

impl Default for MigrationOptions {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            file_batch_size: default_file_batch_size(),
            file_chunk_size: default_file_chunk_size(),
            resources: Vec::new(),
            dry_run: false,
        }
    }
}

fn default_batch_size() -> usize {
    DEFAULT_BATCH_SIZE
}

fn default_file_batch_size() -> usize {
    DEFAULT_FILE_BATCH_SIZE
}

fn default_file_chunk_size() -> usize {
    DEFAULT_FILE_CHUNK_SIZE
}

impl MigrationConfig {
    /// Load configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &std::path::Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn validate(&self) -> Result<()> {
        let options = &self.options;
        for (name, value) in [
            ("batch_size", options.batch_size),
            ("file_batch_size", options.file_batch_size),
            ("file_chunk_size", options.file_chunk_size),
        ] {
            if value == 0 {
                return Err(Error::Config(format!("{} must be greater than 0", name)));
            }
        }

        let mut seen = BTreeSet::new();
        if let Some(kind) = options.resources.iter().find(|kind| !seen.insert(**kind)) {
            return Err(Error::Config(format!("resource '{}' is listed twice", kind)));
        }

        match &self.source {
            SourceConfig::NHost(cfg) => {
                if cfg.host.is_empty() {
                    return Err(Error::Config("source host cannot be empty".to_string()));
                }
            }
            SourceConfig::Local(cfg) => {
                if cfg.path.as_os_str().is_empty() {
                    return Err(Error::Config("source path cannot be empty".to_string()));
                }
            }
        }

        match &self.destination {
            DestinationConfig::Local(cfg) => {
                if cfg.path.as_os_str().is_empty() {
                    return Err(Error::Config("destination path cannot be empty".to_string()));
                }
            }
            DestinationConfig::Appwrite(cfg) => {
                validate_endpoint(&cfg.endpoint)?;
                if cfg.project.is_empty() {
                    return Err(Error::Config("Appwrite project cannot be empty".to_string()));
                }
            }
        }
        Ok(())
    }
}
