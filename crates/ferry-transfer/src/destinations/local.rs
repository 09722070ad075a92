//! Local destination: stages every resource under a directory on disk.
//!
//! Resources accumulate in memory and `backup.json` is rewritten after every
//! batch, so an interrupted run leaves the last complete batch on disk.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use super::{Destination, ImportContext};
use crate::error::{Error, Result};
use crate::report::CheckReport;
use crate::resources::{
    Database, Document, FileData, FileResource, Function, ResourceKind, User,
};
use crate::staging::{StagedDocument, StagedFile, StagedOutput, StagingArea};

const SUPPORTED: &[ResourceKind] = &[
    ResourceKind::Users,
    ResourceKind::Databases,
    ResourceKind::Collections,
    ResourceKind::Documents,
    ResourceKind::Files,
    ResourceKind::Functions,
];

/// Configuration for the local destination.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalDestinationConfig {
    /// Staging directory.
    pub path: PathBuf,
}

/// Writes resources to a staging directory.
pub struct LocalDestination {
    area: StagingArea,
    output: StagedOutput,
}

impl LocalDestination {
    /// Creates the staging directories. A previous `backup.json` is replaced
    /// on the first saved batch.
    ///
    /// # Errors
    ///
    /// Returns an error if the directories cannot be created.
    pub fn new(config: &LocalDestinationConfig) -> Result<Self> {
        let area = StagingArea::new(&config.path);
        area.create_dirs().map_err(|e| {
            Error::Connectivity(format!(
                "Cannot create staging directory {}: {}",
                config.path.display(),
                e
            ))
        })?;
        Ok(Self {
            area,
            output: StagedOutput::default(),
        })
    }

    async fn save(&self) -> Result<()> {
        self.area.save(&self.output).await?;
        debug!(path = %self.area.backup_path().display(), "Saved staged output");
        Ok(())
    }

    async fn append_chunk(&self, data: &FileData) -> Result<()> {
        let path = self.area.sidecar_path(&data.file.file_name)?;
        let mut sidecar = OpenOptions::new().create(true).append(true).open(path).await?;
        sidecar.write_all(&data.chunk).await?;
        sidecar.flush().await?;
        Ok(())
    }

    async fn reset_sidecar(&self, file_name: &str) -> Result<()> {
        tokio::fs::File::create(self.area.sidecar_path(file_name)?).await?;
        Ok(())
    }
}

#[async_trait]
impl Destination for LocalDestination {
    fn name(&self) -> &'static str {
        "Local"
    }

    fn supported_resources(&self) -> &'static [ResourceKind] {
        SUPPORTED
    }

    async fn check(&mut self, resources: &[ResourceKind]) -> Result<CheckReport> {
        let path = self.area.backup_path();
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .map_err(|e| {
                Error::Connectivity(format!("Cannot write to {}: {}", path.display(), e))
            })?;
        Ok(CheckReport::new(resources))
    }

    async fn import_users(&mut self, users: Vec<User>, ctx: &mut ImportContext<'_>) -> Result<()> {
        for user in users {
            self.output.users.push(user);
            ctx.succeeded();
        }
        self.save().await
    }

    async fn import_databases(
        &mut self,
        databases: Vec<Database>,
        ctx: &mut ImportContext<'_>,
    ) -> Result<()> {
        for database in databases {
            let collections = database.collections.len() as u64;
            ctx.add_total(ResourceKind::Collections, collections);
            for _ in 0..collections {
                ctx.succeeded_as(ResourceKind::Collections);
            }
            self.output.databases.push(database);
            ctx.succeeded();
        }
        self.save().await
    }

    async fn import_documents(
        &mut self,
        documents: Vec<Document>,
        ctx: &mut ImportContext<'_>,
    ) -> Result<()> {
        for document in &documents {
            self.output.documents.push(StagedDocument::from(document));
            ctx.succeeded();
        }
        self.save().await
    }

    async fn import_files(
        &mut self,
        files: Vec<FileResource>,
        ctx: &mut ImportContext<'_>,
    ) -> Result<()> {
        for item in files {
            match item {
                FileResource::Bucket(bucket) => {
                    self.output.files.push(StagedFile::Bucket(bucket));
                    ctx.succeeded();
                }
                FileResource::File(file) => match self.reset_sidecar(&file.file_name).await {
                    Ok(()) => {
                        self.output.files.push(StagedFile::File(file.as_ref().clone()));
                        ctx.succeeded();
                    }
                    Err(e) => ctx.failed(file.as_ref(), e.to_string()),
                },
                FileResource::Data(data) => {
                    if let Err(e) = self.append_chunk(&data).await {
                        ctx.failed(&data, e.to_string());
                    }
                }
            }
        }
        self.save().await
    }

    async fn import_functions(
        &mut self,
        functions: Vec<Function>,
        ctx: &mut ImportContext<'_>,
    ) -> Result<()> {
        for function in functions {
            self.output.functions.push(function);
            ctx.succeeded();
        }
        self.save().await
    }
}
