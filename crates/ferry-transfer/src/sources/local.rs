//! Local source: replays a staging directory written by the local destination.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::AsyncReadExt;
use tracing::debug;

use super::{ExportContext, Source};
use crate::error::Result;
use crate::log::Log;
use crate::report::CheckReport;
use crate::resources::{Document, File, FileData, FileResource, ResourceKind};
use crate::staging::{StagedFile, StagedOutput, StagingArea};

const SUPPORTED: &[ResourceKind] = &[
    ResourceKind::Users,
    ResourceKind::Databases,
    ResourceKind::Collections,
    ResourceKind::Documents,
    ResourceKind::Files,
    ResourceKind::Functions,
];

/// Default size of one file payload chunk (5 MiB).
pub const DEFAULT_FILE_CHUNK_SIZE: usize = 5 * 1024 * 1024;

/// Configuration for the local source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalSourceConfig {
    /// Staging directory containing `backup.json`.
    pub path: PathBuf,
}

/// Reads resources back from a staging directory.
pub struct LocalSource {
    area: StagingArea,
    chunk_size: usize,
    output: Option<Arc<StagedOutput>>,
}

impl LocalSource {
    /// Creates a source over `config.path`. Nothing is read until first use.
    #[must_use]
    pub fn new(config: &LocalSourceConfig) -> Self {
        Self {
            area: StagingArea::new(&config.path),
            chunk_size: DEFAULT_FILE_CHUNK_SIZE,
            output: None,
        }
    }

    /// Sets the size of file payload chunks.
    #[must_use]
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    async fn output(&mut self) -> Result<Arc<StagedOutput>> {
        if let Some(output) = &self.output {
            return Ok(Arc::clone(output));
        }
        let output = Arc::new(self.area.load().await?);
        self.output = Some(Arc::clone(&output));
        Ok(output)
    }

    /// Streams a file's sidecar as payload chunks.
    async fn export_payload(&self, file: &Arc<File>, ctx: &mut ExportContext<'_>) -> Result<()> {
        let path = self.area.sidecar_path(&file.file_name)?;
        let mut reader = match tokio::fs::File::open(&path).await {
            Ok(reader) => reader,
            Err(e) => {
                ctx.log(
                    Log::error(format!("Cannot read payload {}: {}", path.display(), e))
                        .about(file.as_ref()),
                );
                return Ok(());
            }
        };

        loop {
            let mut chunk = Vec::with_capacity(self.chunk_size);
            let read = (&mut reader)
                .take(self.chunk_size as u64)
                .read_to_end(&mut chunk)
                .await?;
            if read == 0 {
                break;
            }
            debug!(file = %file.id, bytes = read, "Read payload chunk");
            ctx.emit(vec![FileResource::Data(FileData::new(Arc::clone(file), chunk))])
                .await?;
        }
        Ok(())
    }
}

#[async_trait]
impl Source for LocalSource {
    fn name(&self) -> &'static str {
        "Local"
    }

    fn supported_resources(&self) -> &'static [ResourceKind] {
        SUPPORTED
    }

    async fn check(&mut self, resources: &[ResourceKind]) -> Result<CheckReport> {
        let mut report = CheckReport::new(resources);
        let readable = self.area.load().await.err();
        for kind in resources {
            if let Some(e) = &readable {
                report.add(*kind, format!("Failed to read staged backup. Error: {}", e));
            }
        }
        if resources.contains(&ResourceKind::Documents)
            && !resources.contains(&ResourceKind::Databases)
        {
            report.add(
                ResourceKind::Documents,
                "Documents resource requires Databases resource to be enabled.",
            );
        }
        if resources.contains(&ResourceKind::Files) && !self.area.files_dir().is_dir() {
            report.add(
                ResourceKind::Files,
                format!("Missing payload directory {}", self.area.files_dir().display()),
            );
        }
        Ok(report)
    }

    async fn export_users(&mut self, batch_size: usize, ctx: &mut ExportContext<'_>) -> Result<()> {
        let output = self.output().await?;
        ctx.set_total(output.count(ctx.kind()) as u64);
        for page in output.users.chunks(batch_size) {
            ctx.emit(page.to_vec()).await?;
        }
        Ok(())
    }

    async fn export_databases(
        &mut self,
        batch_size: usize,
        ctx: &mut ExportContext<'_>,
    ) -> Result<()> {
        let output = self.output().await?;
        ctx.set_total(output.count(ctx.kind()) as u64);
        for page in output.databases.chunks(batch_size) {
            ctx.emit(page.to_vec()).await?;
        }
        Ok(())
    }

    async fn export_documents(
        &mut self,
        batch_size: usize,
        ctx: &mut ExportContext<'_>,
    ) -> Result<()> {
        let output = self.output().await?;
        ctx.set_total(output.count(ctx.kind()) as u64);

        for page in output.documents.chunks(batch_size) {
            let mut documents = Vec::with_capacity(page.len());
            for staged in page {
                match ctx.collection(&staged.database_id, &staged.collection_id) {
                    Some(collection) => documents.push(Document::new(
                        staged.id.clone(),
                        staged.database_id.clone(),
                        collection,
                        staged.data.clone(),
                    )),
                    None => ctx.fail(
                        Log::error(format!(
                            "Collection '{}' of database '{}' was not exported",
                            staged.collection_id, staged.database_id
                        ))
                        .about_id("Document", staged.id.clone()),
                    ),
                }
            }
            ctx.emit(documents).await?;
        }
        Ok(())
    }

    async fn export_files(&mut self, batch_size: usize, ctx: &mut ExportContext<'_>) -> Result<()> {
        let output = self.output().await?;
        ctx.set_total(output.count(ctx.kind()) as u64);

        for page in output.files.chunks(batch_size) {
            let mut metadata = Vec::with_capacity(page.len());
            let mut files = Vec::new();
            for entry in page {
                match entry {
                    StagedFile::Bucket(bucket) => metadata.push(FileResource::Bucket(bucket.clone())),
                    StagedFile::File(file) => {
                        let file = Arc::new(file.clone());
                        files.push(Arc::clone(&file));
                        metadata.push(FileResource::File(file));
                    }
                }
            }
            ctx.emit(metadata).await?;

            for file in &files {
                self.export_payload(file, ctx).await?;
            }
        }
        Ok(())
    }

    async fn export_functions(
        &mut self,
        batch_size: usize,
        ctx: &mut ExportContext<'_>,
    ) -> Result<()> {
        let output = self.output().await?;
        ctx.set_total(output.count(ctx.kind()) as u64);
        for page in output.functions.chunks(batch_size) {
            ctx.emit(page.to_vec()).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "local_tests.rs"]
mod tests;
