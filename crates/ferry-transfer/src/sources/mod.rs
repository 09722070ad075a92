//! Source adapters: the pull side of a transfer.

pub mod local;
pub mod nhost;

use async_trait::async_trait;
use std::sync::Arc;

use crate::config::{MigrationOptions, SourceConfig};
use crate::error::{Error, Result};
use crate::log::{Log, LogBook};
use crate::report::CheckReport;
use crate::resources::{Collection, Database, ResourceBatch, ResourceKind};
use crate::transfer::{TransferSink, TransferState};

pub use local::LocalSource;
pub use nhost::NHostSource;

/// What a source sees of the run while exporting one kind.
///
/// Counter updates apply to the kind being exported. [`ExportContext::emit`]
/// records databases in the cache and hands the batch to the sink; it returns
/// only once the batch has been fully processed.
pub struct ExportContext<'a> {
    kind: ResourceKind,
    state: &'a mut TransferState,
    sink: &'a mut dyn TransferSink,
}

impl<'a> ExportContext<'a> {
    /// Creates a context for exporting `kind`.
    pub fn new(
        kind: ResourceKind,
        state: &'a mut TransferState,
        sink: &'a mut dyn TransferSink,
    ) -> Self {
        Self { kind, state, sink }
    }

    /// Kind being exported.
    #[must_use]
    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    /// Databases exported earlier in the run.
    #[must_use]
    pub fn cached_databases(&self) -> &[Database] {
        self.state.cache.databases()
    }

    /// Resolves a cached collection.
    #[must_use]
    pub fn collection(&self, database_id: &str, collection_id: &str) -> Option<Arc<Collection>> {
        self.state.cache.collection(database_id, collection_id)
    }

    /// Sets the number of items the source will export.
    pub fn set_total(&mut self, total: u64) {
        self.state.counters.entry(self.kind).total = total;
    }

    /// Raises the announced total, for sources that count per container.
    pub fn add_total(&mut self, count: u64) {
        self.state.counters.entry(self.kind).total += count;
    }

    /// Appends a log entry.
    pub fn log(&mut self, log: Log) {
        self.state.logs.push(log);
    }

    /// The run's log book, for conversions that log as they go.
    pub fn logs_mut(&mut self) -> &mut LogBook {
        &mut self.state.logs
    }

    /// Records an item that could not be exported.
    pub fn fail(&mut self, log: Log) {
        self.state.counters.entry(self.kind).failed += 1;
        self.state.logs.push(log);
    }

    /// Hands a page to the sink.
    ///
    /// # Errors
    ///
    /// Returns any fatal error raised while the sink processes the page.
    pub async fn emit(&mut self, batch: impl Into<ResourceBatch> + Send) -> Result<()> {
        let batch = batch.into();
        if let ResourceBatch::Databases(databases) = &batch {
            self.state.cache.extend(databases.iter().cloned());
        }
        self.sink.on_batch(batch, self.state).await
    }
}

/// Pull side of a transfer.
///
/// Each export pages through the origin in pages of at most `batch_size`
/// items and calls [`ExportContext::emit`] once per page before fetching the
/// next. Exports a source does not offer keep the default implementation,
/// which fails with [`Error::UnsupportedOperation`].
#[async_trait]
pub trait Source: Send {
    /// Adapter name.
    fn name(&self) -> &'static str;

    /// Kinds this source can export.
    fn supported_resources(&self) -> &'static [ResourceKind];

    /// Probes readiness for `resources` without changing anything.
    async fn check(&mut self, resources: &[ResourceKind]) -> Result<CheckReport>;

    /// Exports users.
    async fn export_users(&mut self, batch_size: usize, ctx: &mut ExportContext<'_>) -> Result<()> {
        let _ = (batch_size, ctx);
        Err(Error::unsupported_operation(self.name(), "export_users"))
    }

    /// Exports databases with their collections.
    async fn export_databases(
        &mut self,
        batch_size: usize,
        ctx: &mut ExportContext<'_>,
    ) -> Result<()> {
        let _ = (batch_size, ctx);
        Err(Error::unsupported_operation(self.name(), "export_databases"))
    }

    /// Exports documents of every cached collection.
    async fn export_documents(
        &mut self,
        batch_size: usize,
        ctx: &mut ExportContext<'_>,
    ) -> Result<()> {
        let _ = (batch_size, ctx);
        Err(Error::unsupported_operation(self.name(), "export_documents"))
    }

    /// Exports buckets, file metadata and file payloads.
    async fn export_files(&mut self, batch_size: usize, ctx: &mut ExportContext<'_>) -> Result<()> {
        let _ = (batch_size, ctx);
        Err(Error::unsupported_operation(self.name(), "export_files"))
    }

    /// Exports functions.
    async fn export_functions(
        &mut self,
        batch_size: usize,
        ctx: &mut ExportContext<'_>,
    ) -> Result<()> {
        let _ = (batch_size, ctx);
        Err(Error::unsupported_operation(self.name(), "export_functions"))
    }
}

/// Creates a source from configuration.
///
/// # Errors
///
/// Returns an error if the source cannot be built (e.g. a malformed
/// connection string) or its backend support is not compiled in.
pub fn create_source(
    config: &SourceConfig,
    options: &MigrationOptions,
) -> Result<Box<dyn Source>> {
    match config {
        SourceConfig::NHost(cfg) => {
            #[cfg(feature = "postgres")]
            {
                Ok(Box::new(NHostSource::connect(cfg)?))
            }
            #[cfg(not(feature = "postgres"))]
            {
                let _ = cfg;
                Err(Error::Config(
                    "NHost source requires the 'postgres' feature".to_string(),
                ))
            }
        }
        SourceConfig::Local(cfg) => Ok(Box::new(
            LocalSource::new(cfg).with_chunk_size(options.file_chunk_size),
        )),
    }
}
