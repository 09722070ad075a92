//! Destination adapters: the push side of a transfer.

pub mod appwrite;
pub mod local;

use async_trait::async_trait;

use crate::config::DestinationConfig;
use crate::error::{Error, Result};
use crate::log::Log;
use crate::progress::Progress;
use crate::report::CheckReport;
use crate::resources::{
    Database, Document, FileResource, Function, Resource, ResourceBatch, ResourceKind, User,
};
use crate::transfer::TransferState;

pub use appwrite::AppwriteDestination;
pub use local::LocalDestination;

/// What a destination sees of the run while importing one batch.
///
/// Item outcomes are recorded against the batch's kind unless a method names
/// another one.
pub struct ImportContext<'a> {
    kind: ResourceKind,
    state: &'a mut TransferState,
}

impl<'a> ImportContext<'a> {
    /// Creates a context for a batch of `kind`.
    pub fn new(kind: ResourceKind, state: &'a mut TransferState) -> Self {
        Self { kind, state }
    }

    /// Kind of the batch.
    #[must_use]
    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    /// Records a transferred item.
    pub fn succeeded(&mut self) {
        self.succeeded_as(self.kind);
    }

    /// Records a transferred item under `kind`.
    pub fn succeeded_as(&mut self, kind: ResourceKind) {
        self.state.counters.entry(kind).current += 1;
    }

    /// Records an item the destination rejected.
    pub fn failed(&mut self, resource: &(impl Resource + ?Sized), message: impl Into<String>) {
        self.failed_as(self.kind, resource, message);
    }

    /// Records a rejected item under `kind`.
    pub fn failed_as(
        &mut self,
        kind: ResourceKind,
        resource: &(impl Resource + ?Sized),
        message: impl Into<String>,
    ) {
        self.state.counters.entry(kind).failed += 1;
        self.state.logs.push(Log::error(message).about(resource));
    }

    /// Records an item deliberately left out.
    pub fn skipped(&mut self, resource: &(impl Resource + ?Sized), message: impl Into<String>) {
        self.state.counters.entry(self.kind).skipped += 1;
        self.state.logs.push(Log::warning(message).about(resource));
    }

    /// Raises the total of a kind carried inside another, e.g. collections.
    pub fn add_total(&mut self, kind: ResourceKind, count: u64) {
        self.state.counters.entry(kind).total += count;
    }

    /// Appends a log entry without touching counters.
    pub fn log(&mut self, log: Log) {
        self.state.logs.push(log);
    }
}

/// Push side of a transfer.
///
/// An import handles every item of its batch: a rejected item is recorded
/// through [`ImportContext::failed`] and the next item is attempted. Only
/// run-level failures (lost connectivity, unwritable staging) are returned.
#[async_trait]
pub trait Destination: Send {
    /// Adapter name.
    fn name(&self) -> &'static str;

    /// Kinds this destination accepts.
    fn supported_resources(&self) -> &'static [ResourceKind];

    /// Probes readiness for `resources`.
    async fn check(&mut self, resources: &[ResourceKind]) -> Result<CheckReport>;

    /// Imports users.
    async fn import_users(&mut self, users: Vec<User>, ctx: &mut ImportContext<'_>) -> Result<()> {
        let _ = (users, ctx);
        Err(Error::unsupported_operation(self.name(), "import_users"))
    }

    /// Imports databases with their collections.
    async fn import_databases(
        &mut self,
        databases: Vec<Database>,
        ctx: &mut ImportContext<'_>,
    ) -> Result<()> {
        let _ = (databases, ctx);
        Err(Error::unsupported_operation(self.name(), "import_databases"))
    }

    /// Imports documents.
    async fn import_documents(
        &mut self,
        documents: Vec<Document>,
        ctx: &mut ImportContext<'_>,
    ) -> Result<()> {
        let _ = (documents, ctx);
        Err(Error::unsupported_operation(self.name(), "import_documents"))
    }

    /// Imports buckets, file metadata and payload chunks.
    async fn import_files(
        &mut self,
        files: Vec<FileResource>,
        ctx: &mut ImportContext<'_>,
    ) -> Result<()> {
        let _ = (files, ctx);
        Err(Error::unsupported_operation(self.name(), "import_files"))
    }

    /// Imports functions.
    async fn import_functions(
        &mut self,
        functions: Vec<Function>,
        ctx: &mut ImportContext<'_>,
    ) -> Result<()> {
        let _ = (functions, ctx);
        Err(Error::unsupported_operation(self.name(), "import_functions"))
    }

    /// Imports one batch, then reports the kind's progress exactly once.
    ///
    /// # Errors
    ///
    /// Returns run-level failures of the matching import; no progress is
    /// reported in that case.
    async fn import_batch(
        &mut self,
        batch: ResourceBatch,
        state: &mut TransferState,
        on_progress: &mut (dyn FnMut(Progress) + Send),
    ) -> Result<()> {
        let kind = batch.kind();
        {
            let mut ctx = ImportContext::new(kind, state);
            match batch {
                ResourceBatch::Users(items) => self.import_users(items, &mut ctx).await?,
                ResourceBatch::Databases(items) => self.import_databases(items, &mut ctx).await?,
                ResourceBatch::Documents(items) => self.import_documents(items, &mut ctx).await?,
                ResourceBatch::Files(items) => self.import_files(items, &mut ctx).await?,
                ResourceBatch::Functions(items) => self.import_functions(items, &mut ctx).await?,
            }
        }
        on_progress(state.counters.snapshot(kind));
        Ok(())
    }
}

/// Creates a destination from configuration.
///
/// # Errors
///
/// Returns an error if the destination cannot be set up, e.g. an unwritable
/// staging path or an invalid endpoint.
pub fn create_destination(config: &DestinationConfig) -> Result<Box<dyn Destination>> {
    match config {
        DestinationConfig::Local(cfg) => Ok(Box::new(LocalDestination::new(cfg)?)),
        DestinationConfig::Appwrite(cfg) => Ok(Box::new(AppwriteDestination::new(cfg)?)),
    }
}
