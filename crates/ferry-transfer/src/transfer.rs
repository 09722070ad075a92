//! Transfer orchestration.
//!
//! A [`Transfer`] drives one [`Source`] through the requested resource kinds
//! in a fixed order. Each exported batch is recorded in the schema cache and
//! handed to a [`TransferSink`], usually a [`DestinationSink`] that imports it
//! before the source fetches the next page.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{info, info_span, Instrument};
use uuid::Uuid;

use crate::destinations::Destination;
use crate::error::{Error, Result};
use crate::log::{Log, LogBook};
use crate::progress::{CounterRegistry, Progress};
use crate::report::TransferReport;
use crate::resources::{Collection, Database, ResourceBatch, ResourceKind};
use crate::sources::{ExportContext, Source};

/// Default page size for every kind except files.
pub const DEFAULT_BATCH_SIZE: usize = 100;

/// Default page size for files.
pub const DEFAULT_FILE_BATCH_SIZE: usize = 5;

/// Schema resources retained across stages.
///
/// Only databases (with their collections) are kept; everything else is
/// forwarded and dropped.
#[derive(Debug, Clone, Default)]
pub struct ResourceCache {
    databases: Vec<Database>,
}

impl ResourceCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached databases in export order.
    #[must_use]
    pub fn databases(&self) -> &[Database] {
        &self.databases
    }

    /// Appends exported databases.
    pub fn extend(&mut self, databases: impl IntoIterator<Item = Database>) {
        self.databases.extend(databases);
    }

    /// Resolves a collection by database and collection id.
    #[must_use]
    pub fn collection(&self, database_id: &str, collection_id: &str) -> Option<Arc<Collection>> {
        self.databases
            .iter()
            .find(|db| db.id == database_id)
            .and_then(|db| db.collection(collection_id))
            .cloned()
    }

    /// Whether nothing is cached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.databases.is_empty()
    }
}

/// Everything a run accumulates: schema cache, counters and log.
///
/// Owned by the [`Transfer`] and lent to one batch at a time.
#[derive(Debug, Default)]
pub struct TransferState {
    /// Schema cache.
    pub cache: ResourceCache,
    /// Per-kind counters.
    pub counters: CounterRegistry,
    /// Log entries.
    pub logs: LogBook,
}

impl TransferState {
    /// Creates an empty state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

/// Receiver of exported batches.
#[async_trait]
pub trait TransferSink: Send {
    /// Handles one batch; it is fully processed before the next is exported.
    async fn on_batch(&mut self, batch: ResourceBatch, state: &mut TransferState) -> Result<()>;
}

/// Sink that imports every batch into a [`Destination`] and reports progress.
pub struct DestinationSink<'a> {
    destination: &'a mut dyn Destination,
    on_progress: &'a mut (dyn FnMut(Progress) + Send),
}

impl<'a> DestinationSink<'a> {
    /// Wraps `destination`; `on_progress` receives one snapshot per batch.
    pub fn new(
        destination: &'a mut dyn Destination,
        on_progress: &'a mut (dyn FnMut(Progress) + Send),
    ) -> Self {
        Self {
            destination,
            on_progress,
        }
    }
}

#[async_trait]
impl TransferSink for DestinationSink<'_> {
    async fn on_batch(&mut self, batch: ResourceBatch, state: &mut TransferState) -> Result<()> {
        self.destination
            .import_batch(batch, state, &mut *self.on_progress)
            .await
    }
}

/// One transfer run.
pub struct Transfer<'a> {
    source: &'a mut dyn Source,
    state: TransferState,
    batch_size: usize,
    file_batch_size: usize,
    run_id: Uuid,
}

impl<'a> Transfer<'a> {
    /// Creates a run reading from `source` with default page sizes.
    pub fn new(source: &'a mut dyn Source) -> Self {
        Self {
            source,
            state: TransferState::new(),
            batch_size: DEFAULT_BATCH_SIZE,
            file_batch_size: DEFAULT_FILE_BATCH_SIZE,
            run_id: Uuid::new_v4(),
        }
    }

    /// Sets the page size for every kind except files.
    #[must_use]
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Sets the page size for files.
    #[must_use]
    pub fn with_file_batch_size(mut self, file_batch_size: usize) -> Self {
        self.file_batch_size = file_batch_size.max(1);
        self
    }

    /// Starts from an existing state, e.g. a cache filled by an earlier run.
    #[must_use]
    pub fn with_state(mut self, state: TransferState) -> Self {
        self.state = state;
        self
    }

    /// Run identifier.
    #[must_use]
    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Accumulated state.
    #[must_use]
    pub fn state(&self) -> &TransferState {
        &self.state
    }

    /// Validates `resources` and returns the stages to run, in order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedResource`] if the source does not offer a
    /// requested kind, and [`Error::MissingDependency`] if documents are
    /// requested without databases while the cache is empty.
    pub fn plan(&self, resources: &[ResourceKind]) -> Result<Vec<ResourceKind>> {
        let supported = self.source.supported_resources();
        if let Some(kind) = resources.iter().find(|k| !supported.contains(k)) {
            return Err(Error::UnsupportedResource {
                adapter: self.source.name().to_string(),
                resource: *kind,
            });
        }

        let stages: Vec<ResourceKind> = ResourceKind::TRANSFER_ORDER
            .into_iter()
            .filter(|kind| resources.contains(kind))
            .collect();

        if stages.contains(&ResourceKind::Documents)
            && !stages.contains(&ResourceKind::Databases)
            && self.state.cache.is_empty()
        {
            return Err(Error::MissingDependency {
                resource: ResourceKind::Documents,
                requires: ResourceKind::Databases,
            });
        }
        Ok(stages)
    }

    /// Like [`Transfer::plan`], but also requires `destination` to accept
    /// every requested kind.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedResource`] naming the destination if it
    /// lacks a requested kind, then any error from [`Transfer::plan`].
    pub fn plan_into(
        &self,
        resources: &[ResourceKind],
        destination: &dyn Destination,
    ) -> Result<Vec<ResourceKind>> {
        let supported = destination.supported_resources();
        if let Some(kind) = resources.iter().find(|k| !supported.contains(k)) {
            return Err(Error::UnsupportedResource {
                adapter: destination.name().to_string(),
                resource: *kind,
            });
        }
        self.plan(resources)
    }

    /// Exports `resources` into `sink`.
    ///
    /// Nothing is exported when validation fails.
    ///
    /// # Errors
    ///
    /// Returns validation errors from [`Transfer::plan`] and any fatal error
    /// raised by the source or the sink.
    pub async fn run(
        &mut self,
        resources: &[ResourceKind],
        sink: &mut dyn TransferSink,
    ) -> Result<()> {
        let stages = self.plan(resources)?;
        let span = info_span!("transfer", run_id = %self.run_id, source = self.source.name());
        self.run_stages(&stages, sink).instrument(span).await
    }

    /// Exports `resources` and imports them into `destination`.
    ///
    /// # Errors
    ///
    /// Additionally returns [`Error::UnsupportedResource`] if the destination
    /// does not accept a requested kind.
    pub async fn run_into(
        &mut self,
        resources: &[ResourceKind],
        destination: &mut dyn Destination,
        on_progress: &mut (dyn FnMut(Progress) + Send),
    ) -> Result<()> {
        self.plan_into(resources, destination)?;
        let mut sink = DestinationSink::new(destination, on_progress);
        self.run(resources, &mut sink).await
    }

    async fn run_stages(
        &mut self,
        stages: &[ResourceKind],
        sink: &mut dyn TransferSink,
    ) -> Result<()> {
        let source = &mut *self.source;
        let state = &mut self.state;

        for kind in stages.iter().copied() {
            info!(resource = %kind, "Exporting");
            let mut ctx = ExportContext::new(kind, state, &mut *sink);
            match kind {
                ResourceKind::Users => source.export_users(self.batch_size, &mut ctx).await?,
                ResourceKind::Databases => {
                    source.export_databases(self.batch_size, &mut ctx).await?;
                }
                ResourceKind::Documents => {
                    source.export_documents(self.batch_size, &mut ctx).await?;
                }
                ResourceKind::Files => source.export_files(self.file_batch_size, &mut ctx).await?,
                ResourceKind::Functions => {
                    source.export_functions(self.batch_size, &mut ctx).await?;
                }
                ResourceKind::Collections => {}
            }

            let counters = state.counters.get(kind);
            info!(
                resource = %kind,
                total = counters.total,
                current = counters.current,
                failed = counters.failed,
                skipped = counters.skipped,
                "Stage complete"
            );
            state.logs.push(Log::success(format!(
                "{}: {} transferred, {} failed, {} skipped",
                kind, counters.current, counters.failed, counters.skipped
            )));
        }
        Ok(())
    }

    /// Snapshot of the outcome so far.
    #[must_use]
    pub fn report(&self) -> TransferReport {
        TransferReport {
            run_id: self.run_id,
            progress: self.state.counters.snapshots(),
            logs: self.state.logs.entries().to_vec(),
        }
    }

    /// Consumes the run, returning its outcome.
    #[must_use]
    pub fn into_report(self) -> TransferReport {
        TransferReport {
            run_id: self.run_id,
            progress: self.state.counters.snapshots(),
            logs: self.state.logs.into_entries(),
        }
    }
}

#[cfg(test)]
#[path = "transfer_tests.rs"]
mod tests;
