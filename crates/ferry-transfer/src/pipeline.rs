//! Transfer pipeline: configuration in, statistics out.

use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use crate::config::MigrationConfig;
use crate::destinations::{create_destination, Destination};
use crate::error::{Error, Result};
use crate::log::{Log, LogLevel};
use crate::progress::Progress;
use crate::report::CheckReport;
use crate::resources::ResourceKind;
use crate::sources::{create_source, Source};
use crate::transfer::Transfer;

/// Transfer statistics.
#[derive(Debug, Default, Clone)]
pub struct MigrationStats {
    /// Final counters per kind.
    pub progress: Vec<Progress>,
    /// Every log entry of the run.
    pub logs: Vec<Log>,
    /// Number of ERROR entries.
    pub errors: usize,
    /// Number of WARNING entries.
    pub warnings: usize,
    /// Duration in seconds.
    pub duration_secs: f64,
    /// Whether only the checks ran.
    pub dry_run: bool,
}

impl MigrationStats {
    /// Items transferred across all kinds.
    #[must_use]
    pub fn transferred(&self) -> u64 {
        self.progress.iter().map(|p| p.current).sum()
    }

    /// Items that failed across all kinds.
    #[must_use]
    pub fn failed(&self) -> u64 {
        self.progress.iter().map(|p| p.failed).sum()
    }

    /// Calculate throughput (items per second).
    #[must_use]
    pub fn throughput(&self) -> f64 {
        if self.duration_secs > 0.0 {
            self.transferred() as f64 / self.duration_secs
        } else {
            0.0
        }
    }
}

/// Transfer pipeline.
pub struct Pipeline {
    config: MigrationConfig,
    source: Box<dyn Source>,
    destination: Box<dyn Destination>,
    progress_bar: bool,
}

impl Pipeline {
    /// Create a new pipeline from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if either adapter cannot be created.
    pub fn new(config: MigrationConfig) -> Result<Self> {
        let source = create_source(&config.source, &config.options)?;
        let destination = create_destination(&config.destination)?;
        Ok(Self::with_adapters(config, source, destination))
    }

    /// Create a pipeline over prepared adapters.
    #[must_use]
    pub fn with_adapters(
        config: MigrationConfig,
        source: Box<dyn Source>,
        destination: Box<dyn Destination>,
    ) -> Self {
        Self {
            config,
            source,
            destination,
            progress_bar: false,
        }
    }

    /// Draws a terminal progress bar while running.
    #[must_use]
    pub fn with_progress_bar(mut self, enabled: bool) -> Self {
        self.progress_bar = enabled;
        self
    }

    /// Kinds this run transfers.
    ///
    /// An empty `resources` option selects every kind both ends support.
    #[must_use]
    pub fn resources(&self) -> Vec<ResourceKind> {
        if !self.config.options.resources.is_empty() {
            return self.config.options.resources.clone();
        }
        let source = self.source.supported_resources();
        let destination = self.destination.supported_resources();
        ResourceKind::ALL
            .into_iter()
            .filter(|kind| source.contains(kind) && destination.contains(kind))
            .collect()
    }

    /// Checks both ends for the selected kinds.
    ///
    /// # Errors
    ///
    /// Returns an error if a check itself fails, e.g. an unwritable staging path.
    pub async fn check(&mut self) -> Result<(CheckReport, CheckReport)> {
        let resources = self.resources();
        let source = self.source.check(&resources).await?;
        let destination = self.destination.check(&resources).await?;
        Ok((source, destination))
    }

    /// Run the pipeline.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Connectivity`] if either end reports problems, and any
    /// fatal error raised during the transfer.
    pub async fn run(&mut self) -> Result<MigrationStats> {
        let start = std::time::Instant::now();
        let resources = self.resources();

        info!(
            source = self.source.name(),
            destination = self.destination.name(),
            resources = ?resources,
            "Starting transfer pipeline"
        );

        // capability errors come before any probe touches either end
        Transfer::new(&mut *self.source).plan_into(&resources, &*self.destination)?;

        let (source_report, destination_report) = self.check().await?;
        if !source_report.is_ready() {
            return Err(Error::Connectivity(format!(
                "{} source is not ready: {}",
                self.source.name(),
                source_report
            )));
        }
        if !destination_report.is_ready() {
            return Err(Error::Connectivity(format!(
                "{} destination is not ready: {}",
                self.destination.name(),
                destination_report
            )));
        }

        if self.config.options.dry_run {
            info!("Dry run mode - both ends are ready, nothing transferred");
            return Ok(MigrationStats {
                duration_secs: start.elapsed().as_secs_f64(),
                dry_run: true,
                ..MigrationStats::default()
            });
        }

        let bar = self.progress_bar.then(create_progress_bar);
        let mut on_progress = |progress: Progress| {
            if let Some(bar) = &bar {
                bar.set_length(progress.total.max(progress.processed()));
                bar.set_position(progress.processed());
                bar.set_message(progress.resource.to_string());
            }
        };

        let options = &self.config.options;
        let mut transfer = Transfer::new(&mut *self.source)
            .with_batch_size(options.batch_size)
            .with_file_batch_size(options.file_batch_size);
        transfer
            .run_into(&resources, &mut *self.destination, &mut on_progress)
            .await?;
        let report = transfer.into_report();

        if let Some(bar) = &bar {
            bar.finish_with_message("Transfer complete");
        }

        let stats = MigrationStats {
            errors: report.error_count(),
            warnings: report.warning_count(),
            progress: report.progress,
            logs: report.logs,
            duration_secs: start.elapsed().as_secs_f64(),
            dry_run: false,
        };

        info!(
            transferred = stats.transferred(),
            failed = stats.failed(),
            errors = stats.errors,
            warnings = stats.warnings,
            "Transfer complete in {:.2}s ({:.0} items/sec)",
            stats.duration_secs,
            stats.throughput()
        );

        Ok(stats)
    }
}

fn create_progress_bar() -> ProgressBar {
    let pb = ProgressBar::new(0);
    pb.set_style(
        ProgressStyle::default_bar()
            .template(
                "{spinner:.green} [{elapsed_precise}] {msg:>12} [{bar:40.cyan/blue}] {pos}/{len}",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-"),
    );
    pb
}

/// Log entries of `level`, for summaries.
pub fn logs_at(stats: &MigrationStats, level: LogLevel) -> impl Iterator<Item = &Log> {
    stats.logs.iter().filter(move |log| log.level == level)
}
