// Transfer tool - pedantic lints relaxed for CLI ergonomics
#![allow(clippy::pedantic)]

//! # ferry-transfer
//!
//! `ferry-transfer` is a CLI tool and library for moving identity records,
//! database schemas, documents, files and functions from one backend platform
//! to another.
//!
//! ## Supported Adapters
//!
//! | Adapter | Direction | Resources | Notes |
//! |---------|-----------|-----------|-------|
//! | NHost | source | Users, Databases, Collections, Documents | Requires `postgres` feature |
//! | Local | source | all | Replays a staging directory |
//! | Local | destination | all | `backup.json` + `files/` |
//! | Appwrite | destination | Users, Databases, Collections, Documents | REST API |
//!
//! ## Quick Start
//!
//! ```bash
//! ferry-transfer init --source nhost --destination local
//! ferry-transfer check --config transfer.yaml
//! ferry-transfer run --config transfer.yaml
//! ```
//!
//! ## Configuration Example
//!
//! ```yaml
//! source:
//!   type: nhost
//!   host: db.example.com
//!   password: secret
//!
//! destination:
//!   type: local
//!   path: ./staging
//!
//! options:
//!   batch_size: 100
//!   resources: [Users, Databases, Documents]
//! ```
//!
//! ## Library Use
//!
//! A [`Transfer`] pulls from a [`Source`] one page at a time and hands each
//! page to a [`Destination`] before fetching the next. Per-record problems
//! never abort a run; they end up as [`Log`] entries and counter increments
//! in the final [`TransferReport`].

#![warn(missing_docs)]

pub mod config;
pub mod credential;
pub mod destinations;
pub mod error;
pub mod http;
pub mod log;
pub mod pipeline;
pub mod progress;
pub mod report;
pub mod resources;
pub mod retry;
pub mod schema;
pub mod sources;
pub mod sql;
pub mod staging;
pub mod transfer;

#[cfg(test)]
mod testing;

pub use config::{DestinationConfig, MigrationConfig, MigrationOptions, SourceConfig};
pub use destinations::{create_destination, Destination, ImportContext};
pub use error::{Error, Result};
pub use log::{Log, LogBook, LogLevel};
pub use pipeline::{MigrationStats, Pipeline};
pub use progress::{Counters, Progress};
pub use report::{CheckReport, TransferReport};
pub use resources::{ResourceBatch, ResourceKind};
pub use sources::{create_source, ExportContext, Source};
pub use transfer::{Transfer, TransferSink, TransferState};
