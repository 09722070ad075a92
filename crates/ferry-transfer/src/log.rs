//! Transfer log: an ordered, append-only record of what happened to each resource.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

use crate::resources::Resource;

/// Severity of a [`Log`] entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// A record or schema element was lost.
    Error,
    /// A lossy but safe fallback was applied.
    Warning,
    /// A record was transferred.
    Success,
}

/// The resource a log entry pertains to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogSubject {
    /// Entity label, e.g. `"User"`.
    pub resource: String,
    /// Resource id.
    pub id: String,
}

impl LogSubject {
    /// Captures the label and id of `resource`.
    pub fn of(resource: &(impl Resource + ?Sized)) -> Self {
        Self {
            resource: resource.name().to_string(),
            id: resource.id().to_string(),
        }
    }
}

/// A single log entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Log {
    /// Severity.
    pub level: LogLevel,
    /// Human-readable message.
    pub message: String,
    /// When the entry was recorded.
    pub timestamp: DateTime<Utc>,
    /// What the entry is about.
    pub subject: Option<LogSubject>,
}

impl Log {
    /// Creates an entry stamped with the current time.
    pub fn new(level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
            timestamp: Utc::now(),
            subject: None,
        }
    }

    /// Error entry.
    pub fn error(message: impl Into<String>) -> Self {
        Self::new(LogLevel::Error, message)
    }

    /// Warning entry.
    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(LogLevel::Warning, message)
    }

    /// Success entry.
    pub fn success(message: impl Into<String>) -> Self {
        Self::new(LogLevel::Success, message)
    }

    /// Attaches the resource the entry is about.
    #[must_use]
    pub fn about(mut self, resource: &(impl Resource + ?Sized)) -> Self {
        self.subject = Some(LogSubject::of(resource));
        self
    }

    /// Attaches a subject known only by label and id, for records that
    /// could not be built.
    #[must_use]
    pub fn about_id(mut self, resource: impl Into<String>, id: impl Into<String>) -> Self {
        self.subject = Some(LogSubject {
            resource: resource.into(),
            id: id.into(),
        });
        self
    }
}

/// Append-only sequence of [`Log`] entries.
///
/// Every appended entry is mirrored to `tracing`.
#[derive(Debug, Clone, Default)]
pub struct LogBook {
    entries: Vec<Log>,
}

impl LogBook {
    /// Creates an empty log book.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an entry.
    pub fn push(&mut self, log: Log) {
        let (resource, id) = log
            .subject
            .as_ref()
            .map_or(("", ""), |s| (s.resource.as_str(), s.id.as_str()));
        match log.level {
            LogLevel::Error => error!(resource, id, "{}", log.message),
            LogLevel::Warning => warn!(resource, id, "{}", log.message),
            LogLevel::Success => debug!(resource, id, "{}", log.message),
        }
        self.entries.push(log);
    }

    /// All entries in insertion order.
    #[must_use]
    pub fn entries(&self) -> &[Log] {
        &self.entries
    }

    /// Entries of one level, in insertion order.
    pub fn by_level(&self, level: LogLevel) -> impl Iterator<Item = &Log> {
        self.entries.iter().filter(move |log| log.level == level)
    }

    /// Number of entries of one level.
    #[must_use]
    pub fn count(&self, level: LogLevel) -> usize {
        self.by_level(level).count()
    }

    /// Total number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing was logged.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Consumes the book, returning its entries.
    #[must_use]
    pub fn into_entries(self) -> Vec<Log> {
        self.entries
    }
}
