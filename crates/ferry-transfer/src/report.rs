//! Readiness and outcome reports.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

use crate::log::{Log, LogLevel};
use crate::progress::Progress;
use crate::resources::ResourceKind;

/// Result of an adapter readiness check.
///
/// Every requested kind has an entry; an empty list means the kind is ready.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CheckReport {
    problems: BTreeMap<ResourceKind, Vec<String>>,
}

impl CheckReport {
    /// A report with an empty entry for every requested kind.
    #[must_use]
    pub fn new(resources: &[ResourceKind]) -> Self {
        Self {
            problems: resources.iter().map(|kind| (*kind, Vec::new())).collect(),
        }
    }

    /// Records a problem for `kind`.
    pub fn add(&mut self, kind: ResourceKind, problem: impl Into<String>) {
        self.problems.entry(kind).or_default().push(problem.into());
    }

    /// Problems recorded for `kind`.
    #[must_use]
    pub fn problems(&self, kind: ResourceKind) -> &[String] {
        self.problems.get(&kind).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Whether no problem was recorded.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.problems.values().all(Vec::is_empty)
    }

    /// Every entry, in kind order.
    pub fn iter(&self) -> impl Iterator<Item = (ResourceKind, &[String])> {
        self.problems.iter().map(|(kind, list)| (*kind, list.as_slice()))
    }
}

impl fmt::Display for CheckReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (kind, problems) in self.iter() {
            for problem in problems {
                if !first {
                    f.write_str("; ")?;
                }
                write!(f, "{}: {}", kind, problem)?;
                first = false;
            }
        }
        Ok(())
    }
}

/// Outcome of a transfer run: final counters per kind and every log entry.
#[derive(Debug, Clone, Serialize)]
pub struct TransferReport {
    /// Run identifier.
    pub run_id: Uuid,
    /// Final snapshot of every kind that was touched.
    pub progress: Vec<Progress>,
    /// Log entries in the order they were recorded.
    pub logs: Vec<Log>,
}

impl TransferReport {
    /// Final snapshot for `kind`, if it was touched.
    #[must_use]
    pub fn progress_for(&self, kind: ResourceKind) -> Option<&Progress> {
        self.progress.iter().find(|p| p.resource == kind)
    }

    /// Number of ERROR entries.
    #[must_use]
    pub fn error_count(&self) -> usize {
        self.count(LogLevel::Error)
    }

    /// Number of WARNING entries.
    #[must_use]
    pub fn warning_count(&self) -> usize {
        self.count(LogLevel::Warning)
    }

    fn count(&self, level: LogLevel) -> usize {
        self.logs.iter().filter(|log| log.level == level).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_report_seeds_requested_kinds() {
        let report = CheckReport::new(&[ResourceKind::Users, ResourceKind::Databases]);
        assert!(report.is_ready());
        assert_eq!(report.iter().count(), 2);
        assert!(report.problems(ResourceKind::Users).is_empty());
    }

    #[test]
    fn test_check_report_problem_listing() {
        let mut report = CheckReport::new(&[ResourceKind::Users, ResourceKind::Documents]);
        report.add(ResourceKind::Documents, "requires Databases");

        assert!(!report.is_ready());
        assert_eq!(report.problems(ResourceKind::Documents).len(), 1);
        assert_eq!(report.to_string(), "Documents: requires Databases");
    }

    #[test]
    fn test_transfer_report_counts() {
        let report = TransferReport {
            run_id: Uuid::new_v4(),
            progress: Vec::new(),
            logs: vec![Log::error("a"), Log::warning("b"), Log::warning("c")],
        };
        assert_eq!(report.error_count(), 1);
        assert_eq!(report.warning_count(), 2);
        assert!(report.progress_for(ResourceKind::Users).is_none());
    }
}
