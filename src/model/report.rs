use std::path::PathBuf;

use crate::error::Error;

/// Descriptions of the changes a dry run would have made.
///
/// Owned by the caller of a pass and filled in by the replacer.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DryRunChanges(Vec<String>);

impl DryRunChanges {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, change: impl Into<String>) {
        self.0.push(change.into());
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// Take every recorded change, leaving the list empty
    pub fn drain(&mut self) -> Vec<String> {
        std::mem::take(&mut self.0)
    }
}

/// How a single replace or restore attempt ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The swap was published
    Replaced,
    /// Nothing was touched, the change was recorded in the dry-run list
    DryRun,
    /// The operator declined a step; earlier steps stay in place
    Declined,
    /// The restored copy had the wrong size and was discarded
    SizeMismatch { expected: u64, actual: u64 },
}

/// A file that could not be processed, with the cause
#[derive(Debug)]
pub struct FileFailure {
    pub path: PathBuf,
    pub cause: Error,
}

/// Summary of one replace or undo pass
#[derive(Debug, Default)]
pub struct PassReport {
    /// Files that reached candidate lookup (replace) or eligibility (undo)
    pub examined: usize,
    pub replaced: usize,
    pub dry_run: usize,
    pub declined: usize,
    pub abandoned: usize,
    pub failures: Vec<FileFailure>,
    pub changes: DryRunChanges,
}

impl PassReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Replaced => self.replaced += 1,
            Outcome::DryRun => self.dry_run += 1,
            Outcome::Declined => self.declined += 1,
            Outcome::SizeMismatch { .. } => self.abandoned += 1,
        }
    }

    pub fn record_failure(&mut self, path: impl Into<PathBuf>, cause: Error) {
        self.failures.push(FileFailure {
            path: path.into(),
            cause,
        });
    }

    pub fn succeeded(&self) -> usize {
        self.replaced + self.dry_run
    }

    pub fn failed(&self) -> usize {
        self.failures.len()
    }

    /// Fold another pass into this one
    pub fn merge(&mut self, mut other: PassReport) {
        self.examined += other.examined;
        self.replaced += other.replaced;
        self.dry_run += other.dry_run;
        self.declined += other.declined;
        self.abandoned += other.abandoned;
        self.failures.append(&mut other.failures);
        for change in other.changes.drain() {
            self.changes.push(change);
        }
    }
}
