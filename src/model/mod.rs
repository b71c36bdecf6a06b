mod catalog;
mod change;
mod file;
mod report;

pub use catalog::{CatalogEntry, HashEntry, MatchPolicy, TargetDirectory};
pub use change::{ChangeAction, ChangePhase, ChangeRecord, ChangeStep, CHANGELOG_VERSION};
pub use file::{unix_seconds, FileInfo, FileKind};
pub use report::{DryRunChanges, FileFailure, Outcome, PassReport};
