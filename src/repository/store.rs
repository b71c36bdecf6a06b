//! Persistence traits used by the engine
//!
//! Decouples checking and replacing from the database implementation.

use crate::error::Result;
use crate::model::{ChangeAction, HashEntry};

/// Persistent cache of content hashes, keyed by full path
#[allow(async_fn_in_trait)]
pub trait HashStore {
    /// Get the cached entry for a path, if any
    async fn lookup_hash(&self, fullpath: &str) -> Result<Option<HashEntry>>;

    /// Insert or overwrite the entry for `entry.fullpath`
    async fn store_hash(&self, entry: &HashEntry) -> Result<()>;
}

/// Append-only record of every mutation step
#[allow(async_fn_in_trait)]
pub trait ChangeLog {
    /// Append one row. Implementations must persist it before returning.
    async fn log_change(
        &self,
        subject: &str,
        mutated_path: &str,
        reference_path: &str,
        action: ChangeAction,
    ) -> Result<()>;
}
