//! Database implementation of the engine's persistence traits

use crate::error::Result;
use crate::model::{ChangeAction, HashEntry};

use super::database::Database;
use super::store::{ChangeLog, HashStore};

impl HashStore for Database {
    async fn lookup_hash(&self, fullpath: &str) -> Result<Option<HashEntry>> {
        self.get_hash_entry(fullpath).await
    }

    async fn store_hash(&self, entry: &HashEntry) -> Result<()> {
        self.save_hash_entry(entry).await
    }
}

impl ChangeLog for Database {
    async fn log_change(
        &self,
        subject: &str,
        mutated_path: &str,
        reference_path: &str,
        action: ChangeAction,
    ) -> Result<()> {
        self.append_change(subject, mutated_path, reference_path, &action.tag())
            .await
    }
}
