mod database;
mod db_store;
mod store;

pub use database::Database;
pub use store::{ChangeLog, HashStore};

// Re-export the schema version for callers who need it
pub const SCHEMA_VERSION: &str = "1";
