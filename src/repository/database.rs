use rustc_hash::FxHashMap;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    Pool, QueryBuilder, Row, Sqlite,
};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::SystemTime;
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::model::{
    CatalogEntry, ChangePhase, ChangeRecord, ChangeStep, HashEntry, MatchPolicy,
    CHANGELOG_VERSION,
};

use super::SCHEMA_VERSION;

/// Rows per multi-row INSERT when filling the catalog
const BATCH_SIZE: usize = 5000;

/// Database abstraction for SQLite operations
pub struct Database {
    pool: Pool<Sqlite>,
}

impl Database {
    /// Create a new database connection
    pub async fn new(db_path: &str) -> Result<Self> {
        // FULL sync: a changelog row must be on disk before the step it announces runs
        let options = SqliteConnectOptions::from_str(&format!("sqlite:{}?mode=rwc", db_path))?
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .synchronous(sqlx::sqlite::SqliteSynchronous::Full)
            .pragma("temp_store", "MEMORY")
            .pragma("cache_size", "-64000"); // 64MB cache

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;

        Ok(Self { pool })
    }

    /// Initialize database schema, returns true if the store was created fresh
    pub async fn init_schema(&self) -> Result<bool> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS metadata (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            )",
        )
        .execute(&self.pool)
        .await?;

        let stored_version = self.get_metadata("schema_version").await?;
        let fresh = stored_version.is_none();

        if let Some(stored) = stored_version.as_deref()
            && stored != SCHEMA_VERSION
        {
            // Hashes and changelog are durable; only the catalog is disposable
            warn!(
                stored,
                current = SCHEMA_VERSION,
                "Schema version changed, rebuilding the candidate catalog"
            );
            sqlx::query("DROP TABLE IF EXISTS index_target_directories")
                .execute(&self.pool)
                .await?;
        }

        self.create_catalog_table().await?;
        self.create_hashes_table().await?;
        self.create_changelog_table().await?;

        if stored_version.as_deref() != Some(SCHEMA_VERSION) {
            self.set_metadata("schema_version", SCHEMA_VERSION).await?;
        }

        Ok(fresh)
    }

    /// Get metadata value by key
    pub async fn get_metadata(&self, key: &str) -> Result<Option<String>> {
        Ok(sqlx::query("SELECT value FROM metadata WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?
            .map(|row| row.get("value")))
    }

    /// Set metadata value
    pub async fn set_metadata(&self, key: &str, value: &str) -> Result<()> {
        sqlx::query("INSERT OR REPLACE INTO metadata (key, value) VALUES (?, ?)")
            .bind(key)
            .bind(value)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    // ---- candidate catalog ----

    async fn create_catalog_table(&self) -> Result<()> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS index_target_directories (
                fullpath TEXT PRIMARY KEY,
                filename TEXT NOT NULL,
                size INTEGER NOT NULL,
                priority INTEGER NOT NULL
            )",
        )
        .execute(&self.pool)
        .await?;
        sqlx::query(
            "CREATE INDEX IF NOT EXISTS index_target_directories__filename
             ON index_target_directories(filename)",
        )
        .execute(&self.pool)
        .await?;
        sqlx::query(
            "CREATE INDEX IF NOT EXISTS index_target_directories__size
             ON index_target_directories(size)",
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Drop and recreate the candidate catalog
    pub async fn reset_catalog(&self) -> Result<()> {
        sqlx::query("DROP TABLE IF EXISTS index_target_directories")
            .execute(&self.pool)
            .await?;
        self.create_catalog_table().await
    }

    /// Insert catalog rows in one transaction. Paths already present are kept.
    pub async fn insert_catalog_entries(&self, entries: &[CatalogEntry]) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        for chunk in entries.chunks(BATCH_SIZE) {
            let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(
                "INSERT OR IGNORE INTO index_target_directories (fullpath, filename, size, priority) ",
            );
            qb.push_values(chunk, |mut row, entry| {
                row.push_bind(entry.fullpath.as_str())
                    .push_bind(entry.filename.as_str())
                    .push_bind(entry.size)
                    .push_bind(entry.priority);
            });
            qb.build().execute(&mut *tx).await?;
        }

        tx.commit().await?;
        Ok(())
    }

    /// Number of files in the catalog
    pub async fn catalog_len(&self) -> Result<i64> {
        Ok(sqlx::query_scalar("SELECT COUNT(*) FROM index_target_directories")
            .fetch_one(&self.pool)
            .await?)
    }

    /// Catalog paths matching `policy`, best priority first, ties in insertion order.
    ///
    /// Returns nothing when the predicates the policy needs are missing.
    pub async fn find_candidates(
        &self,
        policy: MatchPolicy,
        size: Option<u64>,
        filename: Option<&str>,
    ) -> Result<Vec<PathBuf>> {
        let size = size.map(|s| s as i64);
        let mut qb: QueryBuilder<Sqlite> =
            QueryBuilder::new("SELECT fullpath FROM index_target_directories WHERE ");

        match (policy, size, filename) {
            (MatchPolicy::Size, Some(size), _) => {
                qb.push("size = ").push_bind(size);
            }
            (MatchPolicy::Filename, _, Some(name)) => {
                qb.push("filename = ").push_bind(name);
            }
            (MatchPolicy::SizeOrFilename, Some(size), Some(name)) => {
                qb.push("(size = ")
                    .push_bind(size)
                    .push(" OR filename = ")
                    .push_bind(name)
                    .push(")");
            }
            (MatchPolicy::SizeOrFilename, Some(size), None) => {
                qb.push("size = ").push_bind(size);
            }
            (MatchPolicy::SizeOrFilename, None, Some(name)) => {
                qb.push("filename = ").push_bind(name);
            }
            (MatchPolicy::SizeAndFilename, Some(size), Some(name)) => {
                qb.push("size = ")
                    .push_bind(size)
                    .push(" AND filename = ")
                    .push_bind(name);
            }
            _ => return Ok(Vec::new()),
        }
        qb.push(" ORDER BY priority, rowid");

        let paths: Vec<String> = qb.build_query_scalar().fetch_all(&self.pool).await?;
        Ok(paths.into_iter().map(PathBuf::from).collect())
    }

    // ---- hash cache ----

    async fn create_hashes_table(&self) -> Result<()> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS hashes (
                fullpath TEXT PRIMARY KEY,
                hash TEXT NOT NULL,
                size INTEGER NOT NULL,
                mtime INTEGER NOT NULL
            )",
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Cached hash row for a path, whatever its size and mtime
    pub async fn get_hash_entry(&self, fullpath: &str) -> Result<Option<HashEntry>> {
        let row = sqlx::query("SELECT fullpath, hash, size, mtime FROM hashes WHERE fullpath = ?")
            .bind(fullpath)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|row| HashEntry {
            fullpath: row.get("fullpath"),
            hash: row.get("hash"),
            size: row.get("size"),
            mtime: row.get("mtime"),
        }))
    }

    /// Insert or overwrite the cached hash of a path
    pub async fn save_hash_entry(&self, entry: &HashEntry) -> Result<()> {
        sqlx::query("INSERT OR REPLACE INTO hashes (fullpath, hash, size, mtime) VALUES (?, ?, ?, ?)")
            .bind(&entry.fullpath)
            .bind(&entry.hash)
            .bind(entry.size)
            .bind(entry.mtime)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Forget every cached hash
    pub async fn clear_hashes(&self) -> Result<()> {
        sqlx::query("DROP TABLE IF EXISTS hashes")
            .execute(&self.pool)
            .await?;
        self.create_hashes_table().await?;
        info!("Hash cache cleared");
        Ok(())
    }

    // ---- changelog ----

    async fn create_changelog_table(&self) -> Result<()> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS changelog (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                date REAL NOT NULL,
                fullpath TEXT NOT NULL,
                filechanged TEXT NOT NULL,
                target TEXT NOT NULL,
                action TEXT NOT NULL,
                version REAL NOT NULL
            )",
        )
        .execute(&self.pool)
        .await?;
        sqlx::query("CREATE INDEX IF NOT EXISTS changelog__fullpath ON changelog(fullpath)")
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Append one changelog row, committed before returning
    pub async fn append_change(
        &self,
        fullpath: &str,
        filechanged: &str,
        target: &str,
        action: &str,
    ) -> Result<()> {
        let date = SystemTime::now()
            .duration_since(SystemTime::UNIX_EPOCH)
            .map(|d| d.as_secs_f64())
            .unwrap_or_default();

        sqlx::query(
            "INSERT INTO changelog (date, fullpath, filechanged, target, action, version)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(date)
        .bind(fullpath)
        .bind(filechanged)
        .bind(target)
        .bind(action)
        .bind(CHANGELOG_VERSION)
        .execute(&self.pool)
        .await?;

        debug!(fullpath, filechanged, target, action, "changelog");
        Ok(())
    }

    /// Every changelog row in write order
    pub async fn changelog(&self) -> Result<Vec<ChangeRecord>> {
        let rows = sqlx::query(
            "SELECT id, date, fullpath, filechanged, target, action, version
             FROM changelog ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| ChangeRecord {
                id: row.get("id"),
                date: row.get("date"),
                fullpath: row.get("fullpath"),
                filechanged: row.get("filechanged"),
                target: row.get("target"),
                action: row.get("action"),
                version: row.get("version"),
            })
            .collect())
    }

    /// START rows never followed by a COMMIT for the same file and step.
    ///
    /// Each one names a mutation whose filesystem state is unknown because the
    /// process stopped between the two rows.
    pub async fn unfinished_steps(&self) -> Result<Vec<ChangeRecord>> {
        let mut open: FxHashMap<(String, ChangeStep), ChangeRecord> = FxHashMap::default();
        let mut unfinished = Vec::new();

        for record in self.changelog().await? {
            let Some(action) = record.parsed_action() else {
                continue;
            };
            let key = (record.fullpath.clone(), action.step);
            match action.phase {
                ChangePhase::Start => {
                    if let Some(previous) = open.insert(key, record) {
                        unfinished.push(previous);
                    }
                }
                ChangePhase::Commit => {
                    open.remove(&key);
                }
            }
        }

        unfinished.extend(open.into_values());
        unfinished.sort_by_key(|r| r.id);
        Ok(unfinished)
    }

    /// Delete the whole changelog
    pub async fn clear_changelog(&self) -> Result<()> {
        sqlx::query("DROP TABLE IF EXISTS changelog")
            .execute(&self.pool)
            .await?;
        self.create_changelog_table().await?;
        info!("Changelog cleared");
        Ok(())
    }
}
