// Shared benchmark helpers
// Functions here are used across different benchmark files
#![allow(dead_code)]

use std::path::PathBuf;
use symlinkerr::model::CatalogEntry;
use symlinkerr::repository::Database;
use tempfile::TempDir;

/// Generate catalog rows spread over a few target directories
pub fn generate_catalog(num_files: usize) -> Vec<CatalogEntry> {
    (0..num_files)
        .map(|i| CatalogEntry {
            fullpath: format!("/targets/t{}/dir_{}/file_{}.bin", i % 3, i % 100, i),
            filename: format!("file_{}.bin", i % 1000),
            size: ((i % 500) * 4096) as i64,
            priority: (i % 3) as i64,
        })
        .collect()
}

/// Create in-memory database for benchmarks
pub async fn setup_bench_db() -> Database {
    let db = Database::new(":memory:").await.unwrap();
    db.init_schema().await.unwrap();
    db
}

/// Write a file of `size` pseudo-random bytes into a fresh temp directory
pub fn create_bench_file(size: usize) -> (TempDir, PathBuf) {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("payload.bin");
    let content: Vec<u8> = (0..size).map(|i| (i.wrapping_mul(31) % 251) as u8).collect();
    std::fs::write(&path, content).unwrap();
    (dir, path)
}
