use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::model::{CatalogEntry, FileInfo, FileKind, MatchPolicy, TargetDirectory};
use crate::repository::Database;
use crate::util::{format_size, path_str, text_starts_with};

use super::walk::{absolute_or_same, walk_files};

/// Catalog of the files under the target directories, rebuilt on every pass
pub struct Indexer<'a> {
    db: &'a Database,
    target_directories: Vec<TargetDirectory>,
    min_size: u64,
    follow_links: bool,
}

impl<'a> Indexer<'a> {
    pub fn new(
        db: &'a Database,
        target_directories: Vec<TargetDirectory>,
        min_size: u64,
        follow_links: bool,
    ) -> Self {
        let target_directories = target_directories
            .into_iter()
            .map(|directory| TargetDirectory {
                dir: absolute_or_same(&directory.dir),
                ..directory
            })
            .collect();
        Self {
            db,
            target_directories,
            min_size,
            follow_links,
        }
    }

    /// Drop the catalog and index every target directory again, in configured order.
    ///
    /// A path already indexed from an earlier directory keeps its first entry.
    /// Returns the number of files in the new catalog.
    pub async fn rebuild(&self) -> Result<i64> {
        let start = Instant::now();
        self.db.reset_catalog().await?;

        for directory in &self.target_directories {
            info!(dir = %directory.dir.display(), priority = directory.priority, "Indexing target directory");
            let entries = self.collect_directory(directory);
            let bytes: i64 = entries.iter().map(|e| e.size).sum();
            info!(files = entries.len(), size = %format_size(bytes as u64), "Collected candidates");
            self.db.insert_catalog_entries(&entries).await?;
        }

        let total = self.db.catalog_len().await?;
        info!(files = total, elapsed = ?start.elapsed(), "Candidate catalog rebuilt");
        Ok(total)
    }

    fn collect_directory(&self, directory: &TargetDirectory) -> Vec<CatalogEntry> {
        let mut entries = Vec::new();

        for path in walk_files(&directory.dir, self.follow_links) {
            let file = FileInfo::new(path);
            // Symlinks are never candidates
            let size = match file.kind() {
                Ok(FileKind::Regular) => file.size(),
                Ok(_) => continue,
                Err(e) => Err(e),
            };
            let size = match size {
                Ok(size) => size,
                Err(e) => {
                    warn!("Skipping {}: {}", file.path().display(), e);
                    continue;
                }
            };

            if size < self.min_size {
                debug!(path = %file.path().display(), size, "Not indexing file below the minimum size");
                continue;
            }

            entries.push(CatalogEntry {
                fullpath: path_str(file.path()).into_owned(),
                filename: file.filename(),
                size: size as i64,
                priority: directory.priority,
            });
        }

        entries
    }

    /// Candidate paths for `file` under `policy`, best priority first
    pub async fn candidates_for(&self, file: &FileInfo, policy: MatchPolicy) -> Result<Vec<PathBuf>> {
        let filename = file.filename();
        let filename = (!filename.is_empty()).then_some(filename.as_str());
        self.candidates_by(policy, Some(file.size()?), filename).await
    }

    /// Catalog paths matching the given predicates; missing predicates match nothing
    pub async fn candidates_by(
        &self,
        policy: MatchPolicy,
        size: Option<u64>,
        filename: Option<&str>,
    ) -> Result<Vec<PathBuf>> {
        self.db.find_candidates(policy, size, filename).await
    }

    /// Whether `path` textually starts with one of the target directories.
    ///
    /// Target directories are absolute, but links and `..` are never resolved,
    /// so other spellings of the same directory do not match.
    pub fn is_within(&self, path: &Path) -> bool {
        self.target_directories
            .iter()
            .any(|directory| text_starts_with(path, &directory.dir))
    }
}
