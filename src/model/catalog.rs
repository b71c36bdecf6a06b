use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// A directory indexed for symlink candidates, with its rank (lower wins)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetDirectory {
    pub dir: PathBuf,
    #[serde(default)]
    pub priority: i64,
}

/// How candidates are matched against a watched file
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MatchPolicy {
    Size,
    Filename,
    SizeOrFilename,
    #[default]
    SizeAndFilename,
}

/// One indexed file under a target directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    pub fullpath: String,
    pub filename: String,
    pub size: i64,
    pub priority: i64,
}

/// Cached content hash of a file, valid while size (and optionally mtime) match
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HashEntry {
    pub fullpath: String,
    pub hash: String,
    pub size: i64,
    pub mtime: i64,
}

impl HashEntry {
    /// Whether this entry still describes a file with the given size and mtime
    pub fn is_valid_for(&self, size: i64, mtime: i64, check_mtime: bool) -> bool {
        self.size == size && (!check_mtime || self.mtime == mtime)
    }
}
