use regex::Regex;
use std::fs;
use std::path::Path;
use std::time::{Instant, SystemTime};
use tracing::{debug, info, warn};

use crate::config::{CheckerConfig, ExclusionConfig};
use crate::error::{Error, Result};
use crate::model::{unix_seconds, FileInfo, HashEntry};
use crate::repository::HashStore;
use crate::util::path_str;

use super::hasher::compute_hash;
use super::progress::HashProgress;

/// Compiled exclusion patterns. A pattern excludes a path when it matches at
/// the start of the path.
#[derive(Debug, Default)]
pub struct PatternSet(Vec<(String, Regex)>);

impl PatternSet {
    pub fn compile(patterns: &[String]) -> Result<Self> {
        patterns
            .iter()
            .map(|pattern| {
                Regex::new(&format!("^(?:{})", pattern))
                    .map(|re| (pattern.clone(), re))
                    .map_err(|source| Error::InvalidPattern {
                        pattern: pattern.clone(),
                        source,
                    })
            })
            .collect::<Result<Vec<_>>>()
            .map(Self)
    }

    /// The first pattern matching `path`, as written in the configuration
    pub fn matching(&self, path: &Path) -> Option<&str> {
        let text = path_str(path);
        self.0
            .iter()
            .find(|(_, re)| re.is_match(&text))
            .map(|(pattern, _)| pattern.as_str())
    }
}

/// The three independent exclusion lists
#[derive(Debug, Default)]
pub struct Exclusions {
    pub watch: PatternSet,
    pub target: PatternSet,
    pub undo: PatternSet,
}

impl Exclusions {
    pub fn compile(config: &ExclusionConfig) -> Result<Self> {
        Ok(Self {
            watch: PatternSet::compile(&config.watch_directories_regexes)?,
            target: PatternSet::compile(&config.symlink_target_directories_regexes)?,
            undo: PatternSet::compile(&config.undo_all_symlinks_directories_regexes)?,
        })
    }
}

/// Decides which files may be replaced, and with what, backed by the hash cache
pub struct Checker<'a, S> {
    store: &'a S,
    min_size: u64,
    min_age: u64,
    check_hash: bool,
    mtime_invalidates_hash: bool,
    exclusions: Exclusions,
    progress: HashProgress,
}

impl<'a, S: HashStore> Checker<'a, S> {
    pub fn new(config: &CheckerConfig, store: &'a S) -> Result<Self> {
        Ok(Self {
            store,
            min_size: config.files_min_size_bytes,
            min_age: config.files_min_age_seconds,
            check_hash: config.check_hash,
            mtime_invalidates_hash: config.change_in_mtime_invalidates_hash,
            exclusions: Exclusions::compile(&config.exclusions)?,
            progress: HashProgress::Hidden,
        })
    }

    /// Report hashing progress through `progress`
    pub fn with_progress(mut self, progress: HashProgress) -> Self {
        self.progress = progress;
        self
    }

    /// Whether a watched file is big enough, old enough and not excluded
    pub fn is_eligible_for_replacement(&self, file: &FileInfo) -> Result<bool> {
        // Cheapest checks first
        let size = file.size()?;
        if size < self.min_size {
            debug!(
                path = %file.path().display(),
                size,
                min_size = self.min_size,
                "Ignoring file below the minimum size"
            );
            return Ok(false);
        }

        let age = unix_seconds(SystemTime::now()) - file.mtime()?;
        if age < self.min_age as i64 {
            debug!(
                path = %file.path().display(),
                age,
                min_age = self.min_age,
                "Ignoring recently modified file"
            );
            return Ok(false);
        }

        if let Some(pattern) = self.exclusions.watch.matching(file.path()) {
            debug!(path = %file.path().display(), pattern, "Ignoring excluded file");
            return Ok(false);
        }

        Ok(true)
    }

    /// Whether `original` may become a symlink to `candidate`
    pub async fn can_be_replaced_with(
        &self,
        original: &FileInfo,
        candidate: &FileInfo,
    ) -> Result<bool> {
        if let Some(pattern) = self.exclusions.target.matching(candidate.path()) {
            debug!(
                candidate = %candidate.path().display(),
                pattern,
                "Candidate matches a target exclusion"
            );
            return Ok(false);
        }

        if same_entry(original.path(), candidate.path())? {
            warn!(
                path = %original.path().display(),
                "Candidate is the original file itself, watched and target directories overlap"
            );
            return Ok(false);
        }

        if !self.check_hash {
            debug!(
                candidate = %candidate.path().display(),
                "Hash checking disabled, accepting candidate"
            );
            return Ok(true);
        }

        let original_hash = self.get_hash(original).await?;
        let candidate_hash = self.get_hash(candidate).await?;
        if original_hash != candidate_hash {
            info!(
                original = %original.path().display(),
                candidate = %candidate.path().display(),
                "Different hashes, discarding candidate"
            );
            return Ok(false);
        }

        info!(
            original = %original.path().display(),
            candidate = %candidate.path().display(),
            hash = %original_hash,
            "Same hash, accepting candidate"
        );
        Ok(true)
    }

    /// Whether a symlink found in an undo directory may be restored
    pub fn is_eligible_for_content_restore(&self, symlink: &FileInfo) -> bool {
        if let Some(pattern) = self.exclusions.undo.matching(symlink.path()) {
            debug!(path = %symlink.path().display(), pattern, "Ignoring excluded symlink");
            return false;
        }
        true
    }

    /// Content hash of `file`, from the cache when the cached row still applies
    pub async fn get_hash(&self, file: &FileInfo) -> Result<String> {
        let fullpath = path_str(file.path()).into_owned();
        let size = file.size()? as i64;
        let mtime = file.mtime()?;

        if let Some(entry) = self.store.lookup_hash(&fullpath).await?
            && entry.is_valid_for(size, mtime, self.mtime_invalidates_hash)
        {
            return Ok(entry.hash);
        }

        info!(path = %fullpath, size, "Hash not cached, computing it");
        let start = Instant::now();
        let hash = compute_hash(file, self.progress)?;
        info!(path = %fullpath, elapsed = ?start.elapsed(), "Hash computed");

        self.store
            .store_hash(&HashEntry {
                fullpath,
                hash: hash.clone(),
                size,
                mtime,
            })
            .await?;
        Ok(hash)
    }
}

/// Whether both paths name the same directory entry
fn same_entry(a: &Path, b: &Path) -> Result<bool> {
    if a == b {
        return Ok(true);
    }
    let a = fs::canonicalize(a).map_err(|e| Error::io(a, e))?;
    let b = fs::canonicalize(b).map_err(|e| Error::io(b, e))?;
    Ok(a == b)
}
