//! Scan orchestrator
//!
//! Walks the watched directories (replace pass) or the undo directories
//! (undo pass) and drives the checker and replacer for every file. A failing
//! file is logged and recorded in the pass report; only fatal errors
//! (configuration, store) stop a pass.

use std::path::{Path, PathBuf};
use tracing::{debug, error, info};

use crate::config::FinderConfig;
use crate::error::Result;
use crate::model::{FileInfo, FileKind, MatchPolicy, PassReport};
use crate::repository::{ChangeLog, HashStore};

use super::checker::Checker;
use super::indexer::Indexer;
use super::replacer::Replacer;
use super::walk::walk_files;

pub struct Finder<'a, H, L> {
    indexer: Indexer<'a>,
    checker: Checker<'a, H>,
    replacer: Replacer<'a, L>,
    watch_directories: Vec<PathBuf>,
    undo_directories: Vec<PathBuf>,
    follow_links: bool,
    policy: MatchPolicy,
    only_undo_symlinks_to_target_directories: bool,
}

impl<'a, H: HashStore, L: ChangeLog> Finder<'a, H, L> {
    pub fn new(
        config: &FinderConfig,
        indexer: Indexer<'a>,
        checker: Checker<'a, H>,
        replacer: Replacer<'a, L>,
    ) -> Self {
        let dirs = &config.directories;
        Self {
            indexer,
            checker,
            replacer,
            watch_directories: dirs.watch_directories.iter().map(|d| d.dir.clone()).collect(),
            undo_directories: dirs
                .undo_all_symlinks_directories
                .iter()
                .map(|d| d.dir.clone())
                .collect(),
            follow_links: config.followlinks,
            policy: config.find_candidates_by,
            only_undo_symlinks_to_target_directories: config.only_undo_symlinks_to_target_directories,
        }
    }

    pub fn indexer(&self) -> &Indexer<'a> {
        &self.indexer
    }

    /// Replace duplicates in every watched directory with symlinks to their best candidate
    pub async fn find_and_replace_with_symlinks(&self) -> Result<PassReport> {
        let mut report = PassReport::new();

        for dir in &self.watch_directories {
            info!(dir = %dir.display(), "Finding files to replace with symlinks");
            for path in walk_files(dir, self.follow_links) {
                if let Err(e) = self.replace_file(&path, &mut report).await {
                    if e.is_fatal() {
                        return Err(e);
                    }
                    error!(path = %path.display(), "Could not replace file with a symlink: {}", e);
                    report.record_failure(path, e);
                }
            }
        }

        Ok(report)
    }

    async fn replace_file(&self, path: &Path, report: &mut PassReport) -> Result<()> {
        let file = FileInfo::new(path);

        // Never touch something already converted
        if file.kind()? != FileKind::Regular {
            return Ok(());
        }
        if self.replacer.is_file_a_replacement(&file) {
            debug!(path = %path.display(), "Ignoring a file produced by a previous replacement");
            return Ok(());
        }
        if !self.checker.is_eligible_for_replacement(&file)? {
            return Ok(());
        }
        report.examined += 1;

        let candidates = self.indexer.candidates_for(&file, self.policy).await?;
        if candidates.is_empty() {
            debug!(path = %path.display(), "No candidate found");
            return Ok(());
        }
        info!(
            path = %path.display(),
            "Candidates sorted by priority:\n{}",
            candidates
                .iter()
                .map(|c| c.display().to_string())
                .collect::<Vec<_>>()
                .join("\n")
        );

        for candidate in candidates {
            let candidate = FileInfo::new(candidate);
            if self.checker.can_be_replaced_with(&file, &candidate).await? {
                info!(candidate = %candidate.path().display(), "Selected candidate, performing replacement");
                let outcome = self
                    .replacer
                    .replace_with_symlink(&file, &candidate, &mut report.changes)
                    .await?;
                report.record(outcome);
                return Ok(());
            }
        }

        debug!(path = %path.display(), "No candidate matched");
        Ok(())
    }

    /// Replace symlinks in every undo directory with the content they point to
    pub async fn find_and_replace_with_content(&self) -> Result<PassReport> {
        let mut report = PassReport::new();

        for dir in &self.undo_directories {
            info!(dir = %dir.display(), "Finding symlinks to replace with content");
            for path in walk_files(dir, self.follow_links) {
                if let Err(e) = self.restore_file(&path, &mut report).await {
                    if e.is_fatal() {
                        return Err(e);
                    }
                    error!(path = %path.display(), "Could not replace symlink with content: {}", e);
                    report.record_failure(path, e);
                }
            }
        }

        Ok(report)
    }

    async fn restore_file(&self, path: &Path, report: &mut PassReport) -> Result<()> {
        let link = FileInfo::new(path);
        if !link.is_symlink()? {
            return Ok(());
        }

        let target = link.link_target()?;
        if self.only_undo_symlinks_to_target_directories && !self.indexer.is_within(target) {
            debug!(
                path = %path.display(),
                target = %target.display(),
                "Ignoring symlink pointing outside the target directories"
            );
            return Ok(());
        }
        if !self.checker.is_eligible_for_content_restore(&link) {
            return Ok(());
        }
        report.examined += 1;

        info!(path = %path.display(), target = %target.display(), "Found a symlink to unwind");
        let outcome = self
            .replacer
            .replace_with_content(&link, &mut report.changes)
            .await?;
        report.record(outcome);
        Ok(())
    }
}
