//! Operator entry points
//!
//! Builds the engine from a configuration and a store for each command.

use std::fmt::Write as _;
use std::fs;
use tracing::info;

use crate::config::Config;
use crate::engine::{Checker, Finder, Indexer, HashProgress, Replacer, TerminalPrompt};
use crate::error::{Error, Result};
use crate::model::{ChangeRecord, PassReport};
use crate::repository::Database;
use crate::util::{format_timestamp, path_str};

/// Files at least this large get a hashing progress bar
const PROGRESS_MIN_BYTES: u64 = 64 * 1024 * 1024;

pub struct Runner<'a> {
    db: &'a Database,
    config: &'a Config,
    interactive: bool,
    show_progress: bool,
}

/// Open the configured store, creating its directory and schema as needed
pub async fn open_database(config: &Config) -> Result<Database> {
    if let Some(parent) = config.database.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
    }
    let db = Database::new(&path_str(&config.database)).await?;
    if db.init_schema().await? {
        info!(path = %config.database.display(), "Created new database");
    }
    Ok(db)
}

impl<'a> Runner<'a> {
    pub fn new(db: &'a Database, config: &'a Config) -> Self {
        Self {
            db,
            config,
            interactive: false,
            show_progress: false,
        }
    }

    /// Confirm every mutation step on the terminal
    pub fn interactive(mut self, interactive: bool) -> Self {
        self.interactive = interactive;
        self
    }

    /// Draw progress bars while hashing large files
    pub fn show_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    fn finder(&self) -> Result<Finder<'a, Database, Database>> {
        let config = self.config;

        let indexer = Indexer::new(
            self.db,
            config.finder.directories.symlink_target_directories.clone(),
            config.checker.files_min_size_bytes,
            config.indexer.followlinks,
        );

        let mut checker = Checker::new(&config.checker, self.db)?;
        if self.show_progress {
            checker = checker.with_progress(HashProgress::large_files(PROGRESS_MIN_BYTES));
        }

        let mut replacer = Replacer::new(&config.replacer, self.db);
        if self.interactive {
            replacer = replacer.interactive(Box::new(TerminalPrompt));
        }

        Ok(Finder::new(&config.finder, indexer, checker, replacer))
    }

    /// Rebuild the candidate catalog, then run the replace pass
    pub async fn replace_with_symlinks(&self) -> Result<PassReport> {
        let finder = self.finder()?;
        finder.indexer().rebuild().await?;
        finder.find_and_replace_with_symlinks().await
    }

    /// Run the undo pass
    pub async fn replace_with_content(&self) -> Result<PassReport> {
        self.finder()?.find_and_replace_with_content().await
    }

    /// One watch iteration: replace pass followed by the undo pass
    pub async fn watch_iteration(&self) -> Result<PassReport> {
        let mut report = self.replace_with_symlinks().await?;
        report.merge(self.replace_with_content().await?);
        Ok(report)
    }

    pub async fn clear_hashes(&self) -> Result<()> {
        self.db.clear_hashes().await
    }

    pub async fn clear_changelog(&self) -> Result<()> {
        self.db.clear_changelog().await
    }

    /// Changelog rows, or only the steps that never committed
    pub async fn changelog(&self, unfinished_only: bool) -> Result<Vec<ChangeRecord>> {
        let records = if unfinished_only {
            self.db.unfinished_steps().await?
        } else {
            self.db.changelog().await?
        };
        info!(rows = records.len(), unfinished_only, "Loaded changelog");
        Ok(records)
    }
}

/// Human-readable summary of a pass, followed by the dry-run list when `dry_run` is set
pub fn format_report(title: &str, report: &PassReport, dry_run: bool) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{title}");
    let _ = writeln!(
        out,
        "  examined: {}, replaced: {}, dry run: {}, declined: {}, abandoned: {}, failed: {}",
        report.examined,
        report.replaced,
        report.dry_run,
        report.declined,
        report.abandoned,
        report.failed()
    );
    for failure in &report.failures {
        let _ = writeln!(out, "  failed {}: {}", failure.path.display(), failure.cause);
    }
    if !dry_run {
        return out;
    }
    if report.changes.is_empty() {
        let _ = writeln!(out, "** No change would have been performed without the dry-run **");
    } else {
        let _ = writeln!(out, "** Changes that would have been performed without the dry-run: **");
        for change in report.changes.iter() {
            let _ = writeln!(out, "{change}");
        }
    }
    out
}

/// One line per changelog row
pub fn format_changelog(records: &[ChangeRecord]) -> String {
    let mut out = String::new();
    for record in records {
        let _ = writeln!(
            out,
            "{:>6}  {}  {:<28}  {} | {} -> {}",
            record.id,
            format_timestamp(record.date),
            record.action,
            record.fullpath,
            record.filechanged,
            record.target
        );
    }
    out
}
