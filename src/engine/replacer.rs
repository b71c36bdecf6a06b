//! Symlink swap and content restore
//!
//! Both mutations stage their result next to the file (`<path>.tmp`), then
//! publish it with a rename over the original path. Every filesystem call is
//! bracketed by a START row written before it and a COMMIT row written after
//! it succeeds, so an interrupted run leaves an orphan START naming the exact
//! step whose outcome is unknown. Nothing is rolled back automatically.

use std::fs::{self, Permissions};
use std::future::Future;
use std::io;
use std::os::unix::fs::{chown, lchown, symlink, PermissionsExt};
use std::path::Path;
use tracing::{debug, info, warn};

use crate::config::{FileMode, ReplacerConfig};
use crate::error::{Error, Result};
use crate::model::{ChangeStep, DryRunChanges, FileInfo, Outcome};
use crate::repository::ChangeLog;
use crate::util::{path_str, with_suffix};

use super::prompt::Prompt;

/// Suffix of the staging path used by both mutations
pub const TEMPORARY_SUFFIX: &str = ".tmp";

pub struct Replacer<'a, L> {
    log: &'a L,
    dry_run: bool,
    add_suffix: bool,
    suffix: String,
    uid: Option<u32>,
    gid: Option<u32>,
    mode: Option<FileMode>,
    prompt: Option<Box<dyn Prompt>>,
}

impl<'a, L: ChangeLog> Replacer<'a, L> {
    pub fn new(config: &ReplacerConfig, log: &'a L) -> Self {
        Self {
            log,
            dry_run: config.dry_run,
            add_suffix: config.add_suffix_instead_of_deleting,
            suffix: config.suffix.clone(),
            uid: config.chown_uid,
            gid: config.chown_gid,
            mode: config.chmod,
            prompt: None,
        }
    }

    /// Ask `prompt` before every mutation step
    pub fn interactive(mut self, prompt: Box<dyn Prompt>) -> Self {
        self.prompt = Some(prompt);
        self
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    /// Whether the file is a backup or staging file this replacer produced
    pub fn is_file_a_replacement(&self, file: &FileInfo) -> bool {
        let path = path_str(file.path());
        (!self.suffix.is_empty() && path.ends_with(self.suffix.as_str()))
            || path.ends_with(TEMPORARY_SUFFIX)
    }

    /// Replace `original` with a symlink to `candidate`
    pub async fn replace_with_symlink(
        &self,
        original: &FileInfo,
        candidate: &FileInfo,
        changes: &mut DryRunChanges,
    ) -> Result<Outcome> {
        let path = original.path();
        let target = candidate.path();
        info!(
            path = %path.display(),
            target = %target.display(),
            "Replacing file with a symlink"
        );

        let backup = if self.add_suffix {
            self.check_suffix()?;
            Some(with_suffix(path, &self.suffix))
        } else {
            None
        };

        if self.dry_run {
            info!("Dry run, not touching anything");
            changes.push(format!(
                "Would have replaced {} with a symlink to {}",
                path.display(),
                target.display()
            ));
            return Ok(Outcome::DryRun);
        }

        // Never rename over an unrelated file
        if let Some(backup) = &backup
            && fs::symlink_metadata(backup).is_ok()
        {
            return Err(Error::io(backup, io::Error::from(io::ErrorKind::AlreadyExists)));
        }

        let temp = with_suffix(path, TEMPORARY_SUFFIX);
        if !self.remove_stale_temp(path, &temp, target).await? {
            return Ok(Outcome::Declined);
        }

        let created = self
            .confirm(
                &format!("Create symlink {} ==> {}?", temp.display(), target.display()),
                async {
                    self.step(ChangeStep::CreateTempSymlink, path, &temp, target, || {
                        symlink(target, &temp)?;
                        self.apply_ownership(&temp, true)
                    })
                    .await
                },
            )
            .await?;
        if !created {
            return Ok(Outcome::Declined);
        }

        if let Some(backup) = &backup {
            let renamed = self
                .confirm(
                    &format!("Rename {} to {}?", path.display(), backup.display()),
                    async {
                        self.step(ChangeStep::AddSuffix, path, backup, target, || {
                            fs::rename(path, backup)
                        })
                        .await
                    },
                )
                .await?;
            if !renamed {
                return Ok(Outcome::Declined);
            }
        }

        let moved = self
            .confirm(
                &format!(
                    "Replace {} with its symlink to {}?",
                    path.display(),
                    target.display()
                ),
                async {
                    self.step(ChangeStep::MoveSymlink, path, path, target, || {
                        fs::rename(&temp, path)
                    })
                    .await
                },
            )
            .await?;
        if !moved {
            return Ok(Outcome::Declined);
        }

        Ok(Outcome::Replaced)
    }

    /// Replace a symlink with a copy of the content it points to
    pub async fn replace_with_content(
        &self,
        link: &FileInfo,
        changes: &mut DryRunChanges,
    ) -> Result<Outcome> {
        let path = link.path();
        let link_target = link.link_target()?.to_path_buf();
        info!(
            path = %path.display(),
            target = %link_target.display(),
            "Replacing symlink with its content"
        );

        if self.dry_run {
            info!("Dry run, not touching anything");
            changes.push(format!(
                "Would have replaced {} with its content from {}",
                path.display(),
                link_target.display()
            ));
            return Ok(Outcome::DryRun);
        }

        let temp = with_suffix(path, TEMPORARY_SUFFIX);
        if !self.remove_stale_temp(path, &temp, &link_target).await? {
            return Ok(Outcome::Declined);
        }

        // Size of the link target as first observed through this descriptor
        let expected = link.size()?;

        let copied = self
            .confirm(
                &format!(
                    "Copy the content of {} to {}?",
                    path.display(),
                    temp.display()
                ),
                async {
                    self.step(ChangeStep::SymlinkCopyContent, path, &temp, &link_target, || {
                        fs::copy(path, &temp)?;
                        self.apply_ownership(&temp, false)
                    })
                    .await
                },
            )
            .await?;
        if !copied {
            return Ok(Outcome::Declined);
        }

        let actual = fs::metadata(&temp).map_err(|e| Error::io(&temp, e))?.len();
        if actual != expected {
            warn!(
                path = %path.display(),
                target = %link_target.display(),
                expected,
                actual,
                difference = expected as i64 - actual as i64,
                "Copied content has the wrong size, removing the temporary file and leaving the symlink in place"
            );
            self.step(ChangeStep::RemoveTemp, path, &temp, &link_target, || {
                fs::remove_file(&temp)
            })
            .await?;
            return Ok(Outcome::SizeMismatch { expected, actual });
        }

        let renamed = self
            .confirm(
                &format!(
                    "Move the temporary file {} to {}?",
                    temp.display(),
                    path.display()
                ),
                async {
                    self.step(ChangeStep::SymlinkContentRename, path, &temp, path, || {
                        fs::rename(&temp, path)
                    })
                    .await
                },
            )
            .await?;
        if !renamed {
            return Ok(Outcome::Declined);
        }

        Ok(Outcome::Replaced)
    }

    /// Run `action` unless the operator declines; returns whether it ran.
    ///
    /// Without a prompt every action runs.
    pub async fn confirm<F>(&self, question: &str, action: F) -> Result<bool>
    where
        F: Future<Output = Result<()>>,
    {
        if let Some(prompt) = &self.prompt
            && !prompt.ask(question)?
        {
            info!(question, "Declined, stopping here");
            return Ok(false);
        }
        action.await?;
        Ok(true)
    }

    async fn remove_stale_temp(&self, subject: &Path, temp: &Path, reference: &Path) -> Result<bool> {
        if fs::symlink_metadata(temp).is_err() {
            return Ok(true);
        }
        self.confirm(
            &format!("Remove existing temporary file {}?", temp.display()),
            async {
                self.step(ChangeStep::RemoveTemp, subject, temp, reference, || {
                    fs::remove_file(temp)
                })
                .await
            },
        )
        .await
    }

    /// Perform one filesystem call between its START and COMMIT rows
    async fn step<T>(
        &self,
        step: ChangeStep,
        subject: &Path,
        mutated: &Path,
        reference: &Path,
        op: impl FnOnce() -> io::Result<T>,
    ) -> Result<T> {
        let subject_str = path_str(subject);
        let mutated_str = path_str(mutated);
        let reference_str = path_str(reference);

        self.log
            .log_change(&subject_str, &mutated_str, &reference_str, step.start())
            .await?;
        let value = op().map_err(|e| Error::io(mutated, e))?;
        self.log
            .log_change(&subject_str, &mutated_str, &reference_str, step.commit())
            .await?;

        debug!(step = step.as_str(), path = %mutated.display(), "Step committed");
        Ok(value)
    }

    fn check_suffix(&self) -> Result<()> {
        if self.suffix.is_empty() {
            return Err(Error::EmptySuffix);
        }
        if self.suffix == TEMPORARY_SUFFIX {
            return Err(Error::SuffixCollision {
                suffix: self.suffix.clone(),
            });
        }
        Ok(())
    }

    /// Apply the configured owner and mode. Links only get their owner changed:
    /// a mode change would go through to the link target.
    fn apply_ownership(&self, path: &Path, is_link: bool) -> io::Result<()> {
        if self.uid.is_some() || self.gid.is_some() {
            if is_link {
                lchown(path, self.uid, self.gid)?;
            } else {
                chown(path, self.uid, self.gid)?;
            }
        }
        if let Some(mode) = self.mode
            && !is_link
        {
            fs::set_permissions(path, Permissions::from_mode(mode.0))?;
        }
        Ok(())
    }
}
