use std::cell::OnceCell;
use std::fs::{self, Metadata};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::{Error, Result};

/// What a path points at, as seen without following symbolic links
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum FileKind {
    Regular,
    Symlink,
    Other,
}

/// Lazily-populated view over one filesystem path.
///
/// Every attribute is read from the filesystem on first access and kept for
/// the lifetime of the value. A `FileInfo` is meant to live for one operation;
/// create a new one when the underlying file may have changed.
#[derive(Debug)]
pub struct FileInfo {
    path: PathBuf,
    // stat(), follows symlinks
    metadata: OnceCell<Metadata>,
    // lstat()
    link_metadata: OnceCell<Metadata>,
    link_target: OnceCell<PathBuf>,
}

impl FileInfo {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            metadata: OnceCell::new(),
            link_metadata: OnceCell::new(),
            link_target: OnceCell::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Final path component, lossily converted to UTF-8
    pub fn filename(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Size in bytes. For a symlink this is the size of the file it points to.
    pub fn size(&self) -> Result<u64> {
        Ok(self.metadata()?.len())
    }

    /// Modification time in whole seconds since the epoch (follows symlinks)
    pub fn mtime(&self) -> Result<i64> {
        let modified = self
            .metadata()?
            .modified()
            .map_err(|e| Error::io(&self.path, e))?;
        Ok(unix_seconds(modified))
    }

    pub fn kind(&self) -> Result<FileKind> {
        let file_type = self.link_metadata()?.file_type();
        Ok(if file_type.is_symlink() {
            FileKind::Symlink
        } else if file_type.is_file() {
            FileKind::Regular
        } else {
            FileKind::Other
        })
    }

    pub fn is_symlink(&self) -> Result<bool> {
        Ok(self.kind()? == FileKind::Symlink)
    }

    /// Raw target of a symbolic link, exactly as stored in the link
    pub fn link_target(&self) -> Result<&Path> {
        if let Some(target) = self.link_target.get() {
            return Ok(target);
        }
        let target = fs::read_link(&self.path).map_err(|e| Error::io(&self.path, e))?;
        Ok(self.link_target.get_or_init(|| target))
    }

    fn metadata(&self) -> Result<&Metadata> {
        if let Some(metadata) = self.metadata.get() {
            return Ok(metadata);
        }
        let metadata = fs::metadata(&self.path).map_err(|e| Error::io(&self.path, e))?;
        Ok(self.metadata.get_or_init(|| metadata))
    }

    fn link_metadata(&self) -> Result<&Metadata> {
        if let Some(metadata) = self.link_metadata.get() {
            return Ok(metadata);
        }
        let metadata = fs::symlink_metadata(&self.path).map_err(|e| Error::io(&self.path, e))?;
        Ok(self.link_metadata.get_or_init(|| metadata))
    }
}

/// Convert a timestamp to whole seconds since the epoch (negative before 1970)
pub fn unix_seconds(time: SystemTime) -> i64 {
    match time.duration_since(UNIX_EPOCH) {
        Ok(d) => d.as_secs() as i64,
        Err(e) => -(e.duration().as_secs() as i64),
    }
}
