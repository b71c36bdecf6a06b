use std::path::{Path, PathBuf};
use tracing::warn;
use walkdir::WalkDir;

/// Lazily yield every non-directory entry below `root`.
///
/// Symbolic links are yielded as entries (regular files and links to files);
/// links to directories are only descended into when `follow_links` is set.
/// Unreadable entries are logged and skipped. Order is the filesystem's.
/// Yielded paths are absolute: a relative `root` is joined onto the working
/// directory, with links left unresolved.
pub fn walk_files(root: &Path, follow_links: bool) -> impl Iterator<Item = PathBuf> {
    WalkDir::new(absolute_or_same(root))
        .follow_links(follow_links)
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!("Walk error: {}", e);
                None
            }
        })
        .filter(|entry| {
            if entry.file_type().is_dir() {
                return false;
            }
            // Unfollowed link to a directory
            !(entry.path_is_symlink() && entry.path().is_dir())
        })
        .map(|entry| entry.into_path())
}

/// `root` made absolute without touching the filesystem
pub fn absolute_or_same(root: &Path) -> PathBuf {
    std::path::absolute(root).unwrap_or_else(|e| {
        warn!("Cannot make {} absolute: {}", root.display(), e);
        root.to_path_buf()
    })
}
