use std::borrow::Cow;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// Appends `suffix` to the full path, e.g. `movie.mkv` + `.tmp` -> `movie.mkv.tmp`
pub fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut raw = OsString::from(path.as_os_str());
    raw.push(suffix);
    PathBuf::from(raw)
}

/// Path as stored in the database (lossy for non UTF-8 names)
pub fn path_str(path: &Path) -> Cow<'_, str> {
    path.to_string_lossy()
}

/// Textual prefix test on the string form of both paths.
///
/// Unlike `Path::starts_with` this does not compare components, so
/// `/data/movies2/x` is within `/data/movies`. Neither side is canonicalized.
pub fn text_starts_with(path: &Path, prefix: &Path) -> bool {
    path_str(path).starts_with(path_str(prefix).as_ref())
}
