//! YAML configuration
//!
//! Every key has a default, so a configuration file only needs the keys it
//! changes. Keys are kebab-case and grouped by the component that reads them.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::error::{Error, Result};
use crate::model::{MatchPolicy, TargetDirectory};

const APP_DIR: &str = "symlinkerr";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct Config {
    /// SQLite file holding the catalog, hash cache and changelog
    pub database: PathBuf,
    pub logger: LoggerConfig,
    pub indexer: IndexerConfig,
    pub finder: FinderConfig,
    pub checker: CheckerConfig,
    pub replacer: ReplacerConfig,
    pub watcher: WatcherConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: default_database_path(),
            logger: LoggerConfig::default(),
            indexer: IndexerConfig::default(),
            finder: FinderConfig::default(),
            checker: CheckerConfig::default(),
            replacer: ReplacerConfig::default(),
            watcher: WatcherConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct LoggerConfig {
    /// Default tracing level; `RUST_LOG` takes precedence
    pub level: String,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self { level: "info".to_string() }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct IndexerConfig {
    pub followlinks: bool,
}

/// A watched or undo-scope directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchDirectory {
    pub dir: PathBuf,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct Directories {
    pub watch_directories: Vec<WatchDirectory>,
    pub symlink_target_directories: Vec<TargetDirectory>,
    pub undo_all_symlinks_directories: Vec<WatchDirectory>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct FinderConfig {
    pub directories: Directories,
    pub followlinks: bool,
    pub find_candidates_by: MatchPolicy,
    pub only_undo_symlinks_to_target_directories: bool,
}

impl Default for FinderConfig {
    fn default() -> Self {
        Self {
            directories: Directories::default(),
            followlinks: false,
            find_candidates_by: MatchPolicy::SizeAndFilename,
            only_undo_symlinks_to_target_directories: true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ExclusionConfig {
    pub watch_directories_regexes: Vec<String>,
    pub symlink_target_directories_regexes: Vec<String>,
    pub undo_all_symlinks_directories_regexes: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct CheckerConfig {
    pub files_min_size_bytes: u64,
    pub files_min_age_seconds: u64,
    pub check_hash: bool,
    pub change_in_mtime_invalidates_hash: bool,
    pub exclusions: ExclusionConfig,
}

impl Default for CheckerConfig {
    fn default() -> Self {
        Self {
            files_min_size_bytes: 1024 * 1024,
            files_min_age_seconds: 24 * 60 * 60,
            check_hash: true,
            change_in_mtime_invalidates_hash: true,
            exclusions: ExclusionConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ReplacerConfig {
    pub dry_run: bool,
    pub add_suffix_instead_of_deleting: bool,
    pub suffix: String,
    pub chown_uid: Option<u32>,
    pub chown_gid: Option<u32>,
    pub chmod: Option<FileMode>,
}

impl Default for ReplacerConfig {
    fn default() -> Self {
        Self {
            dry_run: true,
            add_suffix_instead_of_deleting: false,
            suffix: ".bak".to_string(),
            chown_uid: None,
            chown_gid: None,
            chmod: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct WatcherConfig {
    pub interval_seconds: u64,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self { interval_seconds: 3600 }
    }
}

/// Permission bits, written in octal either as a number (`644`) or a string (`"0644"`)
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct FileMode(pub u32);

impl FileMode {
    pub fn parse(octal: &str) -> Option<Self> {
        let digits = octal.trim();
        let digits = digits.strip_prefix("0o").unwrap_or(digits);
        u32::from_str_radix(digits, 8).ok().filter(|m| *m <= 0o7777).map(Self)
    }
}

impl<'de> Deserialize<'de> for FileMode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Number(u64),
            Text(String),
        }

        let text = match Raw::deserialize(deserializer)? {
            Raw::Number(n) => n.to_string(),
            Raw::Text(s) => s,
        };
        FileMode::parse(&text)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid octal mode '{}'", text)))
    }
}

impl Serialize for FileMode {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&format!("{:04o}", self.0))
    }
}

impl Config {
    /// Parse a configuration document; an empty document yields the defaults
    pub fn from_yaml(text: &str, origin: &Path) -> Result<Self> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(text).map_err(|e| Error::Config {
            path: origin.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Load the configuration at `path`
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        Self::from_yaml(&text, path)
    }

    /// Load the configuration, writing the defaults to `path` first if it is missing
    pub fn load_or_create(path: &Path) -> Result<Self> {
        if path.is_file() {
            return Self::load(path);
        }

        warn!(path = %path.display(), "Configuration not found, creating a default one");
        let config = Self::default();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
        }
        let text = serde_yaml::to_string(&config).map_err(|e| Error::Config {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        fs::write(path, text).map_err(|e| Error::io(path, e))?;
        Ok(config)
    }

    /// Where the configuration lives when none is given on the command line
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .map(|d| d.join(APP_DIR))
            .unwrap_or_default()
            .join("config.yml")
    }
}

fn default_database_path() -> PathBuf {
    dirs::data_dir()
        .map(|d| d.join(APP_DIR))
        .unwrap_or_default()
        .join("symlinkerr.db")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_keeps_defaults() {
        let yaml = r#"
finder:
  find-candidates-by: SIZE
  directories:
    watch-directories:
      - dir: /local/movies
    symlink-target-directories:
      - dir: /remote/movies
        priority: 1
      - dir: /remote/backup
        priority: 2
checker:
  files-min-size-bytes: 10
replacer:
  dry-run: false
  chmod: 644
"#;
        let config = Config::from_yaml(yaml, Path::new("test.yml")).unwrap();

        assert_eq!(config.finder.find_candidates_by, MatchPolicy::Size);
        assert_eq!(config.finder.directories.watch_directories.len(), 1);
        assert_eq!(config.finder.directories.symlink_target_directories[1].priority, 2);
        assert_eq!(config.checker.files_min_size_bytes, 10);
        assert_eq!(config.checker.files_min_age_seconds, 24 * 60 * 60);
        assert!(config.checker.check_hash);
        assert!(!config.replacer.dry_run);
        assert_eq!(config.replacer.chmod, Some(FileMode(0o644)));
        assert_eq!(config.replacer.suffix, ".bak");
    }

    #[test]
    fn test_empty_config_is_default() {
        let config = Config::from_yaml("  \n", Path::new("empty.yml")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_invalid_config_reports_path() {
        let err = Config::from_yaml("checker: [1, 2", Path::new("broken.yml")).unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
        assert!(err.to_string().contains("broken.yml"));
    }

    #[test]
    fn test_file_mode_forms() {
        assert_eq!(FileMode::parse("644"), Some(FileMode(0o644)));
        assert_eq!(FileMode::parse("0755"), Some(FileMode(0o755)));
        assert_eq!(FileMode::parse("0o600"), Some(FileMode(0o600)));
        assert_eq!(FileMode::parse("998"), None);

        let config = Config::from_yaml("replacer:\n  chmod: \"0640\"\n", Path::new("c.yml")).unwrap();
        assert_eq!(config.replacer.chmod, Some(FileMode(0o640)));
        assert!(Config::from_yaml("replacer:\n  chmod: 999\n", Path::new("c.yml")).is_err());
    }

    #[test]
    fn test_load_or_create_writes_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.yml");

        let created = Config::load_or_create(&path).unwrap();
        assert!(path.is_file());
        assert_eq!(Config::load(&path).unwrap(), created);
    }
}
