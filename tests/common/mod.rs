// Shared test fixtures for integration tests
// Functions here are used across different test files
#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::VecDeque;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::{Duration, SystemTime};

use symlinkerr::config::{Config, WatchDirectory};
use symlinkerr::engine::Prompt;
use symlinkerr::model::TargetDirectory;
use symlinkerr::repository::Database;
use tempfile::TempDir;

/// Create an in-memory test database
pub async fn create_test_db() -> Database {
    Database::new(":memory:").await.unwrap()
}

/// Create an in-memory test database with its schema
pub async fn setup_db() -> Database {
    let db = create_test_db().await;
    db.init_schema().await.unwrap();
    db
}

/// Write `content` to `root/rel`, creating parent directories
pub fn write_file(root: &Path, rel: &str, content: &[u8]) -> PathBuf {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(&path, content).unwrap();
    path
}

/// Push the modification time of `path` `seconds` into the past
pub fn age_file(path: &Path, seconds: u64) {
    let file = File::options().write(true).open(path).unwrap();
    file.set_modified(SystemTime::now() - Duration::from_secs(seconds))
        .unwrap();
}

/// Directory layout used by the pass tests
pub struct Tree {
    pub dir: TempDir,
    pub watch: PathBuf,
    pub target_a: PathBuf,
    pub target_b: PathBuf,
    pub undo: PathBuf,
}

impl Tree {
    pub fn new() -> Self {
        Self::with_dir(TempDir::new().unwrap())
    }

    /// Tree below the working directory, so it has relative spellings
    pub fn in_working_dir() -> Self {
        Self::with_dir(TempDir::new_in(std::env::current_dir().unwrap()).unwrap())
    }

    fn with_dir(dir: TempDir) -> Self {
        let root = dir.path();
        let tree = Self {
            watch: root.join("watch"),
            target_a: root.join("target_a"),
            target_b: root.join("target_b"),
            undo: root.join("undo"),
            dir,
        };
        for d in [&tree.watch, &tree.target_a, &tree.target_b, &tree.undo] {
            fs::create_dir_all(d).unwrap();
        }
        tree
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    /// Live configuration over this tree: target_a ranks before target_b
    pub fn config(&self) -> Config {
        let mut config = Config::default();
        config.database = self.root().join("test.db");

        let dirs = &mut config.finder.directories;
        dirs.watch_directories = vec![WatchDirectory { dir: self.watch.clone() }];
        dirs.symlink_target_directories = vec![
            TargetDirectory { dir: self.target_a.clone(), priority: 1 },
            TargetDirectory { dir: self.target_b.clone(), priority: 2 },
        ];
        dirs.undo_all_symlinks_directories = vec![WatchDirectory { dir: self.undo.clone() }];

        config.checker.files_min_size_bytes = 1;
        config.checker.files_min_age_seconds = 0;
        config.replacer.dry_run = false;
        config
    }
}

/// `path` spelled relative to the working directory
pub fn relative_to_cwd(path: &Path) -> PathBuf {
    let relative = path
        .strip_prefix(std::env::current_dir().unwrap())
        .unwrap()
        .to_path_buf();
    assert!(relative.is_relative());
    relative
}

/// Prompt answering from a script and recording every question.
///
/// Runs out of answers by declining.
pub struct ScriptedPrompt {
    answers: RefCell<VecDeque<bool>>,
    questions: Rc<RefCell<Vec<String>>>,
}

impl ScriptedPrompt {
    pub fn new(answers: &[bool]) -> (Self, Rc<RefCell<Vec<String>>>) {
        let questions = Rc::new(RefCell::new(Vec::new()));
        let prompt = Self {
            answers: RefCell::new(answers.iter().copied().collect()),
            questions: Rc::clone(&questions),
        };
        (prompt, questions)
    }
}

impl Prompt for ScriptedPrompt {
    fn ask(&self, question: &str) -> symlinkerr::Result<bool> {
        self.questions.borrow_mut().push(question.to_string());
        Ok(self.answers.borrow_mut().pop_front().unwrap_or(false))
    }
}

/// Action tags of every changelog row, in write order
pub async fn changelog_actions(db: &Database) -> Vec<String> {
    db.changelog()
        .await
        .unwrap()
        .into_iter()
        .map(|record| record.action)
        .collect()
}
