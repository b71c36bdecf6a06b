// End-to-end pass tests
// Runs the replace and undo passes through the runner over a temp tree

mod common;

use common::{relative_to_cwd, setup_db, write_file, Tree};
use std::fs;
use std::os::unix::fs::symlink;
use std::path::Path;
use symlinkerr::config::WatchDirectory;
use symlinkerr::model::{MatchPolicy, TargetDirectory};
use symlinkerr::runner::Runner;
use symlinkerr::Error;

fn is_symlink(path: &Path) -> bool {
    fs::symlink_metadata(path).unwrap().file_type().is_symlink()
}

#[tokio::test]
async fn test_duplicate_becomes_symlink() {
    let db = setup_db().await;
    let tree = Tree::new();
    let watched = write_file(&tree.watch, "docs/a.bin", b"duplicate content");
    let target = write_file(&tree.target_a, "a.bin", b"duplicate content");
    let unique = write_file(&tree.watch, "unique.bin", b"nothing like it");
    let config = tree.config();

    let report = Runner::new(&db, &config).replace_with_symlinks().await.unwrap();

    assert_eq!(report.replaced, 1);
    assert_eq!(report.examined, 2);
    assert_eq!(report.failed(), 0);
    assert!(is_symlink(&watched));
    assert_eq!(fs::read_link(&watched).unwrap(), target);
    assert!(!is_symlink(&unique));
    assert!(!is_symlink(&target));
    assert_eq!(db.catalog_len().await.unwrap(), 1);
}

#[tokio::test]
async fn test_second_pass_is_a_no_op() {
    let db = setup_db().await;
    let tree = Tree::new();
    let watched = write_file(&tree.watch, "a.bin", b"duplicate content");
    write_file(&tree.target_a, "a.bin", b"duplicate content");
    let config = tree.config();
    let runner = Runner::new(&db, &config);

    assert_eq!(runner.replace_with_symlinks().await.unwrap().replaced, 1);
    let rows = db.changelog().await.unwrap().len();

    let report = runner.replace_with_symlinks().await.unwrap();
    assert_eq!(report.replaced, 0);
    assert_eq!(report.examined, 0);
    assert!(is_symlink(&watched));
    assert_eq!(db.changelog().await.unwrap().len(), rows);
}

#[tokio::test]
async fn test_better_priority_wins() {
    let db = setup_db().await;
    let tree = Tree::new();
    let watched = write_file(&tree.watch, "a.bin", b"duplicate content");
    let preferred = write_file(&tree.target_a, "a.bin", b"duplicate content");
    write_file(&tree.target_b, "a.bin", b"duplicate content");
    let config = tree.config();

    Runner::new(&db, &config).replace_with_symlinks().await.unwrap();

    assert_eq!(fs::read_link(&watched).unwrap(), preferred);
}

#[tokio::test]
async fn test_falls_back_after_hash_mismatch() {
    let db = setup_db().await;
    let tree = Tree::new();
    let watched = write_file(&tree.watch, "a.bin", b"duplicate content");
    let decoy = write_file(&tree.target_a, "a.bin", b"different content");
    let fallback = write_file(&tree.target_b, "a.bin", b"duplicate content");
    let config = tree.config();

    let report = Runner::new(&db, &config).replace_with_symlinks().await.unwrap();

    assert_eq!(report.replaced, 1);
    assert_eq!(fs::read_link(&watched).unwrap(), fallback);
    assert!(!is_symlink(&decoy));
    // Both candidates were hashed in priority order
    let decoy_hash = db.get_hash_entry(&decoy.to_string_lossy()).await.unwrap();
    let fallback_hash = db.get_hash_entry(&fallback.to_string_lossy()).await.unwrap();
    assert!(decoy_hash.is_some());
    assert!(fallback_hash.is_some());
}

#[tokio::test]
async fn test_dry_run_reports_without_changing() {
    let db = setup_db().await;
    let tree = Tree::new();
    let watched = write_file(&tree.watch, "a.bin", b"duplicate content");
    let target = write_file(&tree.target_a, "a.bin", b"duplicate content");
    let mut config = tree.config();
    config.replacer.dry_run = true;

    let report = Runner::new(&db, &config).replace_with_symlinks().await.unwrap();

    assert_eq!(report.dry_run, 1);
    assert_eq!(report.replaced, 0);
    assert!(!is_symlink(&watched));
    let changes: Vec<_> = report.changes.iter().collect();
    assert_eq!(
        changes,
        vec![format!(
            "Would have replaced {} with a symlink to {}",
            watched.display(),
            target.display()
        )]
    );
    assert!(db.changelog().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_filename_policy_ignores_size() {
    let db = setup_db().await;
    let tree = Tree::new();
    let watched = write_file(&tree.watch, "a.bin", b"short");
    write_file(&tree.target_a, "a.bin", b"much longer content");
    let mut config = tree.config();
    config.finder.find_candidates_by = MatchPolicy::Filename;
    config.checker.check_hash = false;

    let report = Runner::new(&db, &config).replace_with_symlinks().await.unwrap();

    assert_eq!(report.replaced, 1);
    assert!(is_symlink(&watched));
}

#[tokio::test]
async fn test_overlapping_directories_never_self_link() {
    let db = setup_db().await;
    let tree = Tree::new();
    let shared = write_file(&tree.target_a, "a.bin", b"only copy");
    let mut config = tree.config();
    config.finder.directories.watch_directories = vec![WatchDirectory {
        dir: tree.target_a.clone(),
    }];

    let report = Runner::new(&db, &config).replace_with_symlinks().await.unwrap();

    assert_eq!(report.replaced, 0);
    assert!(!is_symlink(&shared));
    assert_eq!(fs::read(&shared).unwrap(), b"only copy");
}

#[tokio::test]
async fn test_one_failing_file_does_not_stop_the_pass() {
    let db = setup_db().await;
    let tree = Tree::new();
    let blocked = write_file(&tree.watch, "a.bin", b"first duplicate");
    write_file(&tree.watch, "a.bin.bak", b"unrelated backup");
    let free = write_file(&tree.watch, "b.bin", b"second duplicate");
    write_file(&tree.target_a, "a.bin", b"first duplicate");
    write_file(&tree.target_a, "b.bin", b"second duplicate");
    let mut config = tree.config();
    config.replacer.add_suffix_instead_of_deleting = true;

    let report = Runner::new(&db, &config).replace_with_symlinks().await.unwrap();

    assert_eq!(report.replaced, 1);
    assert_eq!(report.failed(), 1);
    assert_eq!(report.failures[0].path, blocked);
    assert!(!is_symlink(&blocked));
    assert!(is_symlink(&free));
}

#[tokio::test]
async fn test_fatal_error_aborts_the_pass() {
    let db = setup_db().await;
    let tree = Tree::new();
    let watched = write_file(&tree.watch, "a.bin", b"duplicate content");
    write_file(&tree.target_a, "a.bin", b"duplicate content");
    let mut config = tree.config();
    config.replacer.add_suffix_instead_of_deleting = true;
    config.replacer.suffix = ".tmp".to_string();

    let err = Runner::new(&db, &config).replace_with_symlinks().await.unwrap_err();

    assert!(matches!(err, Error::SuffixCollision { .. }));
    assert!(!is_symlink(&watched));
}

#[tokio::test]
async fn test_undo_restores_only_links_into_targets() {
    let db = setup_db().await;
    let tree = Tree::new();
    let target = write_file(&tree.target_a, "a.bin", b"target content");
    let outside = write_file(tree.root(), "elsewhere/b.bin", b"outside content");
    let inner = tree.undo.join("a.bin");
    let outer = tree.undo.join("b.bin");
    symlink(&target, &inner).unwrap();
    symlink(&outside, &outer).unwrap();
    let config = tree.config();

    let report = Runner::new(&db, &config).replace_with_content().await.unwrap();

    assert_eq!(report.replaced, 1);
    assert_eq!(report.examined, 1);
    assert!(!is_symlink(&inner));
    assert_eq!(fs::read(&inner).unwrap(), b"target content");
    assert!(is_symlink(&outer));
    assert!(!is_symlink(&target));
}

#[tokio::test]
async fn test_undo_everything_when_not_limited_to_targets() {
    let db = setup_db().await;
    let tree = Tree::new();
    let outside = write_file(tree.root(), "elsewhere/b.bin", b"outside content");
    let link = tree.undo.join("b.bin");
    symlink(&outside, &link).unwrap();
    let mut config = tree.config();
    config.finder.only_undo_symlinks_to_target_directories = false;

    let report = Runner::new(&db, &config).replace_with_content().await.unwrap();

    assert_eq!(report.replaced, 1);
    assert!(!is_symlink(&link));
    assert_eq!(fs::read(&link).unwrap(), b"outside content");
}

#[tokio::test]
async fn test_replace_then_undo_restores_content() {
    let db = setup_db().await;
    let tree = Tree::new();
    let watched = write_file(&tree.watch, "a.bin", b"duplicate content");
    write_file(&tree.target_a, "a.bin", b"duplicate content");
    let mut config = tree.config();
    config.finder.directories.undo_all_symlinks_directories = vec![WatchDirectory {
        dir: tree.watch.clone(),
    }];
    let runner = Runner::new(&db, &config);

    assert_eq!(runner.replace_with_symlinks().await.unwrap().replaced, 1);
    assert!(is_symlink(&watched));

    assert_eq!(runner.replace_with_content().await.unwrap().replaced, 1);
    assert!(!is_symlink(&watched));
    assert_eq!(fs::read(&watched).unwrap(), b"duplicate content");
    assert!(db.unfinished_steps().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_relative_directories_produce_readable_links() {
    let db = setup_db().await;
    let tree = Tree::in_working_dir();
    let watched = write_file(&tree.watch, "a.bin", b"duplicate content");
    let target = write_file(&tree.target_a, "a.bin", b"duplicate content");
    let mut config = tree.config();
    let dirs = &mut config.finder.directories;
    dirs.watch_directories = vec![WatchDirectory {
        dir: relative_to_cwd(&tree.watch),
    }];
    dirs.symlink_target_directories = vec![TargetDirectory {
        dir: relative_to_cwd(&tree.target_a),
        priority: 1,
    }];
    dirs.undo_all_symlinks_directories = vec![WatchDirectory {
        dir: relative_to_cwd(&tree.watch),
    }];
    let runner = Runner::new(&db, &config);

    assert_eq!(runner.replace_with_symlinks().await.unwrap().replaced, 1);
    assert!(is_symlink(&watched));
    let link = fs::read_link(&watched).unwrap();
    assert!(link.is_absolute());
    assert_eq!(link, target);
    assert_eq!(fs::read(&watched).unwrap(), b"duplicate content");

    // The absolute link still counts as pointing into the relative target directory
    assert_eq!(runner.replace_with_content().await.unwrap().replaced, 1);
    assert!(!is_symlink(&watched));
    assert_eq!(fs::read(&watched).unwrap(), b"duplicate content");
}

#[tokio::test]
async fn test_operator_commands() {
    let db = setup_db().await;
    let tree = Tree::new();
    write_file(&tree.watch, "a.bin", b"duplicate content");
    write_file(&tree.target_a, "a.bin", b"duplicate content");
    let config = tree.config();
    let runner = Runner::new(&db, &config);

    runner.replace_with_symlinks().await.unwrap();
    assert_eq!(runner.changelog(false).await.unwrap().len(), 4);
    assert!(runner.changelog(true).await.unwrap().is_empty());

    runner.clear_changelog().await.unwrap();
    assert!(runner.changelog(false).await.unwrap().is_empty());

    let cached = tree.target_a.join("a.bin");
    assert!(db.get_hash_entry(&cached.to_string_lossy()).await.unwrap().is_some());
    runner.clear_hashes().await.unwrap();
    assert!(db.get_hash_entry(&cached.to_string_lossy()).await.unwrap().is_none());
}
