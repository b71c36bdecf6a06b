use anyhow::{Context, Result};
use clap::Parser;
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::info;

use symlinkerr::cli::{Action, Cli};
use symlinkerr::config::Config;
use symlinkerr::logging;
use symlinkerr::runner::{format_changelog, format_report, open_database, Runner};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config_path = cli.config.clone().unwrap_or_else(Config::default_path);

    let config = load_config(&config_path)?;
    logging::init(&config.logger.level);
    info!(config = %config_path.display(), "Starting symlinkerr");

    match cli.action() {
        Action::Watch => watch(&config_path, cli.interactive).await,
        Action::ReplaceWithSymlinks => {
            let db = open_database(&config).await?;
            let report = Runner::new(&db, &config)
                .interactive(cli.interactive)
                .show_progress(true)
                .replace_with_symlinks()
                .await?;
            print!("{}", format_report("Replace with symlinks", &report, config.replacer.dry_run));
            Ok(())
        }
        Action::ReplaceWithContent => {
            let db = open_database(&config).await?;
            let report = Runner::new(&db, &config)
                .interactive(cli.interactive)
                .replace_with_content()
                .await?;
            print!("{}", format_report("Replace with content", &report, config.replacer.dry_run));
            Ok(())
        }
        Action::ClearChangelog => {
            let db = open_database(&config).await?;
            Runner::new(&db, &config).clear_changelog().await?;
            eprintln!("Changelog cleared");
            Ok(())
        }
        Action::ClearHashes => {
            let db = open_database(&config).await?;
            Runner::new(&db, &config).clear_hashes().await?;
            eprintln!("Hash cache cleared");
            Ok(())
        }
        Action::Changelog { unfinished, json } => {
            let db = open_database(&config).await?;
            let records = Runner::new(&db, &config).changelog(unfinished).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&records)?);
            } else {
                print!("{}", format_changelog(&records));
            }
            Ok(())
        }
    }
}

fn load_config(path: &Path) -> Result<Config> {
    Config::load_or_create(path)
        .with_context(|| format!("Could not load configuration from {}", path.display()))
}

/// Run both passes forever, re-reading the configuration before each iteration
async fn watch(config_path: &Path, interactive: bool) -> Result<()> {
    loop {
        let start = Instant::now();
        let config = load_config(config_path)?;
        logging::set_level(&config.logger.level);
        let interval = Duration::from_secs(config.watcher.interval_seconds);

        {
            let db = open_database(&config).await?;
            let report = Runner::new(&db, &config)
                .interactive(interactive)
                .show_progress(true)
                .watch_iteration()
                .await?;
            print!("{}", format_report("Watch iteration", &report, config.replacer.dry_run));
        }

        let elapsed = start.elapsed();
        let pause = if elapsed < interval {
            interval - elapsed
        } else {
            interval
        };
        info!(elapsed = ?elapsed, sleep = ?pause, "Iteration finished");
        tokio::time::sleep(pause).await;
    }
}
