use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "symlinkerr", version, about = "Replace duplicate files with symlinks to a preferred copy")]
pub struct Cli {
    /// Path to the YAML configuration file (created with defaults if missing)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Ask for confirmation before every filesystem change
    #[arg(short, long)]
    pub interactive: bool,

    /// What to do; watches the configured directories when omitted
    #[command(subcommand)]
    pub action: Option<Action>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Run the replace and undo passes forever, once per configured interval
    Watch,

    /// Index the target directories and replace duplicates with symlinks
    ReplaceWithSymlinks,

    /// Replace symlinks in the undo directories with the content they point to
    ReplaceWithContent,

    /// Delete every changelog row
    ClearChangelog,

    /// Delete every cached content hash
    ClearHashes,

    /// List changelog rows
    Changelog {
        /// Only list steps that started but never committed
        #[arg(long)]
        unfinished: bool,

        /// Output as JSON for scripting
        #[arg(long)]
        json: bool,
    },
}

impl Cli {
    pub fn action(&self) -> Action {
        self.action.clone().unwrap_or(Action::Watch)
    }
}
