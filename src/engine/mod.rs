//! Replacement engine
//!
//! # Architecture
//!
//! - **walk**: lazy recursive directory walk (walkdir)
//! - **progress**: byte progress bars while hashing
//! - **hasher**: streaming content hash
//! - **indexer**: candidate catalog over the target directories
//! - **checker**: eligibility, equality and the hash cache
//! - **prompt**: interactive confirmation
//! - **replacer**: symlink swap and content restore with changelog brackets
//! - **finder**: replace and undo passes

mod checker;
mod finder;
mod hasher;
mod indexer;
mod progress;
mod prompt;
mod replacer;
mod walk;

pub use checker::{Checker, Exclusions, PatternSet};
pub use finder::Finder;
pub use hasher::compute_hash;
pub use indexer::Indexer;
pub use progress::{HashBar, HashProgress};
pub use prompt::{Prompt, TerminalPrompt};
pub use replacer::{Replacer, TEMPORARY_SUFFIX};
pub use walk::walk_files;
