//! Byte progress while hashing large files

use indicatif::{ProgressBar, ProgressStyle};

const TEMPLATE: &str =
    "{spinner:.green} {msg}: [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({bytes_per_sec}, {eta})";

/// When hashing draws a progress bar
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum HashProgress {
    #[default]
    Hidden,
    /// On stderr, for files of at least `min_bytes`
    LargeFiles { min_bytes: u64 },
}

impl HashProgress {
    pub fn large_files(min_bytes: u64) -> Self {
        HashProgress::LargeFiles { min_bytes }
    }

    fn draws(self, total_bytes: u64) -> bool {
        matches!(self, HashProgress::LargeFiles { min_bytes } if total_bytes >= min_bytes)
    }

    /// Bar for hashing `filename`; hidden below the threshold
    pub fn start(self, filename: &str, total_bytes: u64) -> HashBar {
        if !self.draws(total_bytes) {
            return HashBar(ProgressBar::hidden());
        }
        let style = ProgressStyle::with_template(TEMPLATE)
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=>-");
        HashBar(
            ProgressBar::new(total_bytes)
                .with_style(style)
                .with_message(filename.to_string()),
        )
    }
}

/// Cleared from the terminal when dropped, whether hashing finished or failed
pub struct HashBar(ProgressBar);

impl HashBar {
    pub fn inc(&self, n: u64) {
        self.0.inc(n);
    }
}

impl Drop for HashBar {
    fn drop(&mut self) {
        self.0.finish_and_clear();
    }
}
