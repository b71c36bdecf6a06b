mod format;
mod path;

pub use format::{format_size, format_timestamp};
pub use path::{path_str, text_starts_with, with_suffix};
