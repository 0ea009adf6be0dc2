//! Utility modules.

pub mod file;
pub mod text;

pub use file::{check_file_size, format_file_size, is_excluded, read_file_content};
pub use text::{has_meaningful_content, preview};
