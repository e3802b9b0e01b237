//! Utility modules.

pub mod file;

pub use file::{calculate_checksum, read_text_file, resolve_upload_path};
