//! File-backed state store.

mod json_file;

pub use json_file::JsonFileStateStore;
