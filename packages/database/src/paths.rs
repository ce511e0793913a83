//! Canonical file paths for embedded `SQLite` storage.
//!
//! Relative `sqlite://` paths in `DATABASE_URL` are resolved against the
//! current working directory, like the server and CLI binaries expect.

use std::path::{Path, PathBuf};

/// Returns the `data/` directory under the current working directory.
#[must_use]
pub fn data_dir() -> PathBuf {
    PathBuf::from("data")
}

/// Returns the default `SQLite` database path, `data/immigration_data.db`.
#[must_use]
pub fn default_sqlite_path() -> PathBuf {
    data_dir().join("immigration_data.db")
}

/// Ensures the parent directory of `path` exists, creating it if
/// necessary.
///
/// # Errors
///
/// Returns an I/O error if the directory cannot be created.
pub fn ensure_parent_dir(path: &Path) -> std::io::Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() && !parent.exists() => {
            std::fs::create_dir_all(parent)
        }
        _ => Ok(()),
    }
}
