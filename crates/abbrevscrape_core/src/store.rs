use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::error::ScrapeError;

/// Read a user-maintained override list, one candidate per line.
///
/// Empty lines (including the one produced by a trailing newline) are
/// dropped; everything else is returned untouched for the validity filter.
pub fn read_override_list(path: &Path) -> Result<Vec<String>, ScrapeError> {
    let content = fs::read_to_string(path).map_err(|error| ScrapeError::storage(path, error))?;
    Ok(split_lines(&content))
}

/// Read a list previously written by [`write_list`].
pub fn read_list(path: &Path) -> Result<Vec<String>, ScrapeError> {
    read_override_list(path)
}

/// Number of non-blank lines, or `None` when the file does not exist.
pub fn count_entries(path: &Path) -> Result<Option<usize>, ScrapeError> {
    match fs::read_to_string(path) {
        Ok(content) => Ok(Some(split_lines(&content).len())),
        Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(error) => Err(ScrapeError::storage(path, error)),
    }
}

/// Replace `path` with one entry per line, each terminated by `\n`.
///
/// The content lands in a sibling temp file first and is renamed over the
/// destination, so readers never observe a half-written list.
pub fn write_list<S: AsRef<str>>(path: &Path, entries: &[S]) -> Result<(), ScrapeError> {
    let mut rendered = String::new();
    for entry in entries {
        rendered.push_str(entry.as_ref());
        rendered.push('\n');
    }

    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).map_err(|error| ScrapeError::storage(parent, error))?;
    }
    let staging = staging_path(path);
    fs::write(&staging, rendered).map_err(|error| ScrapeError::storage(&staging, error))?;
    if let Err(error) = fs::rename(&staging, path) {
        let _ = fs::remove_file(&staging);
        return Err(ScrapeError::storage(path, error));
    }
    Ok(())
}

/// Create an empty list file unless one already exists. Returns `true` when created.
pub fn ensure_list_file(path: &Path) -> Result<bool, ScrapeError> {
    if path.exists() {
        return Ok(false);
    }
    write_list::<&str>(path, &[])?;
    Ok(true)
}

fn split_lines(content: &str) -> Vec<String> {
    content
        .split('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line))
        .filter(|line| !line.is_empty())
        .map(ToString::to_string)
        .collect()
}

fn staging_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|value| value.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}
