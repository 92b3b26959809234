//! Atomic I/O operations

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::{Error, Result};

/// Write content atomically to a file.
///
/// Uses write-to-temp-then-rename so a reader only ever sees the previous
/// complete file or the new complete file. The temp file is removed if any
/// step fails.
pub fn write_atomic(path: &Path, content: &[u8]) -> Result<()> {
    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
    }

    // Same directory keeps the rename on one filesystem
    let temp_path = sibling(path, "tmp");

    let result = write_temp(&temp_path, content)
        .and_then(|()| fs::rename(&temp_path, path).map_err(|e| Error::io(path, e)));

    if result.is_err() {
        let _ = fs::remove_file(&temp_path);
    }
    result
}

fn write_temp(temp_path: &Path, content: &[u8]) -> Result<()> {
    let mut temp_file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(temp_path)
        .map_err(|e| Error::io(temp_path, e))?;

    temp_file
        .write_all(content)
        .map_err(|e| Error::io(temp_path, e))?;

    // Flush to disk before the rename makes it visible
    temp_file
        .sync_all()
        .map_err(|e| Error::io(temp_path, e))
}

/// Read a whole file, reporting a missing file as [`Error::NotFound`].
pub fn read_bytes(path: &Path) -> Result<Vec<u8>> {
    fs::read(path).map_err(|e| Error::read(path, e))
}

/// Read text content from a file.
pub fn read_text(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|e| Error::read(path, e))
}

/// Write text content to a file atomically.
pub fn write_text(path: &Path, content: &str) -> Result<()> {
    write_atomic(path, content.as_bytes())
}

/// Replace `target` with `source`, which may be a file or a directory.
///
/// `source` is moved when possible and copied otherwise (e.g. when it lives
/// on another filesystem). The new content is staged next to `target` first,
/// so a failure before the final swap leaves `target` untouched.
pub fn replace_path(source: &Path, target: &Path) -> Result<()> {
    if source == target {
        return Ok(());
    }
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
    }

    let staged = sibling(target, "staged");
    if fs::rename(source, &staged).is_err() {
        if let Err(err) = copy_recursive(source, &staged) {
            let _ = remove_path(&staged);
            return Err(err);
        }
    }

    // Files swap with a single rename
    if staged.is_file() && !target.is_dir() {
        return fs::rename(&staged, target).map_err(|e| {
            let _ = fs::remove_file(&staged);
            Error::io(target, e)
        });
    }

    let retired = sibling(target, "old");
    let had_previous = fs::symlink_metadata(target).is_ok();
    if had_previous {
        fs::rename(target, &retired).map_err(|e| {
            let _ = remove_path(&staged);
            Error::io(target, e)
        })?;
    }

    if let Err(e) = fs::rename(&staged, target) {
        if had_previous {
            let _ = fs::rename(&retired, target);
        }
        let _ = remove_path(&staged);
        return Err(Error::io(target, e));
    }

    if had_previous {
        remove_path(&retired)?;
    }
    Ok(())
}

/// Remove a file or a directory tree. Missing paths are ignored.
pub fn remove_path(path: &Path) -> Result<()> {
    let metadata = match fs::symlink_metadata(path) {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(Error::io(path, e)),
    };
    if metadata.is_dir() {
        fs::remove_dir_all(path).map_err(|e| Error::io(path, e))
    } else {
        fs::remove_file(path).map_err(|e| Error::io(path, e))
    }
}

fn copy_recursive(source: &Path, destination: &Path) -> Result<()> {
    let metadata = fs::metadata(source).map_err(|e| Error::read(source, e))?;
    if !metadata.is_dir() {
        fs::copy(source, destination).map_err(|e| Error::io(destination, e))?;
        return Ok(());
    }

    fs::create_dir_all(destination).map_err(|e| Error::io(destination, e))?;
    let entries = fs::read_dir(source).map_err(|e| Error::io(source, e))?;
    for entry in entries {
        let entry = entry.map_err(|e| Error::io(source, e))?;
        copy_recursive(&entry.path(), &destination.join(entry.file_name()))?;
    }
    Ok(())
}

/// Hidden, uniquely named path next to `path`: `.<file>.<uuid>.<suffix>`.
fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let name = format!(
        ".{}.{}.{}",
        path.file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_default(),
        uuid::Uuid::new_v4().simple(),
        suffix
    );
    path.with_file_name(name)
}
