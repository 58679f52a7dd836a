//! Atomic file replacement.
//!
//! The target path is either fully replaced or left unchanged: content goes
//! to a temporary sibling file, is synced, then renamed over the target.

use log::warn;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

const TEMP_PREFIX: &str = ".hypernotes-";
const TEMP_SUFFIX: &str = ".tmp";

/// Atomically replaces `path` with `contents`.
///
/// Creates missing parent directories. The temporary file lives in the same
/// directory as `path` so the final rename never crosses filesystems; it is
/// removed again if any step fails.
///
/// # Errors
/// Returns the underlying I/O error from directory creation, writing,
/// syncing the temporary file or the final rename. Once the rename has
/// succeeded the call succeeds; a failed fsync of the parent directory is
/// only logged.
pub fn atomic_write(path: &Path, contents: &[u8]) -> io::Result<()> {
    replace_file(path, contents, sync_dir)
}

fn replace_file(
    path: &Path,
    contents: &[u8],
    sync_parent: impl FnOnce(&Path) -> io::Result<()>,
) -> io::Result<()> {
    let parent = parent_dir(path);
    fs::create_dir_all(&parent)?;

    let temp = tempfile::Builder::new()
        .prefix(TEMP_PREFIX)
        .suffix(TEMP_SUFFIX)
        .tempfile_in(&parent)?;

    {
        let mut writer = BufWriter::new(temp.as_file());
        writer.write_all(contents)?;
        writer.flush()?;
    }
    temp.as_file().sync_all()?;

    temp.persist(path).map_err(|err| err.error)?;
    if let Err(err) = sync_parent(&parent) {
        warn!(
            "event=atomic_write module=store status=degraded error_code=dir_sync_failed dir={} error={err}",
            parent.display()
        );
    }
    Ok(())
}

fn parent_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

#[cfg(unix)]
fn sync_dir(dir: &Path) -> io::Result<()> {
    File::open(dir)?.sync_all()
}

#[cfg(not(unix))]
fn sync_dir(_dir: &Path) -> io::Result<()> {
    Ok(())
}
