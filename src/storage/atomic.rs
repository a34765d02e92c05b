use crate::storage::StorageResult;
use std::ffi::OsString;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Sibling path used while a document is being written
pub fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(OsString::from)
        .unwrap_or_else(|| OsString::from("document"));
    name.push(".tmp");
    path.with_file_name(name)
}

/// Writes `contents` to `path` so that readers see either the old or the new document
///
/// The data goes to a temp file in the same directory, is synced, and then
/// renamed over the target. A failure at any step leaves the target untouched.
pub fn write_atomic(path: &Path, contents: &[u8]) -> StorageResult<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let tmp = temp_path(path);
    let result = (|| -> std::io::Result<()> {
        let mut file = File::create(&tmp)?;
        file.write_all(contents)?;
        file.sync_all()?;
        fs::rename(&tmp, path)
    })();

    if result.is_err() && tmp.is_file() {
        let _ = fs::remove_file(&tmp);
    }

    Ok(result?)
}
