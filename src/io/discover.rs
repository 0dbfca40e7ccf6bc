use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::error::{Result, ToolError};
use crate::options::MergeOptions;

/// Prefix Office uses for the lock file it keeps next to an open workbook.
const LOCK_FILE_PREFIX: &str = "~$";

/// Recursively collects spreadsheet files under `root`.
///
/// Entries are visited depth-first with each directory's children sorted by
/// file name, so the result is stable for a given filesystem state.
/// Unreadable directory entries are logged and skipped.
pub fn discover_files(root: &Path, options: &MergeOptions) -> Result<Vec<PathBuf>> {
    if !root.is_dir() {
        return Err(ToolError::MissingInput(root.to_path_buf()));
    }

    let excluded: Vec<PathBuf> = options
        .exclude
        .iter()
        .map(|path| canonical(path))
        .collect();

    let mut files = Vec::new();
    for entry in WalkDir::new(root).follow_links(true).sort_by_file_name() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                warn!(error = %err, "skipping unreadable directory entry");
                continue;
            }
        };

        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        if !options.accepts_extension(path) {
            continue;
        }

        if is_lock_file(path) {
            debug!(path = %path.display(), "ignoring office lock file");
            continue;
        }

        if excluded.contains(&canonical(path)) {
            debug!(path = %path.display(), "ignoring excluded file");
            continue;
        }

        files.push(path.to_path_buf());
    }

    debug!(root = %root.display(), file_count = files.len(), "discovered spreadsheet files");
    Ok(files)
}

fn is_lock_file(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| name.starts_with(LOCK_FILE_PREFIX))
}

fn canonical(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}
