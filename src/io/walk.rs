//! Bounded recursive directory walk: the Work Selector's source 4
//! full-codebase fallback (spec.md §4.1).
//!
//! Grounded on `core::pipeline::file_discovery::discover_files`'s
//! `ignore::WalkBuilder` usage, generalized to just the filesystem-walk
//! branch (no git index) with an explicit file-size ceiling.

use std::path::{Path, PathBuf};

use ignore::WalkBuilder;
use tracing::warn;

/// Walk `root` respecting `.gitignore`/`.ignore` rules, returning files
/// whose extension is in `extensions` (case-insensitive, without the dot)
/// and whose size does not exceed `max_bytes`.
pub fn walk_source_files(root: &Path, extensions: &[String], max_bytes: u64) -> Vec<PathBuf> {
    let mut collected = Vec::new();
    let walker = WalkBuilder::new(root)
        .standard_filters(true)
        .git_ignore(true)
        .git_global(true)
        .git_exclude(true)
        .hidden(false)
        .build();

    for entry in walker {
        match entry {
            Ok(dir_entry) => {
                let path = dir_entry.path();
                if !dir_entry.file_type().map(|ft| ft.is_file()).unwrap_or(false) {
                    continue;
                }
                if !has_allowed_extension(path, extensions) {
                    continue;
                }
                match std::fs::metadata(path) {
                    Ok(meta) if meta.len() <= max_bytes => collected.push(path.to_path_buf()),
                    Ok(_) => {}
                    Err(err) => warn!("failed to stat {}: {err}", path.display()),
                }
            }
            Err(err) => warn!("failed to walk directory: {err}"),
        }
    }

    collected.sort();
    collected
}

fn has_allowed_extension(path: &Path, extensions: &[String]) -> bool {
    if extensions.is_empty() {
        return true;
    }
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| extensions.iter().any(|allowed| allowed.eq_ignore_ascii_case(e)))
        .unwrap_or(false)
}
