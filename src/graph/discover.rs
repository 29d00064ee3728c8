//! Directory enumeration
//!
//! @module graph/discover

use std::path::{Path, PathBuf};

use tracing::debug;
use walkdir::WalkDir;

use super::tree::FileTree;
use crate::core::config::Config;
use crate::core::error::Result;

/// Source files below `root`, relative to it, sorted by name.
///
/// An entry whose relative path contains an ignored substring is dropped;
/// for directories the whole subtree is skipped.
pub fn discover_files(root: &Path, config: &Config) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    let walker = WalkDir::new(root)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| {
            let relative = entry.path().strip_prefix(root).unwrap_or(entry.path());
            let relative = relative.to_string_lossy();
            relative.is_empty() || !config.is_ignored(&relative)
        });

    for entry in walker {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        if !config.is_source_file(path) {
            continue;
        }
        if let Ok(relative) = path.strip_prefix(root) {
            files.push(relative.to_path_buf());
        }
    }

    debug!(root = %root.display(), files = files.len(), "Discovered source files");
    Ok(files)
}

/// Build the forest for `roots` (in order) from the file system
pub fn build_forest(roots: &[PathBuf], config: &Config) -> Result<FileTree> {
    let mut tree = FileTree::new();
    for root in roots {
        let files = discover_files(root, config)?;
        let node = tree.add_root(root.clone());
        for relative in files {
            tree.insert_file(node, &relative);
        }
    }
    Ok(tree)
}
