//! Persisted facts of a previous run
//!
//! @module incremental/snapshot

use std::collections::HashMap;

use chrono::Utc;

use crate::graph::tree::FileTree;
use crate::scan::FileRecord;

/// One file: path below its root, content digest and scanned facts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileSnapshot {
    pub path: String,
    pub digest: u128,
    pub record: FileRecord,
}

/// One root directory, identified by its path as configured
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RootSnapshot {
    pub path: String,
    pub files: Vec<FileSnapshot>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Snapshot {
    /// Unix timestamp (seconds) of the run that wrote it
    pub created_at: i64,
    pub roots: Vec<RootSnapshot>,
}

impl Snapshot {
    /// Capture the forest after a run. Files without a digest (unreadable)
    /// are left out, so the next run treats them as new.
    pub fn capture(tree: &FileTree) -> Self {
        let roots = tree
            .roots()
            .iter()
            .map(|root| RootSnapshot {
                path: root.path.to_string_lossy().into_owned(),
                files: tree
                    .files_under(root.node)
                    .into_iter()
                    .filter_map(|id| {
                        let data = tree.file(id)?;
                        Some(FileSnapshot {
                            path: tree.relative_path(id),
                            digest: data.digest.value()?,
                            record: data.record.clone(),
                        })
                    })
                    .collect(),
            })
            .collect();

        Self {
            created_at: Utc::now().timestamp(),
            roots,
        }
    }

    pub fn file_count(&self) -> usize {
        self.roots.iter().map(|r| r.files.len()).sum()
    }

    /// Lookup table keyed by (root path, relative path)
    pub fn index(&self) -> SnapshotIndex<'_> {
        let mut files = HashMap::with_capacity(self.file_count());
        for root in &self.roots {
            for file in &root.files {
                files.insert((root.path.as_str(), file.path.as_str()), file);
            }
        }
        SnapshotIndex { files }
    }
}

/// Borrowed lookup over a [`Snapshot`]
#[derive(Debug, Default)]
pub struct SnapshotIndex<'a> {
    files: HashMap<(&'a str, &'a str), &'a FileSnapshot>,
}

impl<'a> SnapshotIndex<'a> {
    pub fn get(&self, root: &str, path: &str) -> Option<&'a FileSnapshot> {
        self.files.get(&(root, path)).copied()
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::tree::Digest;
    use std::path::Path;

    #[test]
    fn test_capture_skips_undigested_files() {
        let mut tree = FileTree::new();
        let src = tree.add_root("src");
        let a = tree.insert_file(src, Path::new("a/x.h"));
        tree.insert_file(src, Path::new("b.h"));
        tree.file_mut(a).unwrap().digest = Digest::Computed(42);

        let snapshot = Snapshot::capture(&tree);
        assert_eq!(snapshot.file_count(), 1);
        assert_eq!(snapshot.roots[0].path, "src");

        let index = snapshot.index();
        assert_eq!(index.get("src", "a/x.h").map(|f| f.digest), Some(42));
        assert!(index.get("src", "b.h").is_none());
        assert!(index.get("tests", "a/x.h").is_none());
    }
}
