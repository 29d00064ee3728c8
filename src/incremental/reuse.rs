//! Digest comparison against the previous snapshot
//!
//! @module incremental/reuse

use std::path::PathBuf;

use rayon::prelude::*;
use tracing::{debug, warn};
use xxhash_rust::xxh3::xxh3_128;

use super::snapshot::Snapshot;
use crate::graph::tree::{Digest, FileTree, NodeFlags, NodeId};

/// Content digest of a buffer
#[inline]
pub fn digest_bytes(bytes: &[u8]) -> u128 {
    xxh3_128(bytes)
}

/// Hash every file of the forest in parallel. Unreadable files keep
/// [`Digest::Uncomputed`]; returns how many there were.
pub fn compute_digests(tree: &mut FileTree) -> usize {
    let jobs: Vec<(NodeId, PathBuf)> = tree
        .files()
        .into_iter()
        .map(|id| (id, tree.fs_path(id)))
        .collect();

    let results: Vec<(NodeId, Option<u128>)> = jobs
        .par_iter()
        .map(|(id, path)| match std::fs::read(path) {
            Ok(bytes) => (*id, Some(digest_bytes(&bytes))),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to hash file");
                (*id, None)
            }
        })
        .collect();

    let mut failed = 0;
    for (id, digest) in results {
        let Some(data) = tree.file_mut(id) else { continue };
        match digest {
            Some(value) => data.digest = Digest::Computed(value),
            None => failed += 1,
        }
    }
    failed
}

/// Outcome of the diff phase
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReuseStats {
    pub reused: usize,
    pub modified: usize,
    pub new: usize,
}

/// Compare every file's digest with the snapshot. Unchanged files get the
/// stored facts and are flagged `REUSED`; changed files are `MODIFIED`;
/// files the snapshot does not know are `NEW | MODIFIED`. Returns the files
/// that must be scanned, in tree order.
pub fn apply_snapshot(tree: &mut FileTree, previous: Option<&Snapshot>) -> (ReuseStats, Vec<NodeId>) {
    let index = previous.map(|s| s.index()).unwrap_or_default();
    let mut stats = ReuseStats::default();
    let mut to_scan = Vec::new();

    for id in tree.files() {
        let root = tree
            .root_of(id)
            .map(|r| r.path.to_string_lossy().into_owned())
            .unwrap_or_default();
        let relative = tree.relative_path(id);
        let stored = index.get(&root, &relative);

        let Some(data) = tree.file_mut(id) else { continue };
        match (stored, data.digest) {
            (Some(stored), Digest::Computed(digest)) if stored.digest == digest => {
                data.record = stored.record.clone();
                data.flags.insert(NodeFlags::REUSED);
                stats.reused += 1;
            }
            (Some(_), _) => {
                data.flags.insert(NodeFlags::MODIFIED);
                stats.modified += 1;
                to_scan.push(id);
            }
            (None, _) => {
                data.flags.insert(NodeFlags::NEW | NodeFlags::MODIFIED);
                stats.new += 1;
                stats.modified += 1;
                to_scan.push(id);
            }
        }
    }

    debug!(
        reused = stats.reused,
        modified = stats.modified,
        new = stats.new,
        "Snapshot diff applied"
    );
    (stats, to_scan)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::incremental::snapshot::{FileSnapshot, RootSnapshot};
    use crate::scan::{FileRecord, QualifiedName};
    use std::path::Path;
    use tempfile::TempDir;

    #[test]
    fn test_compute_digests() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("a.h"), "int a;").unwrap();
        std::fs::write(temp.path().join("b.h"), "int a;").unwrap();

        let mut tree = FileTree::new();
        let root = tree.add_root(temp.path());
        let a = tree.insert_file(root, Path::new("a.h"));
        let b = tree.insert_file(root, Path::new("b.h"));
        let gone = tree.insert_file(root, Path::new("gone.h"));

        assert_eq!(compute_digests(&mut tree), 1);
        let da = tree.file(a).unwrap().digest;
        assert_eq!(da, Digest::Computed(digest_bytes(b"int a;")));
        assert_eq!(da, tree.file(b).unwrap().digest);
        assert_eq!(tree.file(gone).unwrap().digest, Digest::Uncomputed);
    }

    #[test]
    fn test_apply_snapshot_classifies_files() {
        let mut tree = FileTree::new();
        let root = tree.add_root("src");
        let same = tree.insert_file(root, Path::new("same.h"));
        let changed = tree.insert_file(root, Path::new("changed.h"));
        let fresh = tree.insert_file(root, Path::new("fresh.h"));
        for (id, digest) in [(same, 1), (changed, 2), (fresh, 3)] {
            tree.file_mut(id).unwrap().digest = Digest::Computed(digest);
        }

        let mut record = FileRecord::default();
        record.classes.insert(QualifiedName::parse("Kept"));
        let snapshot = Snapshot {
            created_at: 0,
            roots: vec![RootSnapshot {
                path: "src".into(),
                files: vec![
                    FileSnapshot {
                        path: "same.h".into(),
                        digest: 1,
                        record: record.clone(),
                    },
                    FileSnapshot {
                        path: "changed.h".into(),
                        digest: 20,
                        record: record.clone(),
                    },
                    FileSnapshot {
                        path: "deleted.h".into(),
                        digest: 5,
                        record,
                    },
                ],
            }],
        };

        let (stats, to_scan) = apply_snapshot(&mut tree, Some(&snapshot));
        assert_eq!(
            stats,
            ReuseStats {
                reused: 1,
                modified: 2,
                new: 1
            }
        );
        // tree order: changed.h, fresh.h, same.h
        assert_eq!(to_scan, vec![changed, fresh]);

        let kept = tree.file(same).unwrap();
        assert!(kept.flags.contains(NodeFlags::REUSED));
        assert!(kept.record.classes.contains(&QualifiedName::parse("Kept")));
        assert!(tree.file(changed).unwrap().record.is_empty());
        assert!(tree
            .file(fresh)
            .unwrap()
            .flags
            .contains(NodeFlags::NEW | NodeFlags::MODIFIED));
    }

    #[test]
    fn test_no_snapshot_means_everything_new() {
        let mut tree = FileTree::new();
        let root = tree.add_root("src");
        tree.insert_file(root, Path::new("a.h"));
        let (stats, to_scan) = apply_snapshot(&mut tree, None);
        assert_eq!(stats.new, 1);
        assert_eq!(to_scan.len(), 1);
    }
}
