//! File forest arena
//!
//! Every directory and file of the scanned roots is a [`FileNode`] in one
//! flat `Vec`, addressed by [`NodeId`]. Ownership is the strict
//! parent/child tree; graph edges between files are plain `NodeId` sets and
//! may form cycles.
//!
//! @module graph/tree

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use bitflags::bitflags;
use compact_str::CompactString;

use crate::scan::FileRecord;

// =============================================================================
// IDS AND STATE
// =============================================================================

/// Index of a node in the arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

impl NodeId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Which way edges are followed when computing closures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// What a file depends on: its includes and the files implementing it
    Dependencies,
    /// What depends on a file: its includers and the headers it implements
    Dependents,
}

impl Direction {
    pub const ALL: [Direction; 2] = [Direction::Dependencies, Direction::Dependents];

    #[inline]
    fn slot(self) -> usize {
        match self {
            Direction::Dependencies => 0,
            Direction::Dependents => 1,
        }
    }
}

/// Content digest of a file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Digest {
    #[default]
    Uncomputed,
    Computed(u128),
}

impl Digest {
    pub fn value(self) -> Option<u128> {
        match self {
            Digest::Uncomputed => None,
            Digest::Computed(v) => Some(v),
        }
    }
}

/// Memoized transitive closure of one file in one direction
#[derive(Debug, Clone, Default)]
pub enum Closure {
    #[default]
    Uncomputed,
    Computed(Arc<BTreeSet<NodeId>>),
}

bitflags! {
    /// Per-file run state
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    #[repr(transparent)]
    pub struct NodeFlags: u8 {
        /// Content differs from the snapshot (or the file is new)
        const MODIFIED = 0b0000_0001;
        /// Not present in the snapshot
        const NEW = 0b0000_0010;
        /// Facts copied from the snapshot
        const REUSED = 0b0000_0100;
        /// Facts produced by the scanner in this run
        const SCANNED = 0b0000_1000;
        /// Unreadable or unscannable; facts are empty
        const SCAN_FAILED = 0b0001_0000;
    }
}

// =============================================================================
// NODES
// =============================================================================

/// Everything known about one regular file
#[derive(Debug, Clone, Default)]
pub struct FileData {
    pub record: FileRecord,
    pub digest: Digest,
    pub flags: NodeFlags,
    pub includes: BTreeSet<NodeId>,
    pub included_by: BTreeSet<NodeId>,
    /// Files whose declarations this file implements
    pub implements: BTreeSet<NodeId>,
    /// Files that implement declarations of this file
    pub implemented_by: BTreeSet<NodeId>,
    closures: [Closure; 2],
}

impl FileData {
    pub fn is_modified(&self) -> bool {
        self.flags.contains(NodeFlags::MODIFIED)
    }

    pub fn closure(&self, direction: Direction) -> Option<&Arc<BTreeSet<NodeId>>> {
        match &self.closures[direction.slot()] {
            Closure::Computed(set) => Some(set),
            Closure::Uncomputed => None,
        }
    }

    pub fn set_closure(&mut self, direction: Direction, set: Arc<BTreeSet<NodeId>>) {
        self.closures[direction.slot()] = Closure::Computed(set);
    }

    /// Direct neighbours in `direction`
    pub fn neighbors(&self, direction: Direction) -> impl Iterator<Item = NodeId> + '_ {
        let (a, b) = match direction {
            Direction::Dependencies => (&self.includes, &self.implemented_by),
            Direction::Dependents => (&self.included_by, &self.implements),
        };
        a.iter().chain(b.iter()).copied()
    }
}

#[derive(Debug, Clone)]
pub enum NodeKind {
    Directory {
        children: BTreeMap<CompactString, NodeId>,
    },
    File(Box<FileData>),
}

#[derive(Debug, Clone)]
pub struct FileNode {
    pub name: CompactString,
    pub parent: Option<NodeId>,
    pub kind: NodeKind,
}

impl FileNode {
    pub fn is_file(&self) -> bool {
        matches!(self.kind, NodeKind::File(_))
    }

    pub fn child(&self, name: &str) -> Option<NodeId> {
        match &self.kind {
            NodeKind::Directory { children } => children.get(name).copied(),
            NodeKind::File(_) => None,
        }
    }
}

/// A scanned root directory
#[derive(Debug, Clone)]
pub struct Root {
    /// Path as configured on the command line
    pub path: PathBuf,
    pub node: NodeId,
}

// =============================================================================
// FOREST
// =============================================================================

/// Arena of all roots, directories and files
#[derive(Debug, Clone, Default)]
pub struct FileTree {
    nodes: Vec<FileNode>,
    roots: Vec<Root>,
}

impl FileTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn roots(&self) -> &[Root] {
        &self.roots
    }

    fn push(&mut self, node: FileNode) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(node);
        id
    }

    /// Add a root directory; returns its node
    pub fn add_root(&mut self, path: impl Into<PathBuf>) -> NodeId {
        let path = path.into();
        let node = self.push(FileNode {
            name: CompactString::from(&*path.to_string_lossy()),
            parent: None,
            kind: NodeKind::Directory {
                children: BTreeMap::new(),
            },
        });
        self.roots.push(Root { path, node });
        node
    }

    /// Insert a file below `root`, creating intermediate directories.
    /// Inserting an existing path returns the existing node.
    pub fn insert_file(&mut self, root: NodeId, relative: &Path) -> NodeId {
        let segments: Vec<CompactString> = relative
            .components()
            .filter_map(|c| match c {
                Component::Normal(s) => Some(CompactString::from(&*s.to_string_lossy())),
                _ => None,
            })
            .collect();

        let mut current = root;
        for (i, segment) in segments.iter().enumerate() {
            if let Some(existing) = self.node(current).child(segment) {
                current = existing;
                continue;
            }
            let kind = if i + 1 == segments.len() {
                NodeKind::File(Box::default())
            } else {
                NodeKind::Directory {
                    children: BTreeMap::new(),
                }
            };
            let id = self.push(FileNode {
                name: segment.clone(),
                parent: Some(current),
                kind,
            });
            match &mut self.nodes[current.index()].kind {
                NodeKind::Directory { children } => {
                    children.insert(segment.clone(), id);
                }
                NodeKind::File(_) => unreachable!("file node {} used as a directory", current.0),
            }
            current = id;
        }
        current
    }

    #[inline]
    pub fn node(&self, id: NodeId) -> &FileNode {
        &self.nodes[id.index()]
    }

    pub fn file(&self, id: NodeId) -> Option<&FileData> {
        match &self.nodes[id.index()].kind {
            NodeKind::File(data) => Some(data),
            NodeKind::Directory { .. } => None,
        }
    }

    pub fn file_mut(&mut self, id: NodeId) -> Option<&mut FileData> {
        match &mut self.nodes[id.index()].kind {
            NodeKind::File(data) => Some(data),
            NodeKind::Directory { .. } => None,
        }
    }

    /// Directory containing `id` (the node itself if it is a directory)
    pub fn directory_of(&self, id: NodeId) -> NodeId {
        let node = self.node(id);
        match (&node.kind, node.parent) {
            (NodeKind::File(_), Some(parent)) => parent,
            _ => id,
        }
    }

    /// Descend from directory `from` along path segments. `.` stays, `..`
    /// goes to the parent; a missing segment fails the lookup.
    pub fn search<'s, I>(&self, from: NodeId, segments: I) -> Option<NodeId>
    where
        I: IntoIterator<Item = &'s str>,
    {
        let mut current = from;
        for segment in segments {
            current = match segment {
                "" | "." => current,
                ".." => self.node(current).parent?,
                name => self.node(current).child(name)?,
            };
        }
        Some(current)
    }

    /// Look up a path relative to `from`, split on `/` and `\`
    pub fn find_path(&self, from: NodeId, relative: &str) -> Option<NodeId> {
        self.search(from, relative.split(['/', '\\']))
    }

    /// Node for a filesystem path below one of the roots. Paths are matched
    /// lexically first, then after canonicalization.
    pub fn locate(&self, path: &Path) -> Option<NodeId> {
        let lookup = |path: &Path, canonical: bool| {
            self.roots.iter().find_map(|root| {
                let base = if canonical {
                    root.path.canonicalize().ok()?
                } else {
                    root.path.clone()
                };
                let relative = path.strip_prefix(&base).ok()?;
                self.find_path(root.node, &relative.to_string_lossy())
            })
        };
        lookup(path, false).or_else(|| lookup(&path.canonicalize().ok()?, true))
    }

    /// Top-level ancestor of `id` and its root entry
    pub fn root_of(&self, id: NodeId) -> Option<&Root> {
        let mut current = id;
        while let Some(parent) = self.node(current).parent {
            current = parent;
        }
        self.roots.iter().find(|r| r.node == current)
    }

    /// Path of `id` below its root, `/`-separated
    pub fn relative_path(&self, id: NodeId) -> String {
        let mut names = Vec::new();
        let mut current = id;
        while let Some(parent) = self.node(current).parent {
            names.push(self.node(current).name.as_str());
            current = parent;
        }
        names.reverse();
        names.join("/")
    }

    /// Path of `id` prefixed by its root path as configured
    pub fn display_path(&self, id: NodeId) -> String {
        let relative = self.relative_path(id);
        match self.root_of(id) {
            Some(root) => root.path.join(&relative).to_string_lossy().into_owned(),
            None => relative,
        }
    }

    /// Filesystem path of a node
    pub fn fs_path(&self, id: NodeId) -> PathBuf {
        match self.root_of(id) {
            Some(root) => root.path.join(self.relative_path(id)),
            None => PathBuf::from(self.relative_path(id)),
        }
    }

    /// All file nodes in tree order: roots in order, pre-order, children by name
    pub fn files(&self) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = Vec::new();
        for root in &self.roots {
            stack.push(root.node);
            while let Some(id) = stack.pop() {
                match &self.node(id).kind {
                    NodeKind::File(_) => out.push(id),
                    NodeKind::Directory { children } => {
                        stack.extend(children.values().rev().copied());
                    }
                }
            }
        }
        out
    }

    /// File nodes below one root, in tree order
    pub fn files_under(&self, root: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            match &self.node(id).kind {
                NodeKind::File(_) => out.push(id),
                NodeKind::Directory { children } => {
                    stack.extend(children.values().rev().copied());
                }
            }
        }
        out
    }

    // -------------------------------------------------------------------------
    // Edges
    // -------------------------------------------------------------------------

    /// `from` includes `to`
    pub fn add_include(&mut self, from: NodeId, to: NodeId) {
        if let Some(data) = self.file_mut(from) {
            data.includes.insert(to);
        }
        if let Some(data) = self.file_mut(to) {
            data.included_by.insert(from);
        }
    }

    /// `implementor` implements declarations of `declarer`
    pub fn add_implements(&mut self, implementor: NodeId, declarer: NodeId) {
        if let Some(data) = self.file_mut(implementor) {
            data.implements.insert(declarer);
        }
        if let Some(data) = self.file_mut(declarer) {
            data.implemented_by.insert(implementor);
        }
    }
}
