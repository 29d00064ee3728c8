//! Include resolution
//!
//! Quoted includes look next to the including file first, then in the
//! include directories in order. Angled includes reverse that. The first
//! match wins; a directory never satisfies an include.
//!
//! @module graph/include

use std::path::PathBuf;

use tracing::{debug, warn};

use super::tree::{FileTree, NodeId};
use crate::scan::{IncludeDirective, IncludeKind};

/// Ordered include search directories, as nodes of the forest
#[derive(Debug, Clone, Default)]
pub struct IncludeResolver {
    dirs: Vec<NodeId>,
}

impl IncludeResolver {
    /// The forest roots, followed by the configured extra directories that
    /// lie inside the forest
    pub fn new(tree: &FileTree, extra: &[PathBuf]) -> Self {
        let mut dirs: Vec<NodeId> = tree.roots().iter().map(|r| r.node).collect();
        for path in extra {
            match tree.locate(path) {
                Some(id) if !tree.node(id).is_file() => {
                    if !dirs.contains(&id) {
                        dirs.push(id);
                    }
                }
                _ => warn!(
                    path = %path.display(),
                    "Include directory is not inside a scanned root, ignored"
                ),
            }
        }
        Self { dirs }
    }

    pub fn dirs(&self) -> &[NodeId] {
        &self.dirs
    }

    /// Resolve one directive of the file `from`
    pub fn resolve(&self, tree: &FileTree, from: NodeId, directive: &IncludeDirective) -> Option<NodeId> {
        let here = tree.directory_of(from);
        let lookup = |dir: NodeId| {
            tree.search(dir, directive.segments())
                .filter(|&id| tree.node(id).is_file())
        };

        match directive.kind {
            IncludeKind::Quoted => lookup(here).or_else(|| self.dirs.iter().find_map(|&d| lookup(d))),
            IncludeKind::Angled => self.dirs.iter().find_map(|&d| lookup(d)).or_else(|| lookup(here)),
        }
    }
}

/// Add an include edge for every resolvable directive of every file.
/// Returns the number of unresolved directives.
pub fn link_includes(tree: &mut FileTree, resolver: &IncludeResolver) -> usize {
    let mut edges = Vec::new();
    let mut unresolved = 0;

    for id in tree.files() {
        let Some(data) = tree.file(id) else { continue };
        for directive in &data.record.includes {
            match resolver.resolve(tree, id, directive) {
                Some(target) => edges.push((id, target)),
                None => {
                    unresolved += 1;
                    debug!(
                        file = %tree.display_path(id),
                        include = %directive,
                        "Unresolved include"
                    );
                }
            }
        }
    }

    for (from, to) in edges {
        tree.add_include(from, to);
    }
    unresolved
}
