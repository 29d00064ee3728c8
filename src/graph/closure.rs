//! Transitive closures
//!
//! closure(F) = {F} ∪ closure of every neighbour of F in a [`Direction`].
//! Strongly connected components are found with Tarjan's algorithm, driven
//! by an explicit frame stack so deep include chains cannot overflow the
//! call stack. Components complete successors-first, so when one closes
//! every closure it needs is already memoized; all members of a cycle share
//! one set.
//!
//! @module graph/closure

use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::debug;

use super::tree::{Direction, FileTree, NodeId};

const UNVISITED: u32 = u32::MAX;

struct Frame {
    node: NodeId,
    neighbors: Vec<NodeId>,
    next: usize,
}

struct TarjanData {
    index: Vec<u32>,
    lowlink: Vec<u32>,
    on_stack: Vec<bool>,
    stack: Vec<NodeId>,
    counter: u32,
}

impl TarjanData {
    fn new(len: usize) -> Self {
        Self {
            index: vec![UNVISITED; len],
            lowlink: vec![0; len],
            on_stack: vec![false; len],
            stack: Vec::new(),
            counter: 0,
        }
    }

    fn enter(&mut self, tree: &FileTree, node: NodeId, direction: Direction) -> Frame {
        let i = node.index();
        self.index[i] = self.counter;
        self.lowlink[i] = self.counter;
        self.counter += 1;
        self.stack.push(node);
        self.on_stack[i] = true;

        let neighbors = tree
            .file(node)
            .map(|data| data.neighbors(direction).collect())
            .unwrap_or_default();
        Frame {
            node,
            neighbors,
            next: 0,
        }
    }

    /// Pop the component rooted at `root`
    fn pop_component(&mut self, root: NodeId) -> BTreeSet<NodeId> {
        let mut members = BTreeSet::new();
        while let Some(w) = self.stack.pop() {
            self.on_stack[w.index()] = false;
            members.insert(w);
            if w == root {
                break;
            }
        }
        members
    }
}

#[inline]
fn has_closure(tree: &FileTree, id: NodeId, direction: Direction) -> bool {
    tree.file(id).is_some_and(|d| d.closure(direction).is_some())
}

/// Compute and memoize the closure of every file in `direction`.
/// Files that already carry a closure are kept as they are.
/// Returns the number of components computed.
pub fn install_closures(tree: &mut FileTree, direction: Direction) -> usize {
    let mut data = TarjanData::new(tree.len());
    let mut components = 0;

    for start in tree.files() {
        if data.index[start.index()] != UNVISITED || has_closure(tree, start, direction) {
            continue;
        }

        let mut frames = vec![data.enter(tree, start, direction)];
        while let Some(top) = frames.len().checked_sub(1) {
            let frame = &mut frames[top];
            let v = frame.node;

            if frame.next < frame.neighbors.len() {
                let w = frame.neighbors[frame.next];
                frame.next += 1;

                if has_closure(tree, w, direction) {
                    continue;
                }
                if data.index[w.index()] == UNVISITED {
                    let child = data.enter(tree, w, direction);
                    frames.push(child);
                } else if data.on_stack[w.index()] {
                    data.lowlink[v.index()] = data.lowlink[v.index()].min(data.index[w.index()]);
                }
                continue;
            }

            frames.pop();
            if let Some(parent) = frames.last() {
                let p = parent.node.index();
                data.lowlink[p] = data.lowlink[p].min(data.lowlink[v.index()]);
            }

            if data.lowlink[v.index()] == data.index[v.index()] {
                let members = data.pop_component(v);
                close_component(tree, &members, direction);
                components += 1;
            }
        }
    }

    debug!(?direction, components, "Closures installed");
    components
}

/// Union the component with the memoized closures of its successors and
/// store the shared result on every member.
fn close_component(tree: &mut FileTree, members: &BTreeSet<NodeId>, direction: Direction) {
    let mut closure = members.clone();
    for &member in members {
        let Some(data) = tree.file(member) else { continue };
        for w in data.neighbors(direction) {
            if members.contains(&w) {
                continue;
            }
            if let Some(successor) = tree.file(w).and_then(|d| d.closure(direction)) {
                closure.extend(successor.iter().copied());
            }
        }
    }

    let shared = Arc::new(closure);
    for &member in members {
        if let Some(data) = tree.file_mut(member) {
            data.set_closure(direction, Arc::clone(&shared));
        }
    }
}

/// closure(F) = {F} ∪ includes ∪ implementors, transitively
pub fn install_dependencies(tree: &mut FileTree) -> usize {
    install_closures(tree, Direction::Dependencies)
}

/// Everything that transitively depends on a file
pub fn install_dependents(tree: &mut FileTree) -> usize {
    install_closures(tree, Direction::Dependents)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn tree_of(n: usize) -> (FileTree, Vec<NodeId>) {
        let mut tree = FileTree::new();
        let root = tree.add_root("src");
        let ids = (0..n)
            .map(|i| tree.insert_file(root, Path::new(&format!("f{i:06}.h"))))
            .collect();
        (tree, ids)
    }

    fn closure(tree: &FileTree, id: NodeId) -> Vec<NodeId> {
        tree.file(id)
            .unwrap()
            .closure(Direction::Dependencies)
            .unwrap()
            .iter()
            .copied()
            .collect()
    }

    #[test]
    fn test_chain() {
        let (mut tree, f) = tree_of(3);
        tree.add_include(f[0], f[1]);
        tree.add_include(f[1], f[2]);
        assert_eq!(install_dependencies(&mut tree), 3);

        assert_eq!(closure(&tree, f[0]), vec![f[0], f[1], f[2]]);
        assert_eq!(closure(&tree, f[1]), vec![f[1], f[2]]);
        assert_eq!(closure(&tree, f[2]), vec![f[2]]);
    }

    #[test]
    fn test_implementors_join_the_closure() {
        let (mut tree, f) = tree_of(3);
        // f0 includes header f1, f2 implements f1
        tree.add_include(f[0], f[1]);
        tree.add_implements(f[2], f[1]);
        install_dependencies(&mut tree);
        assert_eq!(closure(&tree, f[0]), vec![f[0], f[1], f[2]]);
        assert_eq!(closure(&tree, f[2]), vec![f[2]]);

        install_dependents(&mut tree);
        let users: Vec<NodeId> = tree.file(f[2]).unwrap().closure(Direction::Dependents).unwrap().iter().copied().collect();
        assert_eq!(users, vec![f[0], f[1], f[2]]);
    }

    #[test]
    fn test_cycle_members_share_closure() {
        let (mut tree, f) = tree_of(4);
        tree.add_include(f[0], f[1]);
        tree.add_include(f[1], f[0]);
        tree.add_include(f[1], f[2]);
        tree.add_implements(f[3], f[3]);
        install_dependencies(&mut tree);

        assert_eq!(closure(&tree, f[0]), vec![f[0], f[1], f[2]]);
        assert_eq!(closure(&tree, f[1]), vec![f[0], f[1], f[2]]);
        let a = tree.file(f[0]).unwrap().closure(Direction::Dependencies).unwrap();
        let b = tree.file(f[1]).unwrap().closure(Direction::Dependencies).unwrap();
        assert!(Arc::ptr_eq(a, b));
        assert_eq!(closure(&tree, f[3]), vec![f[3]]);
    }

    #[test]
    fn test_memoized_closures_are_kept() {
        let (mut tree, f) = tree_of(2);
        tree.add_include(f[0], f[1]);
        install_dependencies(&mut tree);
        let first = Arc::clone(tree.file(f[0]).unwrap().closure(Direction::Dependencies).unwrap());
        assert_eq!(install_dependencies(&mut tree), 0);
        let second = tree.file(f[0]).unwrap().closure(Direction::Dependencies).unwrap();
        assert!(Arc::ptr_eq(&first, second));
    }

    #[test]
    fn test_deep_cycle_does_not_recurse() {
        let n = 20_000;
        let (mut tree, f) = tree_of(n);
        for i in 0..n {
            tree.add_include(f[i], f[(i + 1) % n]);
        }
        assert_eq!(install_dependencies(&mut tree), 1);
        assert_eq!(tree.file(f[n / 2]).unwrap().closure(Direction::Dependencies).unwrap().len(), n);
    }
}
