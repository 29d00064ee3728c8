//! Declaration resolver
//!
//! Matches every implemented name to the file(s) declaring it, using two
//! tries keyed by name segments: one for classes, one for free functions.
//!
//! For an implementation `A::B::m` the rules are tried in order and the
//! first that matches wins:
//!
//! 1. `A::B::m` declared as a free function
//! 2. `A::B` declared as a class
//! 3. `N::A::B` declared as a class, for each `using namespace N` of the file
//!
//! Every declaring file of the match receives an edge, so ties are kept.
//!
//! @module graph/resolve

use compact_str::CompactString;
use smallvec::SmallVec;
use tracing::trace;

use super::tree::{FileTree, NodeId};
use crate::core::trie::Trie;
use crate::scan::QualifiedName;

/// Declaring files of one name
pub type Declarers = SmallVec<[NodeId; 2]>;

/// Name segments to declaring files
#[derive(Debug, Default)]
pub struct DeclarationTrie {
    trie: Trie<CompactString, Declarers>,
}

impl DeclarationTrie {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.trie.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trie.is_empty()
    }

    pub fn declare(&mut self, name: &QualifiedName, file: NodeId) {
        let declarers = self
            .trie
            .entry_or_insert_with(name.segments().iter().cloned(), Declarers::new);
        if !declarers.contains(&file) {
            declarers.push(file);
        }
    }

    pub fn lookup(&self, name: &QualifiedName) -> Option<&Declarers> {
        if name.is_empty() {
            return None;
        }
        self.trie
            .get(name.segments().iter().map(|s| s.as_str()))
            .filter(|d| !d.is_empty())
    }
}

/// Class and free-function declarations of the whole forest
#[derive(Debug, Default)]
pub struct Declarations {
    pub classes: DeclarationTrie,
    pub functions: DeclarationTrie,
}

impl Declarations {
    pub fn build(tree: &FileTree) -> Self {
        let mut declarations = Self::default();
        for id in tree.files() {
            let Some(data) = tree.file(id) else { continue };
            for class in &data.record.classes {
                declarations.classes.declare(class, id);
            }
            for function in &data.record.functions {
                declarations.functions.declare(function, id);
            }
        }
        declarations
    }

    /// Files declaring `implemented`, by the first matching rule
    pub fn resolve(&self, implemented: &QualifiedName, using: &[QualifiedName]) -> Option<&Declarers> {
        if let Some(found) = self.functions.lookup(implemented) {
            return Some(found);
        }
        let owner = implemented.parent();
        if owner.is_empty() {
            return None;
        }
        if let Some(found) = self.classes.lookup(&owner) {
            return Some(found);
        }
        using
            .iter()
            .find_map(|namespace| self.classes.lookup(&owner.prepended(namespace)))
    }
}

/// Add an implements edge from every file to the declarers of what it
/// implements. Returns the number of edges added.
pub fn link_implementations(tree: &mut FileTree, declarations: &Declarations) -> usize {
    let mut edges: Vec<(NodeId, NodeId)> = Vec::new();

    for id in tree.files() {
        let Some(data) = tree.file(id) else { continue };
        for name in &data.record.implements {
            match declarations.resolve(name, &data.record.using_namespaces) {
                Some(declarers) => edges.extend(declarers.iter().map(|&d| (id, d))),
                None => trace!(file = %tree.display_path(id), name = %name, "Unresolved implementation"),
            }
        }
    }

    edges.sort_unstable();
    edges.dedup();
    let added = edges.len();
    for (implementor, declarer) in edges {
        tree.add_implements(implementor, declarer);
    }
    added
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::closure::install_dependencies;
    use crate::graph::tree::Direction;
    use std::path::Path;

    fn name(s: &str) -> QualifiedName {
        QualifiedName::parse(s)
    }

    #[test]
    fn test_resolution_rules_in_order() {
        let mut declarations = Declarations::default();
        declarations.functions.declare(&name("util::clamp"), NodeId(1));
        declarations.classes.declare(&name("util"), NodeId(9));
        declarations.classes.declare(&name("geo::Point"), NodeId(2));
        declarations.classes.declare(&name("geo::Point"), NodeId(3));

        // rule 1 wins over rule 2
        let found = declarations.resolve(&name("util::clamp"), &[]).unwrap();
        assert_eq!(found.as_slice(), &[NodeId(1)]);

        // rule 2, ties all kept
        let found = declarations.resolve(&name("geo::Point::norm"), &[]).unwrap();
        assert_eq!(found.as_slice(), &[NodeId(2), NodeId(3)]);

        // rule 3 through a using directive
        assert!(declarations.resolve(&name("Point::norm"), &[]).is_none());
        let found = declarations
            .resolve(&name("Point::norm"), &[name("std"), name("geo")])
            .unwrap();
        assert_eq!(found.as_slice(), &[NodeId(2), NodeId(3)]);

        // free function without declaration
        assert!(declarations.resolve(&name("main"), &[]).is_none());
    }

    #[test]
    fn test_prefix_is_not_a_match() {
        let mut trie = DeclarationTrie::new();
        trie.declare(&name("a::b::C"), NodeId(0));
        assert!(trie.lookup(&name("a::b")).is_none());
        assert!(trie.lookup(&name("a::b::C")).is_some());
        assert!(trie.lookup(&QualifiedName::new()).is_none());
    }

    #[test]
    fn test_self_loop_for_in_file_method() {
        let mut tree = FileTree::new();
        let root = tree.add_root("src");
        let foo = tree.insert_file(root, Path::new("foo.cpp"));
        let record = crate::scan::scan_source(
            Path::new("foo.cpp"),
            b"class Foo { void bar(); };\nvoid Foo::bar(){}\n",
        )
        .unwrap();
        tree.file_mut(foo).unwrap().record = record;

        let declarations = Declarations::build(&tree);
        assert_eq!(link_implementations(&mut tree, &declarations), 1);
        let data = tree.file(foo).unwrap();
        assert!(data.implements.contains(&foo));
        assert!(data.implemented_by.contains(&foo));

        install_dependencies(&mut tree);
        let closure = tree.file(foo).unwrap().closure(Direction::Dependencies).unwrap();
        assert_eq!(closure.iter().copied().collect::<Vec<_>>(), vec![foo]);
    }
}
