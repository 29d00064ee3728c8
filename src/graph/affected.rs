//! Affected-set propagation
//!
//! A file is affected when its dependency closure contains a modified file.
//!
//! @module graph/affected

use std::collections::BTreeSet;

use tracing::debug;

use super::closure::install_dependencies;
use super::tree::{Direction, FileTree, NodeId};

/// What to leave out of the affected list
#[derive(Debug, Clone, Copy, Default)]
pub struct AffectedOptions {
    /// Root of the test tree, if any
    pub test_root: Option<NodeId>,
    /// Keep test files implementing a free `main` (test runner entry points)
    pub keep_test_main: bool,
}

/// Affected files in tree order. Installs dependency closures first if
/// they are not there yet.
pub fn collect_affected(tree: &mut FileTree, options: AffectedOptions) -> Vec<NodeId> {
    install_dependencies(tree);

    let test_files: BTreeSet<NodeId> = match options.test_root {
        Some(root) if !options.keep_test_main => tree.files_under(root).into_iter().collect(),
        _ => BTreeSet::new(),
    };

    let affected: Vec<NodeId> = tree
        .files()
        .into_iter()
        .filter(|&id| is_affected(tree, id))
        .filter(|id| {
            let runner = test_files.contains(id)
                && tree.file(*id).is_some_and(|d| d.record.implements_main());
            if runner {
                debug!(file = %tree.display_path(*id), "Skipping test runner entry point");
            }
            !runner
        })
        .collect();

    debug!(affected = affected.len(), "Affected set collected");
    affected
}

fn is_affected(tree: &FileTree, id: NodeId) -> bool {
    let Some(closure) = tree.file(id).and_then(|d| d.closure(Direction::Dependencies)) else {
        return false;
    };
    closure
        .iter()
        .any(|&member| tree.file(member).is_some_and(|d| d.is_modified()))
}

/// Root-prefixed paths of `ids`
pub fn display_paths(tree: &FileTree, ids: &[NodeId]) -> Vec<String> {
    ids.iter().map(|&id| tree.display_path(id)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::closure::install_dependents;
    use crate::graph::tree::NodeFlags;
    use crate::scan::QualifiedName;
    use std::path::Path;

    /// src/{a.h, a.cpp, b.h}, tests/{a_test.cpp, main.cpp}
    fn project() -> (FileTree, NodeId, [NodeId; 5]) {
        let mut tree = FileTree::new();
        let src = tree.add_root("src");
        let tests = tree.add_root("tests");
        let a_h = tree.insert_file(src, Path::new("a.h"));
        let a_cpp = tree.insert_file(src, Path::new("a.cpp"));
        let b_h = tree.insert_file(src, Path::new("b.h"));
        let a_test = tree.insert_file(tests, Path::new("a_test.cpp"));
        let main = tree.insert_file(tests, Path::new("main.cpp"));

        tree.add_include(a_cpp, a_h);
        tree.add_implements(a_cpp, a_h);
        tree.add_include(a_test, a_h);
        tree.add_include(main, a_h);
        tree.file_mut(main)
            .unwrap()
            .record
            .implements
            .insert(QualifiedName::parse("main"));
        (tree, tests, [a_h, a_cpp, b_h, a_test, main])
    }

    fn modify(tree: &mut FileTree, id: NodeId) {
        tree.file_mut(id).unwrap().flags.insert(NodeFlags::MODIFIED);
    }

    #[test]
    fn test_nothing_modified_nothing_affected() {
        let (mut tree, tests, _) = project();
        let options = AffectedOptions {
            test_root: Some(tests),
            keep_test_main: false,
        };
        assert!(collect_affected(&mut tree, options).is_empty());
    }

    #[test]
    fn test_implementation_change_reaches_tests() {
        let (mut tree, tests, [a_h, a_cpp, _, a_test, main]) = project();
        modify(&mut tree, a_cpp);

        let options = AffectedOptions {
            test_root: Some(tests),
            keep_test_main: false,
        };
        let affected = collect_affected(&mut tree, options);
        assert_eq!(affected, vec![a_cpp, a_h, a_test]);
        assert_eq!(
            display_paths(&tree, &affected),
            vec!["src/a.cpp", "src/a.h", "tests/a_test.cpp"]
        );

        let keep = AffectedOptions {
            keep_test_main: true,
            ..options
        };
        assert_eq!(collect_affected(&mut tree, keep), vec![a_cpp, a_h, a_test, main]);
    }

    #[test]
    fn test_affected_equals_dependents_of_modified() {
        let (mut tree, _, [_, _, b_h, a_test, _]) = project();
        tree.add_include(a_test, b_h);
        modify(&mut tree, b_h);

        let affected: BTreeSet<NodeId> = collect_affected(&mut tree, AffectedOptions::default())
            .into_iter()
            .collect();
        install_dependents(&mut tree);
        let reached: BTreeSet<NodeId> = tree
            .file(b_h)
            .unwrap()
            .closure(Direction::Dependents)
            .unwrap()
            .iter()
            .copied()
            .collect();
        assert_eq!(affected, reached);
        assert_eq!(affected, BTreeSet::from([b_h, a_test]));
    }

    #[test]
    fn test_more_modifications_never_shrink_the_set() {
        let (mut tree, tests, [a_h, _, b_h, _, _]) = project();
        let options = AffectedOptions {
            test_root: Some(tests),
            keep_test_main: false,
        };
        modify(&mut tree, b_h);
        let before: BTreeSet<NodeId> = collect_affected(&mut tree, options).into_iter().collect();
        modify(&mut tree, a_h);
        let after: BTreeSet<NodeId> = collect_affected(&mut tree, options).into_iter().collect();
        assert!(before.is_subset(&after));
        assert!(after.len() > before.len());
    }
}
