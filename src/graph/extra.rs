//! Extra dependency lists
//!
//! Dependencies the scanner cannot see (generated headers, data files read
//! by tests) are supplied as a list of `(file, dependency)` pairs. Each pair
//! becomes an include-like edge.
//!
//! Two formats, chosen by extension:
//!
//! ```text
//! # plain text, one pair per line
//! tests/parser_test.cpp  src/grammar.inc
//! tests/io_test.cpp -> data/sample.h
//! ```
//!
//! ```json
//! { "tests/parser_test.cpp": ["src/grammar.inc"] }
//! ```
//!
//! @module graph/extra

use std::collections::BTreeMap;
use std::path::Path;

use tracing::{debug, warn};

use super::tree::{FileTree, NodeId};
use crate::core::error::{Error, Result};

/// One `file depends on dependency` pair, paths as written
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtraDependency {
    pub file: String,
    pub dependency: String,
}

/// Read an extra dependency list
pub fn read_extra_deps(path: &Path) -> Result<Vec<ExtraDependency>> {
    let content = std::fs::read_to_string(path)?;
    let is_json = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json"));
    if is_json {
        parse_json(&content)
    } else {
        parse_text(&content)
    }
}

pub fn parse_text(content: &str) -> Result<Vec<ExtraDependency>> {
    let mut pairs = Vec::new();
    for (number, line) in content.lines().enumerate() {
        let line = match line.find('#') {
            Some(comment) => &line[..comment],
            None => line,
        };
        let fields: Vec<&str> = line
            .split_whitespace()
            .filter(|field| *field != "->")
            .collect();
        match fields.as_slice() {
            [] => {}
            [file, dependency] => pairs.push(ExtraDependency {
                file: file.to_string(),
                dependency: dependency.to_string(),
            }),
            _ => {
                return Err(Error::ExtraDepsError {
                    message: format!(
                        "line {}: expected `file dependency`, got `{}`",
                        number + 1,
                        line.trim()
                    ),
                })
            }
        }
    }
    Ok(pairs)
}

pub fn parse_json(content: &str) -> Result<Vec<ExtraDependency>> {
    let map: BTreeMap<String, Vec<String>> = serde_json::from_str(content)?;
    Ok(map
        .into_iter()
        .flat_map(|(file, deps)| {
            deps.into_iter().map(move |dependency| ExtraDependency {
                file: file.clone(),
                dependency,
            })
        })
        .collect())
}

/// Tree node for a path as written in a dependency list. Tried in order:
/// as a filesystem path, relative to the list's directory `base`, relative
/// to each root.
fn lookup(tree: &FileTree, base: &Path, written: &str) -> Option<NodeId> {
    tree.locate(Path::new(written))
        .or_else(|| tree.locate(&base.join(written)))
        .or_else(|| {
            tree.roots()
                .iter()
                .find_map(|root| tree.find_path(root.node, written))
        })
}

/// Add an include edge per resolvable pair. `base` is the directory of the
/// dependency list. The first path must name a file; the second may name a
/// directory, which links every file under it. Returns the number of edges
/// added.
pub fn link_extra_deps(tree: &mut FileTree, pairs: &[ExtraDependency], base: &Path) -> usize {
    let mut added = 0;
    for pair in pairs {
        let Some(from) = lookup(tree, base, &pair.file).filter(|&id| tree.node(id).is_file()) else {
            warn!(file = %pair.file, "Extra dependency source is not a scanned file, skipped");
            continue;
        };
        let Some(to) = lookup(tree, base, &pair.dependency) else {
            warn!(
                file = %pair.file,
                dependency = %pair.dependency,
                "Extra dependency not found, skipped"
            );
            continue;
        };
        // a directory stands for every file under it
        let targets = if tree.node(to).is_file() {
            vec![to]
        } else {
            tree.files_under(to)
        };
        for target in targets {
            tree.add_include(from, target);
            added += 1;
        }
    }
    debug!(added, "Extra dependencies linked");
    added
}
