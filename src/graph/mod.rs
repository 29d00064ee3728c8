//! File dependency graph
//!
//! The forest of scanned roots ([`tree`]) and everything that links its
//! files: include edges, implementation edges, extra dependencies,
//! closures and the affected set.
//!
//! @module graph

pub mod affected;
pub mod closure;
pub mod discover;
pub mod extra;
pub mod include;
pub mod resolve;
pub mod tree;

pub use affected::{collect_affected, AffectedOptions};
pub use include::IncludeResolver;
pub use resolve::Declarations;
pub use tree::{Digest, Direction, FileData, FileTree, NodeFlags, NodeId};
