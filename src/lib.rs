//! testscope - impacted-test selection for C/C++ source trees
//!
//! Scans headers and translation units for includes, declarations and
//! implementations, links them into a file dependency graph and reports
//! every file whose dependency closure contains a modified file.
//! Unchanged files reuse the facts stored in the previous run's snapshot.

pub mod cli;
pub mod core;
pub mod graph;
pub mod incremental;
pub mod lex;
pub mod output;
pub mod pipeline;
pub mod scan;

pub use core::config::{Config, RunConfig};
pub use core::error::{Error, Result};
