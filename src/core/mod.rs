//! Shared infrastructure: errors, configuration, the generic trie

pub mod config;
pub mod error;
pub mod trie;
