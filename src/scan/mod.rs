//! Source fact extraction
//!
//! [`scan_file`] is the per-file entry point used by the pipeline: read,
//! tokenize, run the [`scanner`] and turn every recoverable problem into a
//! diagnostic so one bad file never stops the run.
//!
//! @module scan

pub mod name;
pub mod operators;
pub mod record;
pub mod scanner;

use std::path::Path;

use tracing::{debug, warn};

pub use name::QualifiedName;
pub use record::{FileRecord, IncludeDirective, IncludeKind};
pub use scanner::scan;

use crate::core::error::Result;
use crate::lex::tokenize;

/// Outcome of scanning one file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanOutcome {
    Scanned(FileRecord),
    /// Unreadable or unscannable; the file keeps empty facts
    Failed,
}

/// Scan an in-memory buffer
pub fn scan_source(path: &Path, source: &[u8]) -> Result<FileRecord> {
    let lexed = tokenize(source);
    for diagnostic in &lexed.diagnostics {
        warn!(
            path = %path.display(),
            line = diagnostic.line,
            "{}",
            diagnostic.kind.as_str()
        );
    }
    scan(path, source, &lexed.tokens)
}

/// Read and scan one file
pub fn scan_file(path: &Path) -> ScanOutcome {
    let source = match std::fs::read(path) {
        Ok(source) => source,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Failed to read source file");
            return ScanOutcome::Failed;
        }
    };

    match scan_source(path, &source) {
        Ok(record) => {
            debug!(
                path = %path.display(),
                includes = record.includes.len(),
                implements = record.implements.len(),
                "Scanned"
            );
            ScanOutcome::Scanned(record)
        }
        Err(e) => {
            warn!("{}; facts discarded", e);
            ScanOutcome::Failed
        }
    }
}
