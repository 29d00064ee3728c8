//! Emitted artifacts and console summary
//!
//! @module output

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::time::Duration;

use crate::core::error::Result;

/// Counters of one run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunStats {
    pub files: usize,
    pub scanned: usize,
    pub reused: usize,
    pub modified: usize,
    pub failed: usize,
    pub affected: usize,
    pub elapsed: Duration,
}

/// Write the affected list, one path per line
pub fn write_affected(path: &Path, affected: &[String]) -> Result<()> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    for line in affected {
        writeln!(writer, "{}", line)?;
    }
    writer.flush()?;
    Ok(())
}

/// One-line human summary
pub fn format_summary(stats: &RunStats) -> String {
    let mut line = format!(
        "{} files: {} scanned, {} reused, {} modified, {} affected ({:.1}ms)",
        stats.files,
        stats.scanned,
        stats.reused,
        stats.modified,
        stats.affected,
        stats.elapsed.as_secs_f64() * 1000.0
    );
    if stats.failed > 0 {
        line.push_str(&format!(", {} failed to scan", stats.failed));
    }
    line
}
