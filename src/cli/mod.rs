//! Command-line interface

use clap::Parser;
use std::path::PathBuf;
use tracing::info;

use crate::core::config::{Config, RunConfig};
use crate::core::error::Result;
use crate::output::RunStats;
use crate::pipeline;

const LONG_ABOUT: &str = r#"
Select the C/C++ files and tests affected by a change.

Every run scans SOURCE_DIR and TEST_DIR, links includes and
implementations into a dependency graph and compares file contents with
the snapshot left by the previous run. Files whose dependency closure
contains a modified file are written to OUTPUT_DIR/affected.txt; the new
snapshot is written next to it.

The first run (no snapshot) reports every file. A second run without
changes reports nothing.

CONFIG:
    testscope.toml in SOURCE_DIR (or --config) may set:

    [scan]
    extensions = ["h", "hpp", "cpp"]
    ignore = [".git", "third_party"]
    include_dirs = ["src/include"]

    [output]
    keep_test_main = false

LOGGING:
    TESTSCOPE_LOG=debug testscope ...    Per-file diagnostics
"#;

/// Impacted-test selection for C/C++ source trees
#[derive(Parser, Debug)]
#[command(name = "testscope")]
#[command(author, version)]
#[command(about = "Select the C/C++ files and tests affected by a change")]
#[command(long_about = LONG_ABOUT)]
#[command(after_help = "EXAMPLES:
    testscope src tests build/testscope
    testscope src tests out -i previous-out      Diff against another snapshot
    testscope src tests out -x deps.txt          Add dependencies the scanner cannot see
    testscope src tests out -I src/include -e h,cc")]
pub struct Cli {
    /// Source tree root
    pub source_dir: PathBuf,

    /// Test tree root
    pub test_dir: PathBuf,

    /// Where affected.txt and the new snapshot are written
    pub output_dir: PathBuf,

    /// Directory holding the previous snapshot (default: OUTPUT_DIR)
    #[arg(short, long)]
    pub input_dir: Option<PathBuf>,

    /// Extra dependency list (`file dep` lines, or JSON with a .json extension)
    #[arg(short = 'x', long)]
    pub extra_deps: Option<PathBuf>,

    /// Source file extensions, replacing the configured set
    #[arg(short, long, value_delimiter = ',')]
    pub extensions: Vec<String>,

    /// Skip paths containing this substring (repeatable)
    #[arg(long)]
    pub ignore: Vec<String>,

    /// Additional include search directory (repeatable)
    #[arg(short = 'I', long)]
    pub include_dir: Vec<PathBuf>,

    /// Config file (default: SOURCE_DIR/testscope.toml if present)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Keep test files implementing `main` in the affected list
    #[arg(long)]
    pub keep_test_main: bool,

    /// Debug logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// Load the config file and apply the command-line overrides
    pub fn into_run_config(self) -> Result<RunConfig> {
        let mut config = Config::load(self.config.as_deref(), &self.source_dir)?;

        if !self.extensions.is_empty() {
            config.scan.extensions = self.extensions;
        }
        config.scan.ignore.extend(self.ignore);
        config.scan.include_dirs.extend(self.include_dir);
        config.output.keep_test_main |= self.keep_test_main;

        let input_dir = self.input_dir.unwrap_or_else(|| self.output_dir.clone());
        Ok(RunConfig {
            source_dir: self.source_dir,
            test_dir: self.test_dir,
            output_dir: self.output_dir,
            input_dir,
            extra_deps: self.extra_deps,
            config,
        })
    }
}

/// Validate the configuration and run the pipeline
pub fn run(cli: Cli) -> Result<RunStats> {
    let config = cli.into_run_config()?;
    config.validate()?;
    info!(
        source = %config.source_dir.display(),
        tests = %config.test_dir.display(),
        output = %config.output_dir.display(),
        "Starting run"
    );
    let outcome = pipeline::run(&config)?;
    Ok(outcome.stats)
}
