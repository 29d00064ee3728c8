//! Batch pipeline
//!
//! Phases never overlap:
//!
//! 1. discover and hash (parallel)
//! 2. diff against the previous snapshot
//! 3. scan changed and new files (parallel), reuse the rest
//! 4. link extra dependencies, includes and implementations
//! 5. install dependency closures
//! 6. propagate, then write the affected list and the new snapshot
//!
//! @module pipeline

use std::path::{Path, PathBuf};
use std::time::Instant;

use rayon::prelude::*;
use tracing::{debug, info};

use crate::core::config::RunConfig;
use crate::core::error::Result;
use crate::graph::affected::display_paths;
use crate::graph::closure::install_dependencies;
use crate::graph::discover::build_forest;
use crate::graph::extra::{link_extra_deps, read_extra_deps};
use crate::graph::include::link_includes;
use crate::graph::resolve::link_implementations;
use crate::graph::{collect_affected, AffectedOptions, Declarations, FileTree, IncludeResolver, NodeFlags, NodeId};
use crate::incremental::{apply_snapshot, compute_digests, load_previous, save_snapshot, Snapshot};
use crate::output::{write_affected, RunStats};
use crate::scan::{scan_file, ScanOutcome};

/// Result of one run
#[derive(Debug)]
pub struct RunOutcome {
    pub stats: RunStats,
    /// Affected files, root-prefixed, in tree order
    pub affected: Vec<String>,
    pub tree: FileTree,
}

/// Run every phase for a validated configuration and write the artifacts
pub fn run(config: &RunConfig) -> Result<RunOutcome> {
    let start = Instant::now();

    let (extra, extra_base) = match &config.extra_deps {
        Some(path) => (
            read_extra_deps(path)?,
            path.parent().map(Path::to_path_buf).unwrap_or_default(),
        ),
        None => (Vec::new(), PathBuf::new()),
    };

    // 1. discover + hash
    let roots = vec![config.source_dir.clone(), config.test_dir.clone()];
    let mut tree = build_forest(&roots, &config.config)?;
    let files = tree.files().len();
    let unreadable = compute_digests(&mut tree);
    info!(files, unreadable, "Discovered and hashed");

    // 2. diff
    let previous = load_previous(&config.snapshot_in());
    let (reuse, to_scan) = apply_snapshot(&mut tree, previous.as_ref());
    drop(previous);

    // 3. scan
    let failed = scan_files(&mut tree, &to_scan);

    // 4. link
    let extra_edges = link_extra_deps(&mut tree, &extra, &extra_base);
    let resolver = IncludeResolver::new(&tree, &config.config.scan.include_dirs);
    let unresolved = link_includes(&mut tree, &resolver);
    let declarations = Declarations::build(&tree);
    let implementation_edges = link_implementations(&mut tree, &declarations);
    debug!(
        extra_edges,
        unresolved_includes = unresolved,
        implementation_edges,
        "Graph linked"
    );

    // 5. closures
    install_dependencies(&mut tree);

    // 6. propagate + emit
    let options = AffectedOptions {
        test_root: tree.roots().get(1).map(|r| r.node),
        keep_test_main: config.config.output.keep_test_main,
    };
    let affected_ids = collect_affected(&mut tree, options);
    let affected = display_paths(&tree, &affected_ids);

    write_affected(&config.affected_out(), &affected)?;
    save_snapshot(&Snapshot::capture(&tree), config.snapshot_out())?;

    let stats = RunStats {
        files,
        scanned: to_scan.len() - failed,
        reused: reuse.reused,
        modified: reuse.modified,
        failed,
        affected: affected.len(),
        elapsed: start.elapsed(),
    };
    info!(
        scanned = stats.scanned,
        reused = stats.reused,
        affected = stats.affected,
        "Run complete"
    );

    Ok(RunOutcome {
        stats,
        affected,
        tree,
    })
}

/// Tokenize and scan `ids` in parallel, then store the facts.
/// Returns the number of files that failed.
fn scan_files(tree: &mut FileTree, ids: &[NodeId]) -> usize {
    let jobs: Vec<(NodeId, PathBuf)> = ids.iter().map(|&id| (id, tree.fs_path(id))).collect();
    let results: Vec<(NodeId, ScanOutcome)> = jobs
        .par_iter()
        .map(|(id, path)| (*id, scan_file(path)))
        .collect();

    let mut failed = 0;
    for (id, outcome) in results {
        let Some(data) = tree.file_mut(id) else { continue };
        match outcome {
            ScanOutcome::Scanned(record) => {
                data.record = record;
                data.flags.insert(NodeFlags::SCANNED);
            }
            ScanOutcome::Failed => {
                data.record = Default::default();
                data.flags.insert(NodeFlags::SCAN_FAILED);
                failed += 1;
            }
        }
    }
    failed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::Config;
    use std::fs;
    use tempfile::TempDir;

    struct Project {
        temp: TempDir,
    }

    impl Project {
        fn new() -> Self {
            let temp = TempDir::new().unwrap();
            for dir in ["src", "tests", "out"] {
                fs::create_dir_all(temp.path().join(dir)).unwrap();
            }
            let project = Self { temp };
            project.write("src/a.h", "#pragma once\nclass A { public: int get(); };\n");
            project.write("src/a.cpp", "#include \"a.h\"\nint A::get() { return 1; }\n");
            project.write("src/b.h", "namespace util { int twice(int x); }\n");
            project.write("src/b.cpp", "#include \"b.h\"\nnamespace util { int twice(int x) { return 2 * x; } }\n");
            project.write("tests/a_test.cpp", "#include <a.h>\nvoid test_a() { A a; a.get(); }\n");
            project.write("tests/b_test.cpp", "#include \"b.h\"\nvoid test_b() {}\n");
            project.write("tests/main.cpp", "int main(int argc, char** argv) { return 0; }\n");
            project
        }

        fn path(&self, relative: &str) -> PathBuf {
            self.temp.path().join(relative)
        }

        fn write(&self, relative: &str, content: &str) {
            fs::write(self.path(relative), content).unwrap();
        }

        fn config(&self) -> RunConfig {
            RunConfig {
                source_dir: self.path("src"),
                test_dir: self.path("tests"),
                output_dir: self.path("out"),
                input_dir: self.path("out"),
                extra_deps: None,
                config: Config::default(),
            }
        }

        /// Affected paths relative to the temp dir
        fn run(&self, config: &RunConfig) -> (RunStats, Vec<String>) {
            config.validate().unwrap();
            let outcome = run(config).unwrap();
            let names = outcome
                .affected
                .iter()
                .map(|p| {
                    Path::new(p)
                        .strip_prefix(self.temp.path())
                        .unwrap()
                        .to_string_lossy()
                        .into_owned()
                })
                .collect();
            (outcome.stats, names)
        }
    }

    #[test]
    fn test_first_run_affects_everything_but_the_runner() {
        let project = Project::new();
        let (stats, affected) = project.run(&project.config());
        assert_eq!(stats.files, 7);
        assert_eq!(stats.scanned, 7);
        assert_eq!(
            affected,
            vec![
                "src/a.cpp",
                "src/a.h",
                "src/b.cpp",
                "src/b.h",
                "tests/a_test.cpp",
                "tests/b_test.cpp"
            ]
        );
        let written = fs::read_to_string(project.path("out/affected.txt")).unwrap();
        assert_eq!(written.lines().count(), 6);
        assert!(project.path("out/testscope.snapshot").is_file());
    }

    #[test]
    fn test_second_run_is_idempotent() {
        let project = Project::new();
        let config = project.config();
        project.run(&config);

        let (stats, affected) = project.run(&config);
        assert!(affected.is_empty());
        assert_eq!(stats.scanned, 0);
        assert_eq!(stats.reused, 7);
        assert_eq!(stats.modified, 0);
    }

    #[test]
    fn test_implementation_change_reaches_header_users() {
        let project = Project::new();
        let config = project.config();
        project.run(&config);

        project.write("src/a.cpp", "#include \"a.h\"\nint A::get() { return 2; }\n");
        let (stats, affected) = project.run(&config);
        assert_eq!(stats.scanned, 1);
        assert_eq!(affected, vec!["src/a.cpp", "src/a.h", "tests/a_test.cpp"]);
    }

    #[test]
    fn test_free_function_implementation_links_to_declaration() {
        let project = Project::new();
        let config = project.config();
        project.run(&config);

        project.write("src/b.cpp", "#include \"b.h\"\nnamespace util { int twice(int x) { return x + x; } }\n");
        let (_, affected) = project.run(&config);
        assert_eq!(affected, vec!["src/b.cpp", "src/b.h", "tests/b_test.cpp"]);
    }

    #[test]
    fn test_exported_class_links_its_implementation() {
        let project = Project::new();
        project.write("src/foo.h", "#pragma once\nclass FOO_API Foo { void bar(); };\n");
        project.write("src/foo.cpp", "#include \"foo.h\"\nvoid Foo::bar() {}\n");
        project.write("tests/foo_test.cpp", "#include <foo.h>\nvoid test_foo() {}\n");
        let config = project.config();
        project.run(&config);

        project.write("src/foo.cpp", "#include \"foo.h\"\nvoid Foo::bar() { return; }\n");
        let (_, affected) = project.run(&config);
        assert_eq!(affected, vec!["src/foo.cpp", "src/foo.h", "tests/foo_test.cpp"]);
    }

    #[test]
    fn test_keep_test_main() {
        let project = Project::new();
        let mut config = project.config();
        config.config.output.keep_test_main = true;
        let (_, affected) = project.run(&config);
        assert!(affected.contains(&"tests/main.cpp".to_string()));
    }

    #[test]
    fn test_disabled_branch_adds_no_dependency() {
        let project = Project::new();
        project.write(
            "tests/b_test.cpp",
            "#include \"b.h\"\n#if 0\n#include \"a.h\"\n#else\nvoid live();\n#endif\nvoid test_b() {}\n",
        );
        let config = project.config();
        project.run(&config);

        project.write("src/a.h", "#pragma once\nclass A { public: int get(); int set(); };\n");
        let (_, affected) = project.run(&config);
        assert!(!affected.contains(&"tests/b_test.cpp".to_string()));
        assert!(affected.contains(&"tests/a_test.cpp".to_string()));
    }

    #[test]
    fn test_include_cycle_terminates() {
        let project = Project::new();
        project.write("src/c1.h", "#include \"c2.h\"\n");
        project.write("src/c2.h", "#include \"c1.h\"\n");
        project.write("tests/c_test.cpp", "#include \"c1.h\"\n");
        let config = project.config();
        project.run(&config);

        project.write("src/c2.h", "#include \"c1.h\"\nint changed;\n");
        let (_, affected) = project.run(&config);
        assert_eq!(affected, vec!["src/c1.h", "src/c2.h", "tests/c_test.cpp"]);
    }

    #[test]
    fn test_scan_failure_does_not_stop_the_run() {
        let project = Project::new();
        project.write("src/broken.h", "class X {};\n}\n#include \"a.h\"\n");
        let (stats, affected) = project.run(&project.config());
        assert_eq!(stats.failed, 1);
        assert!(affected.contains(&"src/broken.h".to_string()));
        assert!(affected.contains(&"tests/a_test.cpp".to_string()));
    }

    #[test]
    fn test_extra_dependencies() {
        let project = Project::new();
        project.write("src/table.inc.h", "// generated\n");
        project.write("deps.txt", "tests/main.cpp -> src/table.inc.h\n");
        let mut config = project.config();
        config.extra_deps = Some(project.path("deps.txt"));
        config.config.output.keep_test_main = true;
        project.run(&config);

        project.write("src/table.inc.h", "// regenerated\n");
        let (_, affected) = project.run(&config);
        assert_eq!(affected, vec!["src/table.inc.h", "tests/main.cpp"]);
    }

    #[test]
    fn test_corrupt_snapshot_means_fresh_run() {
        let project = Project::new();
        let config = project.config();
        project.run(&config);
        fs::write(project.path("out/testscope.snapshot"), b"garbage").unwrap();

        let (stats, affected) = project.run(&config);
        assert_eq!(stats.scanned, 7);
        assert_eq!(affected.len(), 6);
    }
}
