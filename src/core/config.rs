//! Configuration management
//!
//! Two layers: [`Config`] holds the tunables that may come from a
//! `testscope.toml` file, [`RunConfig`] adds the directories of one
//! invocation. Both are built once at the boundary and passed down
//! explicitly.

use crate::core::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Name of the optional config file looked up in the source directory
pub const CONFIG_FILE: &str = "testscope.toml";

/// Default snapshot file name (inside the input/output directory)
pub const SNAPSHOT_FILE: &str = "testscope.snapshot";

/// Default affected list file name (inside the output directory)
pub const AFFECTED_FILE: &str = "affected.txt";

/// Tunables shared by every phase
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub scan: ScanConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// File extensions (without the dot) treated as sources
    pub extensions: Vec<String>,
    /// Path substrings that exclude an entry from the tree
    pub ignore: Vec<String>,
    /// Extra include search directories, searched after the tree roots
    pub include_dirs: Vec<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Keep test runner entry points (files implementing `main`) in the affected list
    pub keep_test_main: bool,
    /// Snapshot file name
    pub snapshot_file: String,
    /// Affected list file name
    pub affected_file: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            scan: ScanConfig::default(),
            output: OutputConfig::default(),
        }
    }
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            extensions: DEFAULT_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
            ignore: vec![".git".to_string()],
            include_dirs: vec![],
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            keep_test_main: false,
            snapshot_file: SNAPSHOT_FILE.to_string(),
            affected_file: AFFECTED_FILE.to_string(),
        }
    }
}

/// Header and translation unit extensions of the C/C++ family
pub const DEFAULT_EXTENSIONS: &[&str] = &[
    "h", "hh", "hpp", "hxx", "h++", "inl", "ipp", "tpp", "c", "cc", "cpp", "cxx", "c++",
];

impl Config {
    /// Load configuration from an explicit file, or from `testscope.toml`
    /// in `source_dir` when present, or fall back to defaults.
    pub fn load(explicit: Option<&Path>, source_dir: &Path) -> Result<Self> {
        let path = match explicit {
            Some(p) => {
                if !p.is_file() {
                    return Err(Error::ConfigError {
                        message: format!("config file not found: {}", p.display()),
                    });
                }
                p.to_path_buf()
            }
            None => {
                let candidate = source_dir.join(CONFIG_FILE);
                if !candidate.is_file() {
                    return Ok(Config::default());
                }
                candidate
            }
        };

        let content = std::fs::read_to_string(&path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// True if `path` has one of the configured source extensions
    pub fn is_source_file(&self, path: &Path) -> bool {
        let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
            return false;
        };
        self.scan
            .extensions
            .iter()
            .any(|e| e.trim_start_matches('.').eq_ignore_ascii_case(ext))
    }

    /// True if any ignored substring occurs in the (relative) path
    pub fn is_ignored(&self, relative: &str) -> bool {
        self.scan
            .ignore
            .iter()
            .any(|pattern| !pattern.is_empty() && relative.contains(pattern.as_str()))
    }
}

/// Everything one invocation needs, validated before the pipeline starts
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub source_dir: PathBuf,
    pub test_dir: PathBuf,
    pub output_dir: PathBuf,
    /// Where the previous snapshot is read from (defaults to `output_dir`)
    pub input_dir: PathBuf,
    pub extra_deps: Option<PathBuf>,
    pub config: Config,
}

impl RunConfig {
    /// Check the directories exist; the output directory is created if missing
    pub fn validate(&self) -> Result<()> {
        for dir in [&self.source_dir, &self.test_dir] {
            if !dir.is_dir() {
                return Err(Error::DirectoryNotFound { path: dir.clone() });
            }
        }
        if let Some(extra) = &self.extra_deps {
            if !extra.is_file() {
                return Err(Error::ConfigError {
                    message: format!("extra dependency file not found: {}", extra.display()),
                });
            }
        }
        if !self.output_dir.exists() {
            std::fs::create_dir_all(&self.output_dir)?;
        }
        Ok(())
    }

    pub fn snapshot_in(&self) -> PathBuf {
        self.input_dir.join(&self.config.output.snapshot_file)
    }

    pub fn snapshot_out(&self) -> PathBuf {
        self.output_dir.join(&self.config.output.snapshot_file)
    }

    pub fn affected_out(&self) -> PathBuf {
        self.output_dir.join(&self.config.output.affected_file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_without_file() {
        let temp = TempDir::new().unwrap();
        let config = Config::load(None, temp.path()).unwrap();
        assert!(config.is_source_file(Path::new("a/b.hpp")));
        assert!(config.is_source_file(Path::new("main.CPP")));
        assert!(!config.is_source_file(Path::new("README.md")));
        assert!(!config.output.keep_test_main);
    }

    #[test]
    fn test_load_from_source_dir() {
        let temp = TempDir::new().unwrap();
        std::fs::write(
            temp.path().join(CONFIG_FILE),
            "[scan]\nextensions = [\"cu\"]\nignore = [\"third_party\"]\n\n[output]\nkeep_test_main = true\n",
        )
        .unwrap();

        let config = Config::load(None, temp.path()).unwrap();
        assert!(config.is_source_file(Path::new("kernel.cu")));
        assert!(!config.is_source_file(Path::new("kernel.cpp")));
        assert!(config.is_ignored("src/third_party/zlib.h"));
        assert!(config.output.keep_test_main);
        assert_eq!(config.output.snapshot_file, SNAPSHOT_FILE);
    }

    #[test]
    fn test_missing_explicit_file_is_error() {
        let temp = TempDir::new().unwrap();
        let missing = temp.path().join("nope.toml");
        assert!(Config::load(Some(&missing), temp.path()).is_err());
    }

    #[test]
    fn test_validate_creates_output_dir() {
        let temp = TempDir::new().unwrap();
        let run = RunConfig {
            source_dir: temp.path().to_path_buf(),
            test_dir: temp.path().to_path_buf(),
            output_dir: temp.path().join("out"),
            input_dir: temp.path().join("out"),
            extra_deps: None,
            config: Config::default(),
        };
        run.validate().unwrap();
        assert!(temp.path().join("out").is_dir());

        let bad = RunConfig {
            source_dir: temp.path().join("missing"),
            ..run
        };
        assert!(matches!(
            bad.validate(),
            Err(Error::DirectoryNotFound { .. })
        ));
    }
}
