//! Error types for testscope

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using testscope's Error
pub type Result<T> = std::result::Result<T, Error>;

/// testscope error types
#[derive(Error, Debug)]
pub enum Error {
    #[error("Directory not found: {}", path.display())]
    DirectoryNotFound { path: PathBuf },

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Snapshot error: {message}")]
    SnapshotError { message: String },

    /// Brace underflow or another condition that makes the rest of a file unscannable
    #[error("{}:{line}: {message}", path.display())]
    Parse {
        path: PathBuf,
        line: u32,
        message: String,
    },

    #[error("Extra dependency list error: {message}")]
    ExtraDepsError { message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("Directory walk error: {0}")]
    Walk(#[from] walkdir::Error),
}
