//! Error types and result aliases.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("No workspace root found above {0}. Expected an ancestor 'package.json' declaring workspaces.")]
    RootNotFound(PathBuf),

    #[error("Malformed workspace declaration in {path}: expected a 'workspaces' object with a 'packages' array of glob patterns")]
    DependenciesMalformed { path: PathBuf },

    #[error("Package manifest not found: {0}")]
    ManifestMissing(PathBuf),

    #[error("Failed to parse {path}: {source}")]
    ManifestInvalid {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Invalid workspace member pattern '{pattern}': {source}")]
    MemberPattern {
        pattern: String,
        source: glob::PatternError,
    },

    #[error("Circular dependency detected. Unresolved packages:\n{remainder}")]
    CyclicDependency { remainder: String },
}

pub type Result<T> = std::result::Result<T, Error>;
