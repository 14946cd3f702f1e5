//! Error types shared by the rendering pipeline.

use std::path::PathBuf;
use thiserror::Error;

use crate::envsubst::SubstitutionError;

/// Error represents a fatal failure. Any of these aborts the whole run and no
/// partially rendered output is produced.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Substitution(#[from] SubstitutionError),

    #[error("failed to parse {what}: {source}")]
    Parse {
        what: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("{what}: document {index} is not an object")]
    NotAnObject { what: String, index: usize },

    #[error("invalid patch for {kind}/{name}: {source}")]
    InvalidPatch {
        kind: String,
        name: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to apply patch to {kind}/{name}: {source}")]
    Apply {
        kind: String,
        name: String,
        #[source]
        source: json_patch::PatchError,
    },

    #[error("failed to convert {kind}/{name} to JSON: {source}")]
    Snapshot {
        kind: String,
        name: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to render {kind}/{name}: {source}")]
    Render {
        kind: String,
        name: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{0}")]
    Resolve(String),
}

impl Error {
    /// Creates a parse error for the named input.
    pub fn parse(what: impl Into<String>, source: serde_yaml::Error) -> Self {
        Error::Parse {
            what: what.into(),
            source,
        }
    }

    /// Creates an I/O error for the given path.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }
}

/// Result alias used throughout the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;
