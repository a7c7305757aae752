//! Error types for stencil-core.

use std::path::PathBuf;

use thiserror::Error;

/// Configuration errors: anything wrong with the declared manifest or the
/// persisted checkpoint. Always fatal, always raised before any remote call.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Underlying I/O failure, annotated with the offending path.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// YAML parse error on manifest load; carries serde_yaml line context.
    #[error("failed to parse manifest at {path}: {source}")]
    Manifest {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// The manifest parsed but does not describe a usable template.
    #[error("invalid manifest at {path}: {reason}")]
    Invalid { path: PathBuf, reason: String },

    /// Checkpoint JSON could not be read or written.
    #[error("checkpoint JSON error at {path}: {source}")]
    Checkpoint {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// The same version identity appears more than once in a checkpoint.
    #[error("corrupt checkpoint at {path}: version {id} is recorded more than once")]
    DuplicateIdentity { path: PathBuf, id: String },
}

/// Convenience constructor for [`ConfigError::Io`].
pub fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> ConfigError {
    ConfigError::Io {
        path: path.into(),
        source,
    }
}
