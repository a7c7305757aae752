//! Error types for stencil-plan.

use std::path::PathBuf;

use thiserror::Error;

use stencil_core::ConfigError;

/// The declared versions do not determine a single active version.
///
/// Raised instead of guessing; every variant names the entries involved.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AmbiguityError {
    #[error("only one version can be active, but {} are: {}", .versions.len(), .versions.join(", "))]
    MultipleActive { versions: Vec<String> },

    #[error("at least one version must be active when creating a template")]
    NoneActiveOnCreate,

    #[error(
        "could not determine which version should be active: {deactivated} was active and is now \
         marked inactive, and no other version is marked active"
    )]
    Undetermined { deactivated: String },

    #[error("no version is marked active; mark exactly one version active")]
    NoneActive,
}

/// All errors that can arise from a planning pass.
#[derive(Debug, Error)]
pub enum PlanError {
    /// Manifest or checkpoint problem.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A declared content directory could not be fingerprinted.
    #[error("failed to hash {path}: {source}")]
    Hash {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Active-version resolution refused to guess.
    #[error(transparent)]
    Ambiguity(#[from] AmbiguityError),
}

/// Convenience constructor for [`PlanError::Hash`].
pub(crate) fn hash_err(path: impl Into<PathBuf>, source: std::io::Error) -> PlanError {
    PlanError::Hash {
        path: path.into(),
        source,
    }
}
