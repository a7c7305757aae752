//! Stencil core library — domain types, manifest loading, checkpoint persistence, errors.
//!
//! - [`types`] — newtypes and variables
//! - [`manifest`] — declarative template manifest (YAML)
//! - [`checkpoint`] — last known versions grouped by content hash (JSON)
//! - [`error`] — [`ConfigError`]

pub mod checkpoint;
pub mod error;
pub mod manifest;
pub mod types;

pub use checkpoint::{Checkpoint, LastVersionsByHash, PreviousVersion};
pub use error::ConfigError;
pub use manifest::{TemplateManifest, VersionSpec};
pub use types::{variable_map, ContentHash, TemplateName, Variable, VariableMap, VersionId};
