//! Declarative template manifest.
//!
//! A manifest is a YAML document naming one template and the ordered list of
//! versions the user wants to exist for it:
//!
//! ```yaml
//! name: docker-workspace
//! versions:
//!   - directory: ./v1
//!     name: stable
//!     active: true
//!     variables:
//!       - { name: region, value: eu-west }
//! ```
//!
//! Relative `directory` entries are resolved against the manifest's parent
//! directory, so a manifest can be loaded from any working directory.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{io_err, ConfigError};
use crate::types::{TemplateName, Variable};

/// One declared version slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionSpec {
    /// Content directory; absolute after [`load`].
    pub directory: PathBuf,
    /// Explicit version name. `None` leaves naming to the remote service.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default)]
    pub active: bool,
    #[serde(default)]
    pub variables: Vec<Variable>,
}

/// Root of a template manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateManifest {
    pub name: TemplateName,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub versions: Vec<VersionSpec>,
}

/// Load and validate the manifest at `path`.
///
/// Returns `ConfigError::Manifest` (with path + line context) on malformed
/// YAML and `ConfigError::Invalid` when validation fails.
pub fn load(path: &Path) -> Result<TemplateManifest, ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|e| io_err(path, e))?;
    let mut manifest: TemplateManifest =
        serde_yaml::from_str(&contents).map_err(|e| ConfigError::Manifest {
            path: path.to_path_buf(),
            source: e,
        })?;

    let base = path.parent().unwrap_or_else(|| Path::new("."));
    for version in &mut manifest.versions {
        if version.directory.is_relative() {
            version.directory = base.join(&version.directory);
        }
    }

    validate(&manifest).map_err(|reason| ConfigError::Invalid {
        path: path.to_path_buf(),
        reason,
    })?;
    Ok(manifest)
}

/// Template names become file names under `~/.stencil/checkpoints`, so only
/// ASCII letters, digits, `-` and `_` are accepted.
pub fn validate_template_name(name: &str) -> Result<(), String> {
    if name.trim().is_empty() {
        return Err("template name must not be empty".to_string());
    }
    if let Some(bad) = name
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || *c == '-' || *c == '_'))
    {
        return Err(format!(
            "template name '{name}' contains '{bad}'; use letters, digits, '-' and '_'"
        ));
    }
    Ok(())
}

/// Structural checks that do not need the filesystem.
pub fn validate(manifest: &TemplateManifest) -> Result<(), String> {
    validate_template_name(&manifest.name.0)?;
    if manifest.versions.is_empty() {
        return Err("at least one version must be declared".to_string());
    }

    let mut names = HashSet::new();
    for (index, version) in manifest.versions.iter().enumerate() {
        if let Some(name) = &version.name {
            if name.trim().is_empty() {
                return Err(format!("versions[{index}]: name must not be blank"));
            }
            if !names.insert(name.as_str()) {
                return Err(format!("version name '{name}' is declared more than once"));
            }
        }

        let mut vars = HashSet::new();
        for variable in &version.variables {
            if !vars.insert(variable.name.as_str()) {
                return Err(format!(
                    "versions[{index}]: variable '{}' is declared more than once",
                    variable.name
                ));
            }
        }
    }
    Ok(())
}
