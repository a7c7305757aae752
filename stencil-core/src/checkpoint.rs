//! Persistent checkpoint — last known version identities grouped by content hash.
//!
//! Persists a [`CheckpointFile`] JSON document at
//! `<home>/.stencil/checkpoints/<template>.json`.
//! Writes go to a `.json.tmp` sibling and are renamed into place.
//!
//! The checkpoint is read once at the start of a reconciliation pass and
//! rewritten wholesale at the end of a successful one. A pass that fails
//! leaves the previous file untouched.

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{io_err, ConfigError};
use crate::types::{ContentHash, TemplateName, VariableMap, VersionId};

/// A version previously created by stencil. Never mutated once recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreviousVersion {
    pub id: VersionId,
    pub name: String,
    #[serde(default)]
    pub variables: VariableMap,
    #[serde(default)]
    pub active: bool,
}

/// Content hash → candidates sharing that hash, in last-declared order.
pub type LastVersionsByHash = BTreeMap<ContentHash, Vec<PreviousVersion>>;

/// In-memory checkpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Checkpoint {
    pub saved_at: Option<DateTime<Utc>>,
    pub versions: LastVersionsByHash,
}

/// On-disk checkpoint payload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CheckpointFile {
    pub saved_at: DateTime<Utc>,
    pub versions: LastVersionsByHash,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum CheckpointCompat {
    Structured(CheckpointStructuredCompat),
    Legacy(LastVersionsByHash),
}

#[derive(Debug, Deserialize)]
struct CheckpointStructuredCompat {
    pub saved_at: Option<DateTime<Utc>>,
    pub versions: LastVersionsByHash,
}

impl Checkpoint {
    /// Build a checkpoint from `(hash, record)` pairs. Records sharing a hash
    /// keep the order in which they were supplied.
    pub fn from_entries(entries: impl IntoIterator<Item = (ContentHash, PreviousVersion)>) -> Self {
        let mut versions = LastVersionsByHash::new();
        for (hash, record) in entries {
            versions.entry(hash).or_default().push(record);
        }
        Self {
            saved_at: None,
            versions,
        }
    }

    /// Candidate bucket for `hash`, if any.
    pub fn bucket(&self, hash: &ContentHash) -> Option<&[PreviousVersion]> {
        self.versions.get(hash).map(Vec::as_slice)
    }

    /// Every recorded version, bucket by bucket.
    pub fn records(&self) -> impl Iterator<Item = (&ContentHash, &PreviousVersion)> {
        self.versions
            .iter()
            .flat_map(|(hash, bucket)| bucket.iter().map(move |record| (hash, record)))
    }

    /// Drop records for which `keep` returns false. Empty buckets are removed.
    pub fn retain(&mut self, mut keep: impl FnMut(&PreviousVersion) -> bool) {
        for bucket in self.versions.values_mut() {
            bucket.retain(|record| keep(record));
        }
        self.versions.retain(|_, bucket| !bucket.is_empty());
    }

    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
    }

    /// First identity that appears more than once, if any.
    fn duplicate_identity(&self) -> Option<&VersionId> {
        let mut seen = HashSet::new();
        self.records()
            .map(|(_, record)| &record.id)
            .find(|id| !seen.insert(*id))
    }
}

/// `<home>/.stencil/checkpoints/<template>.json` (no I/O).
pub fn path_at(home: &Path, template: &TemplateName) -> PathBuf {
    home.join(".stencil")
        .join("checkpoints")
        .join(format!("{}.json", template.0))
}

/// Load the checkpoint for `template`.
///
/// Returns `Ok(None)` if no checkpoint has ever been written, which callers
/// treat as "this template is being created".
pub fn load_at(home: &Path, template: &TemplateName) -> Result<Option<Checkpoint>, ConfigError> {
    let path = path_at(home, template);
    if !path.exists() {
        return Ok(None);
    }
    let contents = std::fs::read_to_string(&path).map_err(|e| io_err(&path, e))?;
    let parsed: CheckpointCompat =
        serde_json::from_str(&contents).map_err(|e| ConfigError::Checkpoint {
            path: path.clone(),
            source: e,
        })?;
    let checkpoint = match parsed {
        CheckpointCompat::Structured(file) => Checkpoint {
            saved_at: file.saved_at,
            versions: file.versions,
        },
        CheckpointCompat::Legacy(versions) => Checkpoint {
            saved_at: None,
            versions,
        },
    };

    if let Some(id) = checkpoint.duplicate_identity() {
        return Err(ConfigError::DuplicateIdentity {
            path,
            id: id.0.clone(),
        });
    }
    Ok(Some(checkpoint))
}

/// Save the checkpoint for `template` atomically, stamping `saved_at`.
pub fn save_at(
    home: &Path,
    template: &TemplateName,
    checkpoint: &Checkpoint,
) -> Result<(), ConfigError> {
    let path = path_at(home, template);
    let Some(dir) = path.parent() else {
        return Err(io_err(
            path,
            std::io::Error::other("invalid checkpoint path"),
        ));
    };
    std::fs::create_dir_all(dir).map_err(|e| io_err(dir, e))?;

    let file = CheckpointFile {
        saved_at: Utc::now(),
        versions: checkpoint.versions.clone(),
    };
    let json = serde_json::to_string_pretty(&file).map_err(|e| ConfigError::Checkpoint {
        path: path.clone(),
        source: e,
    })?;
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, json).map_err(|e| io_err(&tmp, e))?;
    set_file_permissions(&tmp)?;
    if let Err(e) = std::fs::rename(&tmp, &path) {
        let _ = std::fs::remove_file(&tmp);
        return Err(io_err(&path, e));
    }
    Ok(())
}

#[cfg(unix)]
fn set_file_permissions(path: &Path) -> Result<(), ConfigError> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
        .map_err(|e| io_err(path, e))
}
#[cfg(not(unix))]
fn set_file_permissions(_path: &Path) -> Result<(), ConfigError> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn record(id: &str, name: &str, active: bool) -> PreviousVersion {
        PreviousVersion {
            id: VersionId::from(id),
            name: name.to_string(),
            variables: VariableMap::new(),
            active,
        }
    }

    fn template() -> TemplateName {
        TemplateName::from("docker")
    }

    #[test]
    fn missing_file_means_no_checkpoint() {
        let tmp = TempDir::new().unwrap();
        assert!(load_at(tmp.path(), &template()).unwrap().is_none());
    }

    #[test]
    fn roundtrip_save_load_preserves_bucket_order() {
        let tmp = TempDir::new().unwrap();
        let checkpoint = Checkpoint::from_entries([
            (ContentHash::from("h1"), record("b", "second", false)),
            (ContentHash::from("h1"), record("a", "first", true)),
            (ContentHash::from("h2"), record("c", "other", false)),
        ]);

        save_at(tmp.path(), &template(), &checkpoint).unwrap();
        let loaded = load_at(tmp.path(), &template()).unwrap().expect("present");

        assert_eq!(loaded.versions, checkpoint.versions);
        let ids: Vec<_> = loaded
            .bucket(&ContentHash::from("h1"))
            .unwrap()
            .iter()
            .map(|r| r.id.0.as_str())
            .collect();
        assert_eq!(ids, ["b", "a"]);
        assert!(loaded.saved_at.is_some());
    }

    #[test]
    fn tmp_file_cleaned_up_after_save() {
        let tmp = TempDir::new().unwrap();
        save_at(tmp.path(), &template(), &Checkpoint::default()).unwrap();
        let tmp_path = path_at(tmp.path(), &template()).with_extension("json.tmp");
        assert!(!tmp_path.exists(), "tmp file should be removed after atomic rename");
    }

    #[test]
    fn load_legacy_bare_map() {
        let tmp = TempDir::new().unwrap();
        let path = path_at(tmp.path(), &template());
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(
            &path,
            r#"{"abc":[{"id":"v1","name":"gentle_fox","variables":{"region":"eu"},"active":true}]}"#,
        )
        .unwrap();

        let loaded = load_at(tmp.path(), &template()).unwrap().expect("present");
        let bucket = loaded.bucket(&ContentHash::from("abc")).expect("bucket");
        assert_eq!(bucket[0].id, VersionId::from("v1"));
        assert_eq!(bucket[0].variables.get("region"), Some(&"eu".to_string()));
        assert!(loaded.saved_at.is_none());
    }

    #[test]
    fn duplicate_identity_is_rejected() {
        let tmp = TempDir::new().unwrap();
        let checkpoint = Checkpoint::from_entries([
            (ContentHash::from("h1"), record("same", "a", false)),
            (ContentHash::from("h2"), record("same", "b", false)),
        ]);
        save_at(tmp.path(), &template(), &checkpoint).unwrap();

        let err = load_at(tmp.path(), &template()).unwrap_err();
        assert!(matches!(err, ConfigError::DuplicateIdentity { .. }), "got: {err}");
    }

    #[test]
    fn retain_drops_empty_buckets() {
        let mut checkpoint = Checkpoint::from_entries([
            (ContentHash::from("h1"), record("a", "a", false)),
            (ContentHash::from("h2"), record("b", "b", false)),
        ]);
        checkpoint.retain(|r| r.id.0 != "a");
        assert!(checkpoint.bucket(&ContentHash::from("h1")).is_none());
        assert_eq!(checkpoint.records().count(), 1);
    }

    #[test]
    #[cfg(unix)]
    fn checkpoint_file_is_private() {
        use std::os::unix::fs::PermissionsExt;
        let tmp = TempDir::new().unwrap();
        save_at(tmp.path(), &template(), &Checkpoint::default()).unwrap();
        let mode = std::fs::metadata(path_at(tmp.path(), &template()))
            .unwrap()
            .permissions()
            .mode()
            & 0o777;
        assert_eq!(mode, 0o600);
    }
}
