//! Planning pass shared by `stencil plan` and `stencil apply`.
//!
//! hash every declared directory → reconcile against the checkpoint →
//! resolve the active version → per-entry actions.
//!
//! Planning never talks to the remote service and never writes the
//! checkpoint; it only decides what an apply pass would do.

use std::path::Path;

use serde::Serialize;

use stencil_core::{
    checkpoint, variable_map, Checkpoint, PreviousVersion, TemplateManifest, TemplateName,
    VersionId,
};

use crate::active::resolve_active;
use crate::error::PlanError;
use crate::hasher::hash_directory;
use crate::reconcile::{reconcile, MatchPolicy, ResolvedName, ResolvedVersion, VersionDefinition};

/// What apply must do for one declared entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum VersionAction {
    /// No previous version matched; build a new one.
    Create,
    /// Keep the matched version as is.
    Reuse,
    /// Keep the matched version but change its name.
    Rename { from: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedVersion {
    pub resolved: ResolvedVersion,
    pub action: VersionAction,
}

/// Outcome of a planning pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plan {
    pub template: TemplateName,
    pub display_name: Option<String>,
    pub description: Option<String>,
    /// No checkpoint existed: the template is being created.
    pub creating: bool,
    pub versions: Vec<PlannedVersion>,
    /// Index into `versions` of the one active entry.
    pub active: usize,
    /// The active entry is not already the active version remotely.
    pub activate: bool,
}

/// Identity and final name of an entry once apply has run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedVersion {
    pub id: VersionId,
    pub name: String,
}

impl Plan {
    pub fn active_version(&self) -> &PlannedVersion {
        &self.versions[self.active]
    }

    /// Number of versions the remote will have to build.
    pub fn creations(&self) -> usize {
        self.versions
            .iter()
            .filter(|v| v.action == VersionAction::Create)
            .count()
    }

    /// Nothing to create, rename or activate.
    pub fn is_noop(&self) -> bool {
        !self.activate
            && self
                .versions
                .iter()
                .all(|v| v.action == VersionAction::Reuse)
    }

    /// Build the checkpoint that replaces the current one after a successful
    /// apply. `applied` must line up with `versions`.
    pub fn next_checkpoint(&self, applied: &[AppliedVersion]) -> Checkpoint {
        debug_assert_eq!(applied.len(), self.versions.len());
        Checkpoint::from_entries(self.versions.iter().zip(applied).enumerate().map(
            |(index, (planned, applied))| {
                let definition = &planned.resolved.definition;
                (
                    definition.hash.clone(),
                    PreviousVersion {
                        id: applied.id.clone(),
                        name: applied.name.clone(),
                        variables: variable_map(&definition.variables),
                        active: index == self.active,
                    },
                )
            },
        ))
    }
}

/// Fingerprint every declared version directory, in declared order.
pub fn hash_versions(manifest: &TemplateManifest) -> Result<Vec<VersionDefinition>, PlanError> {
    manifest
        .versions
        .iter()
        .map(|spec| {
            Ok(VersionDefinition {
                name: spec.name.clone(),
                hash: hash_directory(&spec.directory)?,
                active: spec.active,
                variables: spec.variables.clone(),
                directory: spec.directory.clone(),
                message: spec.message.clone(),
            })
        })
        .collect()
}

/// Plan `manifest` against `checkpoint` (`None` when the template is new).
pub fn plan(
    manifest: &TemplateManifest,
    checkpoint: Option<&Checkpoint>,
    policy: MatchPolicy,
) -> Result<Plan, PlanError> {
    let declared = hash_versions(manifest)?;
    let empty = Checkpoint::default();
    let previous = checkpoint.unwrap_or(&empty);

    let result = reconcile(declared, &previous.versions, policy);
    let creating = checkpoint.is_none();
    let active = resolve_active(&result, creating)?;

    let versions: Vec<PlannedVersion> = result
        .versions
        .into_iter()
        .map(|resolved| PlannedVersion {
            action: action_for(&resolved),
            resolved,
        })
        .collect();
    let activate = versions[active]
        .resolved
        .previous
        .as_ref()
        .map_or(true, |p| !p.active);

    tracing::info!(
        template = %manifest.name,
        versions = versions.len(),
        creating,
        activate,
        "planned template versions"
    );

    Ok(Plan {
        template: manifest.name.clone(),
        display_name: manifest.display_name.clone(),
        description: manifest.description.clone(),
        creating,
        versions,
        active,
        activate,
    })
}

/// Load the checkpoint under `home` and plan against it.
pub fn plan_at(
    home: &Path,
    manifest: &TemplateManifest,
    policy: MatchPolicy,
) -> Result<Plan, PlanError> {
    let checkpoint = checkpoint::load_at(home, &manifest.name)?;
    plan(manifest, checkpoint.as_ref(), policy)
}

fn action_for(resolved: &ResolvedVersion) -> VersionAction {
    match (&resolved.previous, &resolved.name) {
        (None, _) => VersionAction::Create,
        (Some(previous), ResolvedName::Declared(name)) if *name != previous.name => {
            VersionAction::Rename {
                from: previous.name.clone(),
            }
        }
        (Some(_), _) => VersionAction::Reuse,
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::PathBuf;

    use stencil_core::{ContentHash, Variable, VersionSpec};
    use tempfile::TempDir;

    use super::*;

    fn spec(dir: PathBuf, name: Option<&str>, active: bool) -> VersionSpec {
        VersionSpec {
            directory: dir,
            name: name.map(str::to_owned),
            message: None,
            active,
            variables: vec![],
        }
    }

    fn manifest(versions: Vec<VersionSpec>) -> TemplateManifest {
        TemplateManifest {
            name: TemplateName::from("docker"),
            display_name: None,
            description: None,
            versions,
        }
    }

    fn content_dir(root: &TempDir, name: &str, body: &str) -> PathBuf {
        let dir = root.path().join(name);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("main.tf"), body).unwrap();
        dir
    }

    #[test]
    fn first_plan_creates_everything() {
        let root = TempDir::new().unwrap();
        let m = manifest(vec![
            spec(content_dir(&root, "a", "a"), None, true),
            spec(content_dir(&root, "b", "b"), Some("b"), false),
        ]);

        let plan = plan(&m, None, MatchPolicy::default()).unwrap();
        assert!(plan.creating);
        assert_eq!(plan.creations(), 2);
        assert_eq!(plan.active, 0);
        assert!(plan.activate);
    }

    #[test]
    fn applied_checkpoint_makes_next_plan_a_noop() {
        let root = TempDir::new().unwrap();
        let m = manifest(vec![
            spec(content_dir(&root, "a", "a"), None, true),
            spec(content_dir(&root, "b", "b"), Some("b"), false),
        ]);

        let first = plan(&m, None, MatchPolicy::default()).unwrap();
        let applied = vec![
            AppliedVersion {
                id: VersionId::from("id-a"),
                name: "eager_fox".into(),
            },
            AppliedVersion {
                id: VersionId::from("id-b"),
                name: "b".into(),
            },
        ];
        let checkpoint = first.next_checkpoint(&applied);

        let second = plan(&m, Some(&checkpoint), MatchPolicy::default()).unwrap();
        assert!(!second.creating);
        assert!(second.is_noop(), "got: {second:?}");
        assert_eq!(
            second.versions[0].resolved.name,
            ResolvedName::Adopted("eager_fox".into())
        );
    }

    #[test]
    fn renaming_a_matched_version_plans_rename() {
        let root = TempDir::new().unwrap();
        let dir = content_dir(&root, "a", "a");
        let hash = hash_directory(&dir).unwrap();
        let checkpoint = Checkpoint::from_entries([(
            hash,
            PreviousVersion {
                id: VersionId::from("id-a"),
                name: "old".into(),
                variables: Default::default(),
                active: true,
            },
        )]);

        let m = manifest(vec![spec(dir, Some("new"), true)]);
        let plan = plan(&m, Some(&checkpoint), MatchPolicy::default()).unwrap();
        assert_eq!(
            plan.versions[0].action,
            VersionAction::Rename { from: "old".into() }
        );
        assert!(!plan.activate, "already active remotely");
    }

    #[test]
    fn next_checkpoint_records_variables_and_active_flag() {
        let root = TempDir::new().unwrap();
        let mut v = spec(content_dir(&root, "a", "a"), Some("a"), true);
        v.variables = vec![Variable::new("region", "eu")];
        let m = manifest(vec![v]);

        let p = plan(&m, None, MatchPolicy::default()).unwrap();
        let next = p.next_checkpoint(&[AppliedVersion {
            id: VersionId::from("id-a"),
            name: "a".into(),
        }]);
        let (hash, record) = next.records().next().expect("one record");
        assert_eq!(*hash, p.versions[0].resolved.definition.hash);
        assert!(record.active);
        assert_eq!(record.variables.get("region"), Some(&"eu".to_string()));
    }

    #[test]
    fn unreadable_directory_aborts_before_reconciliation() {
        let root = TempDir::new().unwrap();
        let m = manifest(vec![spec(root.path().join("missing"), None, true)]);
        let err = plan(&m, None, MatchPolicy::default()).unwrap_err();
        assert!(matches!(err, PlanError::Hash { .. }), "got: {err}");
    }

    #[test]
    fn plan_at_reads_checkpoint_from_home() {
        let home = TempDir::new().unwrap();
        let root = TempDir::new().unwrap();
        let dir = content_dir(&root, "a", "a");
        let checkpoint = Checkpoint::from_entries([(
            ContentHash::from("unrelated"),
            PreviousVersion {
                id: VersionId::from("id-x"),
                name: "x".into(),
                variables: Default::default(),
                active: true,
            },
        )]);
        checkpoint::save_at(home.path(), &TemplateName::from("docker"), &checkpoint).unwrap();

        let m = manifest(vec![spec(dir, None, true)]);
        let plan = plan_at(home.path(), &m, MatchPolicy::default()).unwrap();
        assert!(!plan.creating);
        assert_eq!(plan.versions[0].action, VersionAction::Create);
    }
}
