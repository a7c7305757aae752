//! Version reconciliation — map declared versions onto previously created ones.
//!
//! Matching runs in two passes over the declared list, both in declared order:
//!
//! 1. **Exact name**: an entry with an explicit name consumes the candidate in
//!    its hash bucket carrying that name.
//! 2. **Leftover**: every entry still unmatched consumes the first remaining
//!    candidate in its hash bucket. Unnamed entries adopt the candidate's name.
//!
//! Buckets are shared queues: a candidate consumed by one entry is gone for
//! every later entry. Entries whose bucket is missing or exhausted get no
//! identity and are created by the remote service.

use std::path::PathBuf;

use serde::Serialize;

use stencil_core::{
    variable_map, ContentHash, LastVersionsByHash, PreviousVersion, Variable, VersionId,
};

/// A declared version with its content fingerprint computed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionDefinition {
    /// Explicit name from the manifest; `None` means "let the remote pick".
    pub name: Option<String>,
    pub hash: ContentHash,
    pub active: bool,
    pub variables: Vec<Variable>,
    pub directory: PathBuf,
    pub message: Option<String>,
}

/// Where a resolved version's name comes from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "source", content = "name", rename_all = "snake_case")]
pub enum ResolvedName {
    /// Set explicitly in the manifest.
    Declared(String),
    /// Taken over from the matched previous version.
    Adopted(String),
    /// Unknown until the remote generates one.
    Generate,
}

impl ResolvedName {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ResolvedName::Declared(name) | ResolvedName::Adopted(name) => Some(name),
            ResolvedName::Generate => None,
        }
    }
}

/// One declared entry after reconciliation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedVersion {
    pub definition: VersionDefinition,
    /// `None` until the remote creates the version.
    pub id: Option<VersionId>,
    pub name: ResolvedName,
    /// The checkpoint record this entry consumed, if any.
    pub previous: Option<PreviousVersion>,
}

impl ResolvedVersion {
    /// Human-readable handle for diagnostics.
    pub fn label(&self, index: usize) -> String {
        match self.name.as_str() {
            Some(name) => format!("'{name}'"),
            None => format!("versions[{index}] ({})", self.definition.directory.display()),
        }
    }
}

/// Declared list annotated with identities, in declared order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconciliationResult {
    pub versions: Vec<ResolvedVersion>,
}

/// How strictly a candidate must agree with a declared entry before it is consumed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MatchPolicy {
    /// Content hash plus name priority; variables are not compared.
    #[default]
    ContentAndName,
    /// Additionally require the candidate's variables to equal the declared ones.
    Strict,
}

impl MatchPolicy {
    fn accepts(self, definition: &VersionDefinition, candidate: &PreviousVersion) -> bool {
        match self {
            MatchPolicy::ContentAndName => true,
            MatchPolicy::Strict => variable_map(&definition.variables) == candidate.variables,
        }
    }
}

/// Assign identities to `declared` from the candidates in `checkpoint`.
///
/// Pure: the checkpoint is not modified and identical inputs always produce
/// identical results.
pub fn reconcile(
    declared: Vec<VersionDefinition>,
    checkpoint: &LastVersionsByHash,
    policy: MatchPolicy,
) -> ReconciliationResult {
    let mut pool = checkpoint.clone();
    let mut matched: Vec<Option<PreviousVersion>> = vec![None; declared.len()];

    for (slot, definition) in matched.iter_mut().zip(&declared) {
        let Some(name) = definition.name.as_deref() else {
            continue;
        };
        let Some(bucket) = pool.get_mut(&definition.hash) else {
            continue;
        };
        if let Some(pos) = bucket
            .iter()
            .position(|c| c.name == name && policy.accepts(definition, c))
        {
            *slot = Some(bucket.remove(pos));
        }
    }

    for (slot, definition) in matched.iter_mut().zip(&declared) {
        if slot.is_some() {
            continue;
        }
        let Some(bucket) = pool.get_mut(&definition.hash) else {
            continue;
        };
        if let Some(pos) = bucket.iter().position(|c| policy.accepts(definition, c)) {
            *slot = Some(bucket.remove(pos));
        }
    }

    let versions = declared
        .into_iter()
        .zip(matched)
        .map(|(definition, previous)| resolve_one(definition, previous))
        .collect();
    ReconciliationResult { versions }
}

fn resolve_one(
    definition: VersionDefinition,
    previous: Option<PreviousVersion>,
) -> ResolvedVersion {
    let name = match (&definition.name, &previous) {
        (Some(declared), _) => ResolvedName::Declared(declared.clone()),
        (None, Some(record)) => ResolvedName::Adopted(record.name.clone()),
        (None, None) => ResolvedName::Generate,
    };

    match &previous {
        Some(record) => tracing::debug!(
            hash = %definition.hash,
            id = %record.id,
            name = %record.name,
            "matched previous version"
        ),
        None => tracing::debug!(hash = %definition.hash, "no previous version; will create"),
    }

    ResolvedVersion {
        id: previous.as_ref().map(|record| record.id.clone()),
        name,
        previous,
        definition,
    }
}
