//! Apply pass: carry a [`Plan`] out against the remote service.
//!
//! Entries are processed in declared order. Any failure returns immediately
//! and leaves the checkpoint as it was; only a fully applied plan rewrites it.

use std::collections::HashSet;
use std::path::Path;

use stencil_core::{checkpoint, Checkpoint, TemplateManifest, TemplateName, VersionId};
use stencil_plan::{AppliedVersion, MatchPolicy, Plan, ResolvedVersion, VersionAction};

use crate::api::{
    CreateTemplateRequest, CreateVersionRequest, ProvisionerLog, Template, TemplateApi,
    TemplateId, TemplateVersion,
};
use crate::bundle::archive_dir;
use crate::error::{ApplyError, RemoteError};
use crate::job::JobWaiter;

const STORAGE_METHOD: &str = "file";
const PROVISIONER: &str = "terraform";

/// A version the remote built during this pass.
#[derive(Debug, Clone)]
pub struct BuiltVersion {
    /// Index into the plan's declared entries.
    pub index: usize,
    pub id: VersionId,
    pub name: String,
    pub logs: Vec<ProvisionerLog>,
}

#[derive(Debug, Clone)]
pub struct ApplyReport {
    pub template: TemplateId,
    pub template_created: bool,
    /// Final identity and name of every declared entry, in declared order.
    pub versions: Vec<AppliedVersion>,
    pub built: Vec<BuiltVersion>,
    pub renamed: usize,
    pub activated: bool,
}

/// Load, prune and plan against the checkpoint under `home`, then apply.
pub fn apply_manifest_at(
    home: &Path,
    manifest: &TemplateManifest,
    policy: MatchPolicy,
    api: &dyn TemplateApi,
) -> Result<(Plan, ApplyReport), ApplyError> {
    let loaded = checkpoint::load_at(home, &manifest.name)?;
    let pruned = prune_checkpoint(api, &manifest.name, loaded)?;
    let plan = stencil_plan::plan(manifest, pruned.as_ref(), policy)?;
    let report = apply_at(home, &plan, api)?;
    Ok((plan, report))
}

/// Apply `plan` and, on success, replace the checkpoint under `home`.
pub fn apply_at(
    home: &Path,
    plan: &Plan,
    api: &dyn TemplateApi,
) -> Result<ApplyReport, ApplyError> {
    let mut template = api.template_by_name(&plan.template)?;
    let template_created = template.is_none();
    let mut applied = Vec::with_capacity(plan.versions.len());
    let mut built = Vec::new();
    let mut renamed = 0;

    for (index, planned) in plan.versions.iter().enumerate() {
        let resolved = &planned.resolved;
        match &planned.action {
            VersionAction::Create => {
                let template_id = template.as_ref().map(|t| t.id.clone());
                let version = create_version(api, template_id, resolved)?;
                let logs = JobWaiter::new(api).wait(&version.id)?;
                tracing::info!(
                    template = %plan.template,
                    version = %version.id,
                    name = %version.name,
                    "created template version"
                );

                if template.is_none() {
                    template = Some(create_template(api, plan, &version.id)?);
                }
                built.push(BuiltVersion {
                    index,
                    id: version.id.clone(),
                    name: version.name.clone(),
                    logs,
                });
                applied.push(AppliedVersion {
                    id: version.id,
                    name: version.name,
                });
            }
            VersionAction::Rename { from } => {
                require_template(plan, template.as_ref())?;
                let id = reused_id(index, resolved)?;
                let name = resolved.name.as_str().unwrap_or(from.as_str());
                api.rename_version(&id, name)?;
                tracing::info!(version = %id, %from, to = %name, "renamed template version");
                renamed += 1;
                applied.push(AppliedVersion {
                    id,
                    name: name.to_string(),
                });
            }
            VersionAction::Reuse => {
                require_template(plan, template.as_ref())?;
                let id = reused_id(index, resolved)?;
                let name = resolved
                    .name
                    .as_str()
                    .map(str::to_owned)
                    .or_else(|| resolved.previous.as_ref().map(|p| p.name.clone()))
                    .unwrap_or_default();
                tracing::debug!(version = %id, %name, "reusing template version");
                applied.push(AppliedVersion { id, name });
            }
        }
    }

    let template = require_template(plan, template.as_ref())?.clone();
    if plan.activate {
        let active = &applied[plan.active];
        api.activate_version(&template.id, &active.id)?;
        tracing::info!(
            template = %plan.template,
            version = %active.id,
            "activated template version"
        );
    }

    checkpoint::save_at(home, &plan.template, &plan.next_checkpoint(&applied))?;

    Ok(ApplyReport {
        template: template.id,
        template_created,
        versions: applied,
        built,
        renamed,
        activated: plan.activate,
    })
}

/// Drop checkpoint records whose version no longer exists remotely.
///
/// Returns `None` when there was no checkpoint or the template itself is
/// gone, so the next plan is a first creation.
pub fn prune_checkpoint(
    api: &dyn TemplateApi,
    template: &TemplateName,
    checkpoint: Option<Checkpoint>,
) -> Result<Option<Checkpoint>, RemoteError> {
    let Some(mut checkpoint) = checkpoint else {
        return Ok(None);
    };
    if api.template_by_name(template)?.is_none() {
        tracing::warn!(%template, "template no longer exists remotely; discarding checkpoint");
        return Ok(None);
    }

    let mut missing = HashSet::new();
    for (_, record) in checkpoint.records() {
        if api.version(&record.id)?.is_none() {
            tracing::warn!(
                %template,
                version = %record.id,
                name = %record.name,
                "recorded version no longer exists remotely; dropping it"
            );
            missing.insert(record.id.clone());
        }
    }
    checkpoint.retain(|record| !missing.contains(&record.id));
    Ok(Some(checkpoint))
}

fn create_version(
    api: &dyn TemplateApi,
    template_id: Option<TemplateId>,
    resolved: &ResolvedVersion,
) -> Result<TemplateVersion, ApplyError> {
    let definition = &resolved.definition;
    let bundle = archive_dir(&definition.directory)?;
    let file_id = api.upload_bundle(bundle)?;
    let request = CreateVersionRequest {
        template_id,
        name: resolved.name.as_str().map(str::to_owned),
        message: definition.message.clone(),
        file_id,
        storage_method: STORAGE_METHOD,
        provisioner: PROVISIONER,
        user_variable_values: definition.variables.clone(),
    };
    Ok(api.create_version(&request)?)
}

fn create_template(
    api: &dyn TemplateApi,
    plan: &Plan,
    initial: &VersionId,
) -> Result<Template, ApplyError> {
    let template = api.create_template(&CreateTemplateRequest {
        name: plan.template.clone(),
        display_name: plan.display_name.clone(),
        description: plan.description.clone(),
        template_version_id: initial.clone(),
    })?;
    tracing::info!(template = %plan.template, id = %template.id, "created template");
    Ok(template)
}

fn require_template<'t>(
    plan: &Plan,
    template: Option<&'t Template>,
) -> Result<&'t Template, ApplyError> {
    template.ok_or_else(|| ApplyError::TemplateMissing {
        template: plan.template.to_string(),
    })
}

fn reused_id(index: usize, resolved: &ResolvedVersion) -> Result<VersionId, ApplyError> {
    resolved
        .id
        .clone()
        .ok_or(ApplyError::MissingIdentity { index })
}
