//! `stencil plan` — offline plan against the local checkpoint.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use stencil_core::manifest;
use stencil_plan::{Plan, ResolvedName, VersionAction};

use super::{home_dir, match_policy};

/// Arguments for `stencil plan`.
#[derive(Args, Debug)]
pub struct PlanArgs {
    /// Path to the template manifest (YAML).
    pub manifest: PathBuf,

    /// Only reuse a previous version when its variables also match.
    #[arg(long)]
    pub strict_variables: bool,

    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

impl PlanArgs {
    pub fn run(self) -> Result<()> {
        let home = home_dir()?;
        let manifest = manifest::load(&self.manifest)
            .with_context(|| format!("failed to load manifest {}", self.manifest.display()))?;
        let plan = stencil_plan::plan_at(&home, &manifest, match_policy(self.strict_variables))
            .with_context(|| format!("failed to plan template '{}'", manifest.name))?;

        if self.json {
            let payload = PlanJson::from(&plan);
            println!(
                "{}",
                serde_json::to_string_pretty(&payload).context("failed to serialize plan JSON")?
            );
            return Ok(());
        }

        print_plan(&plan);
        Ok(())
    }
}

#[derive(Serialize)]
struct PlanJson<'a> {
    template: String,
    creating: bool,
    active: usize,
    activate: bool,
    versions: Vec<PlannedJson<'a>>,
}

#[derive(Serialize)]
struct PlannedJson<'a> {
    index: usize,
    directory: String,
    hash: String,
    name: &'a ResolvedName,
    id: Option<String>,
    #[serde(flatten)]
    action: &'a VersionAction,
}

impl<'a> From<&'a Plan> for PlanJson<'a> {
    fn from(plan: &'a Plan) -> Self {
        Self {
            template: plan.template.to_string(),
            creating: plan.creating,
            active: plan.active,
            activate: plan.activate,
            versions: plan
                .versions
                .iter()
                .enumerate()
                .map(|(index, planned)| PlannedJson {
                    index,
                    directory: planned.resolved.definition.directory.display().to_string(),
                    hash: planned.resolved.definition.hash.to_string(),
                    name: &planned.resolved.name,
                    id: planned.resolved.id.as_ref().map(ToString::to_string),
                    action: &planned.action,
                })
                .collect(),
        }
    }
}

#[derive(Tabled)]
struct PlanTableRow {
    #[tabled(rename = "#")]
    index: usize,
    #[tabled(rename = "name")]
    name: String,
    #[tabled(rename = "hash")]
    hash: String,
    #[tabled(rename = "identity")]
    identity: String,
    #[tabled(rename = "action")]
    action: String,
    #[tabled(rename = "active")]
    active: String,
}

pub(crate) fn print_plan(plan: &Plan) {
    let heading = if plan.creating {
        format!("Template '{}' (new)", plan.template)
    } else {
        format!("Template '{}'", plan.template)
    };
    println!("{}", heading.bold());

    let rows: Vec<PlanTableRow> = plan
        .versions
        .iter()
        .enumerate()
        .map(|(index, planned)| PlanTableRow {
            index,
            name: display_name(&planned.resolved.name),
            hash: short_hash(&planned.resolved.definition.hash.0),
            identity: planned
                .resolved
                .id
                .as_ref()
                .map_or_else(|| "-".to_string(), ToString::to_string),
            action: action_label(&planned.action),
            active: if index == plan.active { "*" } else { "" }.to_string(),
        })
        .collect();
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{table}");

    if plan.is_noop() {
        println!("{} nothing to do", "✓".green().bold());
        return;
    }
    let activation = if plan.activate {
        format!(", activate #{}", plan.active)
    } else {
        String::new()
    };
    println!(
        "{} {} to create{}",
        "→".cyan().bold(),
        plan.creations(),
        activation
    );
}

fn display_name(name: &ResolvedName) -> String {
    match name {
        ResolvedName::Declared(name) | ResolvedName::Adopted(name) => name.clone(),
        ResolvedName::Generate => "(generated)".to_string(),
    }
}

fn action_label(action: &VersionAction) -> String {
    match action {
        VersionAction::Create => "create".green().to_string(),
        VersionAction::Reuse => "reuse".bright_black().to_string(),
        VersionAction::Rename { from } => format!("{} from '{from}'", "rename".yellow()),
    }
}

fn short_hash(hash: &str) -> String {
    hash.chars().take(12).collect()
}
