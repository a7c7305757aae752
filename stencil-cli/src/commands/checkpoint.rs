//! `stencil checkpoint` — inspect the local checkpoint.

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use stencil_core::{checkpoint, manifest, Checkpoint, TemplateName, VariableMap};

use super::home_dir;

#[derive(Subcommand, Debug)]
pub enum CheckpointCommand {
    /// Print the recorded versions of a template.
    Show(ShowArgs),
}

#[derive(Args, Debug)]
pub struct ShowArgs {
    /// Template name.
    pub template: String,

    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

pub fn run(command: CheckpointCommand) -> Result<()> {
    match command {
        CheckpointCommand::Show(args) => show(args),
    }
}

#[derive(Serialize)]
struct CheckpointJson<'a> {
    template: &'a str,
    path: String,
    saved_at: Option<String>,
    versions: Vec<RecordJson<'a>>,
}

#[derive(Serialize)]
struct RecordJson<'a> {
    hash: &'a str,
    id: &'a str,
    name: &'a str,
    active: bool,
    variables: &'a VariableMap,
}

#[derive(Tabled)]
struct RecordRow {
    #[tabled(rename = "hash")]
    hash: String,
    #[tabled(rename = "identity")]
    id: String,
    #[tabled(rename = "name")]
    name: String,
    #[tabled(rename = "active")]
    active: String,
    #[tabled(rename = "variables")]
    variables: String,
}

fn show(args: ShowArgs) -> Result<()> {
    manifest::validate_template_name(&args.template).map_err(anyhow::Error::msg)?;
    let home = home_dir()?;
    let template = TemplateName::from(args.template.as_str());
    let path = checkpoint::path_at(&home, &template);
    let loaded = checkpoint::load_at(&home, &template)
        .with_context(|| format!("failed to load checkpoint for '{template}'"))?;

    let Some(checkpoint) = loaded else {
        println!("No checkpoint for template '{template}'.");
        return Ok(());
    };

    if args.json {
        let payload = CheckpointJson {
            template: &template.0,
            path: path.display().to_string(),
            saved_at: checkpoint.saved_at.map(|at| at.to_rfc3339()),
            versions: checkpoint
                .records()
                .map(|(hash, record)| RecordJson {
                    hash: &hash.0,
                    id: &record.id.0,
                    name: &record.name,
                    active: record.active,
                    variables: &record.variables,
                })
                .collect(),
        };
        println!(
            "{}",
            serde_json::to_string_pretty(&payload)
                .context("failed to serialize checkpoint JSON")?
        );
        return Ok(());
    }

    print_table(&template, &checkpoint);
    Ok(())
}

fn print_table(template: &TemplateName, checkpoint: &Checkpoint) {
    let saved = checkpoint
        .saved_at
        .map_or_else(|| "unknown".to_string(), |at| at.to_rfc3339());
    println!("{} (saved {saved})", format!("Template '{template}'").bold());

    let rows: Vec<RecordRow> = checkpoint
        .records()
        .map(|(hash, record)| RecordRow {
            hash: hash.0.chars().take(12).collect(),
            id: record.id.to_string(),
            name: record.name.clone(),
            active: if record.active { "*" } else { "" }.to_string(),
            variables: record
                .variables
                .iter()
                .map(|(k, v)| format!("{k}={v}"))
                .collect::<Vec<_>>()
                .join(", "),
        })
        .collect();
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{table}");
}
