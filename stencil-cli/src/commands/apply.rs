//! `stencil apply` — bring the remote template in line with a manifest.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use stencil_core::manifest;
use stencil_plan::Plan;
use stencil_remote::config::DEFAULT_ORGANIZATION;
use stencil_remote::{apply_manifest_at, ApplyReport, HttpClient, RemoteConfig};

use super::plan::print_plan;
use super::{home_dir, match_policy};

/// Arguments for `stencil apply`.
#[derive(Args, Debug)]
pub struct ApplyArgs {
    /// Path to the template manifest (YAML).
    pub manifest: PathBuf,

    /// Base URL of the template service.
    #[arg(long, env = "STENCIL_URL")]
    pub url: String,

    /// Session token for the template service.
    #[arg(long, env = "STENCIL_TOKEN", hide_env_values = true)]
    pub token: String,

    /// Organization that owns the template.
    #[arg(long, env = "STENCIL_ORGANIZATION", default_value = DEFAULT_ORGANIZATION)]
    pub organization: String,

    /// Per-request timeout in seconds.
    #[arg(long, default_value_t = 30)]
    pub timeout: u64,

    /// Only reuse a previous version when its variables also match.
    #[arg(long)]
    pub strict_variables: bool,
}

impl ApplyArgs {
    pub fn run(self) -> Result<()> {
        let home = home_dir()?;
        let manifest = manifest::load(&self.manifest)
            .with_context(|| format!("failed to load manifest {}", self.manifest.display()))?;

        let mut config =
            RemoteConfig::new(self.url, self.token).with_organization(self.organization);
        config.timeout = Duration::from_secs(self.timeout);
        let client = HttpClient::new(config);

        let (plan, report) = apply_manifest_at(
            &home,
            &manifest,
            match_policy(self.strict_variables),
            &client,
        )
        .with_context(|| format!("apply failed for template '{}'", manifest.name))?;

        print_plan(&plan);
        print_report(&plan, &report);
        Ok(())
    }
}

fn print_report(plan: &Plan, report: &ApplyReport) {
    let done = "✓".green().bold();
    if report.template_created {
        println!("{done} created template '{}' ({})", plan.template, report.template);
    }
    for built in &report.built {
        println!(
            "{done} built #{} '{}' ({}, {} log lines)",
            built.index,
            built.name,
            built.id,
            built.logs.len()
        );
    }
    if report.renamed > 0 {
        println!("{done} renamed {} version(s)", report.renamed);
    }
    if report.activated {
        let active = &report.versions[plan.active];
        println!("{done} activated '{}' ({})", active.name, active.id);
    }
    if report.built.is_empty() && report.renamed == 0 && !report.activated {
        println!("{done} '{}' already up to date", plan.template);
    }
}
