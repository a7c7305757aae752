pub mod apply;
pub mod checkpoint;
pub mod hash;
pub mod plan;

use std::path::PathBuf;

use anyhow::{Context, Result};
use stencil_plan::MatchPolicy;

pub(crate) fn home_dir() -> Result<PathBuf> {
    dirs::home_dir().context("could not determine home directory")
}

pub(crate) fn match_policy(strict_variables: bool) -> MatchPolicy {
    if strict_variables {
        MatchPolicy::Strict
    } else {
        MatchPolicy::ContentAndName
    }
}
