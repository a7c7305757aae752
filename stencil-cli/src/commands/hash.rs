//! `stencil hash` — fingerprint a version directory.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

/// Arguments for `stencil hash`.
#[derive(Args, Debug)]
pub struct HashArgs {
    /// Version directory to hash.
    pub directory: PathBuf,
}

impl HashArgs {
    pub fn run(self) -> Result<()> {
        let hash = stencil_plan::hash_directory(&self.directory)
            .with_context(|| format!("failed to hash {}", self.directory.display()))?;
        println!("{hash}");
        Ok(())
    }
}
