//! # stencil-plan
//!
//! Content hashing, version reconciliation and active-version resolution.
//!
//! Call [`plan`] (or [`plan_at`] to load the checkpoint from disk) to turn a
//! manifest into a [`Plan`]: one action per declared version plus the single
//! version that must end up active.

pub mod active;
pub mod error;
pub mod hasher;
pub mod plan;
pub mod reconcile;

pub use error::{AmbiguityError, PlanError};
pub use hasher::{content_files, hash_directory};
pub use plan::{plan, plan_at, AppliedVersion, Plan, PlannedVersion, VersionAction};
pub use reconcile::{
    reconcile, MatchPolicy, ReconciliationResult, ResolvedName, ResolvedVersion,
    VersionDefinition,
};
