//! Shared types for the asset-repair workspace.
//!
//! This crate holds the record shapes exchanged with the content management
//! API and the configuration structs every other crate reads, so that the
//! transport crate and the pipeline crate do not depend on each other for them.
//!
//! - [`asset`]: [`Asset`], [`FileRef`] and the per-locale file map
//! - [`scope`]: [`Space`], [`Environment`], [`Link`] and the paged [`Collection`]

pub mod asset;
pub mod scope;

pub use asset::{Asset, AssetFields, AssetSys, FileRef, FileState, LocaleFiles};
pub use scope::{Collection, Environment, EnvironmentSys, Link, LinkSys, ScopeSys, Space};

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Retry behaviour for per-asset processing.
///
/// Unlike a backoff schedule the interval is fixed between attempts.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, at least 1.
    pub attempts: usize,
    /// Delay between attempts. Zero skips the wait entirely.
    pub interval: Duration,
}

impl RetryPolicy {
    /// Create a policy; `attempts` is clamped to at least 1.
    pub fn new(attempts: usize, interval_ms: u64) -> Self {
        Self {
            attempts: attempts.max(1),
            interval: Duration::from_millis(interval_ms),
        }
    }

    /// A policy that never waits, for tests.
    pub fn immediate(attempts: usize) -> Self {
        Self::new(attempts, 0)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            interval: Duration::from_millis(200),
        }
    }
}

/// What an environment walk does when an asset still fails after every retry.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Propagate the error and end the run.
    #[default]
    Abort,
    /// Record the failure in the environment report and move on.
    Continue,
}

/// Knobs for repairing assets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepairOptions {
    /// Attempts and delay for one asset's whole repair, reloading between tries.
    pub processing: RetryPolicy,
    /// Leave archived assets alone even when they carry a cross-reference.
    pub skip_archived: bool,
    /// Publish repaired assets even if they had other unpublished edits.
    pub force_republish: bool,
    /// Decide everything, mutate nothing.
    pub dry_run: bool,
    pub on_asset_failure: FailurePolicy,
    /// Page size requested from listings; `None` uses the server default.
    pub page_size: Option<usize>,
}

impl Default for RepairOptions {
    fn default() -> Self {
        Self {
            processing: RetryPolicy::default(),
            skip_archived: false,
            force_republish: false,
            dry_run: false,
            on_asset_failure: FailurePolicy::Abort,
            page_size: None,
        }
    }
}
