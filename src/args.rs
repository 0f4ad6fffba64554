use clap::{ArgAction, Parser, ValueEnum};
use std::path::PathBuf;

use asset_repair_transport::DEFAULT_API_URL;
use asset_repair_types::{FailurePolicy, RetryPolicy};

use crate::walk::RunScope;

#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum)]
pub enum OnAssetFailure {
    /// Stop the whole run at the first asset that cannot be repaired.
    Abort,
    /// Record the asset in the summary and carry on.
    Continue,
}

impl From<OnAssetFailure> for FailurePolicy {
    fn from(mode: OnAssetFailure) -> Self {
        match mode {
            OnAssetFailure::Abort => FailurePolicy::Abort,
            OnAssetFailure::Continue => FailurePolicy::Continue,
        }
    }
}

/// Find asset files whose URL points into another asset's storage and have
/// the service re-ingest them under the right asset.
#[derive(Debug, Parser)]
#[command(author, version, about)]
pub struct Args {
    /// Management API access token.
    #[arg(long, env = "CMA_ACCESS_TOKEN", hide_env_values = true)]
    pub access_token: String,

    /// Space to process. Can be provided multiple times.
    #[arg(long = "space", value_name = "ID")]
    pub spaces: Vec<String>,

    /// Process every space the token can see.
    #[arg(long, default_value_t = false)]
    pub all_spaces: bool,

    /// Environment to process in each space. Can be provided multiple times.
    #[arg(long = "environment", value_name = "ID")]
    pub environments: Vec<String>,

    /// Process every non-alias environment of each space.
    #[arg(long, default_value_t = false)]
    pub all_environments: bool,

    /// Republish repaired assets even if they have other unpublished changes.
    #[arg(long, default_value_t = false)]
    pub force_republish: bool,

    /// Report what would be done without changing anything.
    #[arg(long, default_value_t = false)]
    pub dry_run: bool,

    /// Leave archived assets alone instead of unarchiving them for the repair.
    #[arg(long, default_value_t = false)]
    pub skip_archived: bool,

    /// Attempts per asset; each retry reloads the asset first.
    #[arg(long, default_value_t = 3)]
    pub processing_attempts: usize,

    /// Fixed delay between attempts in milliseconds.
    #[arg(long, default_value_t = 200)]
    pub retry_interval_ms: u64,

    /// Page size requested from listings (server default when omitted).
    #[arg(long, value_name = "N")]
    pub page_size: Option<usize>,

    /// What to do when an asset still fails after every attempt.
    #[arg(long, value_enum, default_value_t = OnAssetFailure::Abort)]
    pub on_asset_failure: OnAssetFailure,

    /// Management API root URL.
    #[arg(long, default_value = DEFAULT_API_URL)]
    pub api_url: String,

    /// HTTP request timeout in seconds (default: $CMA_TIMEOUT_SECS or 30).
    #[arg(long, value_name = "SECS")]
    pub timeout_secs: Option<u64>,

    /// Write the per-space summary as JSON to a file path (use '-' for stdout).
    #[arg(long, value_name = "PATH")]
    pub summary_json: Option<PathBuf>,

    /// More log output (-v debug, -vv trace). RUST_LOG takes precedence.
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,

    /// Log JSON lines instead of text.
    #[arg(long, default_value_t = false)]
    pub log_json: bool,
}

// Re-export the repair knobs from the shared types crate
pub use asset_repair_types::RepairOptions;

/// Extension trait to create RepairOptions from Args.
pub trait RepairOptionsExt {
    fn from_args(args: &Args) -> RepairOptions;
}

impl RepairOptionsExt for RepairOptions {
    fn from_args(args: &Args) -> RepairOptions {
        RepairOptions {
            processing: RetryPolicy::new(args.processing_attempts, args.retry_interval_ms),
            skip_archived: args.skip_archived,
            force_republish: args.force_republish,
            dry_run: args.dry_run,
            on_asset_failure: args.on_asset_failure.into(),
            page_size: args.page_size,
        }
    }
}

impl Args {
    /// Validate CLI arguments for conflicts and requirements.
    /// Returns an error message if validation fails.
    pub fn validate(&self) -> Result<(), String> {
        if self.access_token.trim().is_empty() {
            return Err("--access-token must not be empty".to_string());
        }

        match (self.spaces.is_empty(), self.all_spaces) {
            (true, false) => return Err("pass --space <ID> or --all-spaces".to_string()),
            (false, true) => {
                return Err("--space cannot be combined with --all-spaces".to_string())
            }
            _ => {}
        }

        match (self.environments.is_empty(), self.all_environments) {
            (true, false) => {
                return Err("pass --environment <ID> or --all-environments".to_string())
            }
            (false, true) => {
                return Err("--environment cannot be combined with --all-environments".to_string())
            }
            _ => {}
        }

        if self.processing_attempts == 0 {
            return Err("--processing-attempts must be at least 1".to_string());
        }

        if self.page_size == Some(0) {
            return Err("--page-size must be at least 1".to_string());
        }

        if self.timeout_secs == Some(0) {
            return Err("--timeout-secs must be at least 1".to_string());
        }

        Ok(())
    }

    /// Spaces and environments selected on the command line.
    pub fn scope(&self) -> RunScope {
        RunScope {
            space_ids: (!self.all_spaces).then(|| self.spaces.clone()),
            environment_ids: (!self.all_environments).then(|| self.environments.clone()),
        }
    }
}
