//! Asset cross-reference repair
//!
//! Finds asset files whose URL points into the storage path of a different
//! asset (or space) and has the content management service ingest them again
//! under the asset that owns them:
//!
//! - **Detection**: [`rewrite`] turns cross-referenced locales into uploads
//! - **Repair**: [`process`] runs unarchive, update, process, publish and
//!   rearchive for one asset
//! - **Traversal**: [`walk`] covers spaces, environments and assets with
//!   retries, failure policy and cooperative cancellation
//! - **Results**: [`report`] holds the nested per-scope summaries
//!
//! The remote service is reached through
//! [`AssetApi`](asset_repair_transport::AssetApi); see the
//! `asset-repair-transport` crate for the HTTP and in-memory backends.

pub mod args;
pub mod cancellation;
pub mod logging;
pub mod process;
pub mod report;
pub mod rewrite;
pub mod utils;
pub mod walk;

pub use cancellation::{is_cancelled, CancellationExt, CancellationToken, Cancelled};
pub use process::{process_asset, RepairOutcome};
pub use report::{AccountReport, AssetFailure, Bucket, EnvironmentReport, RunTotals, SpaceReport};
pub use rewrite::{rewrite_asset_urls, rewrite_file_urls};
pub use utils::{with_policy, with_tries};
pub use walk::{process_assets, process_environment_assets, process_space_assets, RunScope};
