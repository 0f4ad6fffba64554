//! Per-scope result summaries.
//!
//! Results nest the way the hierarchy does: an [`AccountReport`] maps space
//! ids to [`SpaceReport`]s, which map environment ids to
//! [`EnvironmentReport`]s. Maps keep insertion order, which is the order the
//! scopes were walked in.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::process::RepairOutcome;

/// Outcome lists for one environment.
///
/// The lists are cumulative: a published asset is also listed under
/// `updated` and `checked`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentReport {
    pub checked: Vec<String>,
    pub updated: Vec<String>,
    pub published: Vec<String>,
    /// Assets that still failed after every retry, with `--on-asset-failure continue`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failed: Vec<AssetFailure>,
}

/// One asset that could not be repaired.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetFailure {
    pub asset_id: String,
    pub error: String,
}

pub type SpaceReport = IndexMap<String, EnvironmentReport>;

pub type AccountReport = IndexMap<String, SpaceReport>;

/// The outcome lists of an [`EnvironmentReport`].
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Bucket {
    Checked,
    Updated,
    Published,
}

impl Bucket {
    pub const ALL: [Bucket; 3] = [Bucket::Checked, Bucket::Updated, Bucket::Published];

    /// Least outcome that lands an asset in this bucket.
    pub fn threshold(self) -> RepairOutcome {
        match self {
            Bucket::Checked => RepairOutcome::NoChange,
            Bucket::Updated => RepairOutcome::UpdatedOnly,
            Bucket::Published => RepairOutcome::UpdatedAndPublished,
        }
    }

    pub fn contains(self, outcome: RepairOutcome) -> bool {
        outcome >= self.threshold()
    }
}

impl EnvironmentReport {
    /// File `asset_id` under every bucket its outcome reaches.
    pub fn record(&mut self, asset_id: &str, outcome: RepairOutcome) {
        for bucket in Bucket::ALL {
            if bucket.contains(outcome) {
                self.list_mut(bucket).push(asset_id.to_string());
            }
        }
    }

    pub fn record_failure(&mut self, asset_id: &str, error: &anyhow::Error) {
        self.failed.push(AssetFailure {
            asset_id: asset_id.to_string(),
            error: format!("{:#}", error),
        });
    }

    pub fn list(&self, bucket: Bucket) -> &[String] {
        match bucket {
            Bucket::Checked => &self.checked,
            Bucket::Updated => &self.updated,
            Bucket::Published => &self.published,
        }
    }

    fn list_mut(&mut self, bucket: Bucket) -> &mut Vec<String> {
        match bucket {
            Bucket::Checked => &mut self.checked,
            Bucket::Updated => &mut self.updated,
            Bucket::Published => &mut self.published,
        }
    }
}

/// Totals across a whole run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunTotals {
    pub spaces: usize,
    pub environments: usize,
    pub checked: usize,
    pub updated: usize,
    pub published: usize,
    pub failed: usize,
}

impl RunTotals {
    pub fn of(report: &AccountReport) -> Self {
        let mut totals = Self {
            spaces: report.len(),
            ..Default::default()
        };
        for env in report.values().flat_map(|space| space.values()) {
            totals.environments += 1;
            totals.checked += env.checked.len();
            totals.updated += env.updated.len();
            totals.published += env.published.len();
            totals.failed += env.failed.len();
        }
        totals
    }
}
