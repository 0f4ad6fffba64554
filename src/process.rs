//! Repair of a single asset.
//!
//! [`process_asset`] detects cross-referenced locales, then brings the asset
//! back in line: unarchive if needed, update, re-ingest every rewritten locale,
//! publish when that does not sweep in unrelated edits, and archive again.
//! Each mutation sends the version returned by the previous one, so the steps
//! run strictly in that order.

use anyhow::{Context, Result};
use serde::Serialize;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, info, trace, warn};

use asset_repair_transport::AssetApi;
use asset_repair_types::{Asset, RepairOptions};

use crate::rewrite::rewrite_asset_urls;
use crate::utils::with_tries;

/// Attempts for each individual mutation inside one repair.
const MUTATION_ATTEMPTS: usize = 2;

/// What a repair did to an asset, ordered by effect.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RepairOutcome {
    NoChange,
    UpdatedOnly,
    UpdatedAndPublished,
}

impl std::fmt::Display for RepairOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            RepairOutcome::NoChange => "no-change",
            RepairOutcome::UpdatedOnly => "updated-only",
            RepairOutcome::UpdatedAndPublished => "updated-and-published",
        })
    }
}

/// Run one mutation with a single retry; the result replaces the local copy.
async fn mutate<F, Fut>(interval: Duration, what: &str, f: F) -> Result<Asset>
where
    F: FnMut(usize) -> Fut,
    Fut: Future<Output = Result<Asset>>,
{
    let asset = with_tries(MUTATION_ATTEMPTS, interval, f)
        .await
        .with_context(|| format!("{} failed", what))?;
    debug!(what, version = asset.version(), "mutation complete");
    trace!(?asset, "mutation output");
    Ok(asset)
}

/// Update, re-ingest and maybe publish. `asset` always holds the latest
/// version the service returned, also when a step fails.
async fn repair_files(
    api: &dyn AssetApi,
    asset: &mut Asset,
    locales: &[String],
    publish_after_update: bool,
    options: &RepairOptions,
) -> Result<RepairOutcome> {
    let dry_run = options.dry_run;
    let interval = options.processing.interval;

    if locales.is_empty() {
        return Ok(RepairOutcome::NoChange);
    }

    debug!(?locales, "updating asset");
    if !dry_run {
        let updated = mutate(interval, "update", |_| api.update_asset(asset)).await?;
        *asset = updated;
    }

    for locale in locales {
        debug!(%locale, "processing locale");
        if !dry_run {
            let processed = mutate(interval, "process", |_| {
                api.process_asset_for_locale(asset, locale)
            })
            .await
            .with_context(|| format!("locale {}", locale))?;
            *asset = processed;
        }
    }

    if !publish_after_update {
        debug!("not publishing asset that has other unpublished changes");
        return Ok(RepairOutcome::UpdatedOnly);
    }

    debug!("publishing updated asset");
    if !dry_run {
        let published = mutate(interval, "publish", |_| api.publish_asset(asset)).await?;
        *asset = published;
    }
    Ok(RepairOutcome::UpdatedAndPublished)
}

/// Latest stored copy of `asset`, or `asset` itself if it cannot be fetched.
async fn reload(api: &dyn AssetApi, asset: Asset) -> Asset {
    let (Some(space_id), Some(environment_id)) = (asset.space_id(), asset.environment_id()) else {
        return asset;
    };
    let fresh = api.get_asset(space_id, environment_id, asset.id()).await;
    match fresh {
        Ok(fresh) => fresh,
        Err(e) => {
            warn!(error = %format!("{:#}", e), "could not reload asset");
            asset
        }
    }
}

/// Repair `asset` and report what was done.
///
/// With `dry_run` no mutation is sent but every decision is taken as if it
/// had been, so the outcome is what a real run would report.
pub async fn process_asset(
    api: &dyn AssetApi,
    mut asset: Asset,
    options: &RepairOptions,
) -> Result<RepairOutcome> {
    let dry_run = options.dry_run;
    let interval = options.processing.interval;

    info!(
        dry_run,
        force_republish = options.force_republish,
        is_draft = asset.is_draft(),
        is_published = asset.is_published(),
        is_updated = asset.is_updated(),
        is_archived = asset.is_archived(),
        "processing asset"
    );
    trace!(?asset, "original asset");

    let publish_after_update =
        asset.is_published() && (options.force_republish || !asset.is_updated());

    let mut locales = rewrite_asset_urls(&mut asset)?;
    if locales.is_empty() {
        debug!("asset in correct state, update not required");
        info!(outcome = %RepairOutcome::NoChange, "processing asset complete");
        return Ok(RepairOutcome::NoChange);
    }

    let mut rearchive = false;
    if asset.is_archived() {
        if options.skip_archived {
            info!(?locales, "leaving archived asset untouched");
            return Ok(RepairOutcome::NoChange);
        }

        debug!("unarchiving asset");
        if !dry_run {
            let unarchived = mutate(interval, "unarchive", |_| api.unarchive_asset(&asset)).await?;
            asset = unarchived;
            locales = rewrite_asset_urls(&mut asset)?;
            if locales.is_empty() {
                warn!("no cross-referenced files left after unarchiving");
            }
        }
        rearchive = true;
    }

    let repaired = repair_files(api, &mut asset, &locales, publish_after_update, options).await;

    // An unarchived asset is archived again even when the repair failed; a
    // retry reloads it and would otherwise never see it as archived.
    if rearchive {
        debug!("archiving asset again");
        if !dry_run {
            if repaired.is_err() {
                asset = reload(api, asset).await;
            }
            let archived = mutate(interval, "archive", |_| api.archive_asset(&asset)).await;
            match (archived, &repaired) {
                (Ok(archived), _) => asset = archived,
                (Err(e), Err(_)) => {
                    warn!(error = %format!("{:#}", e), "could not archive asset after failed repair");
                }
                (Err(e), Ok(_)) => return Err(e),
            }
        }
    }

    let outcome = repaired?;
    info!(%outcome, version = asset.version(), "processing asset complete");
    Ok(outcome)
}
