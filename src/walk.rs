//! Traversal of spaces, environments and assets.
//!
//! Each walker resolves its children either from an explicit id list, where a
//! child that cannot be fetched is logged and skipped, or by listing every
//! child the credentials can see. Children are handled one at a time and the
//! cancellation token is checked before each one.

use anyhow::{Context, Result};
use tracing::{debug, info, info_span, warn, Instrument};

use asset_repair_transport::{AssetApi, Paginator};
use asset_repair_types::{Asset, FailurePolicy, RepairOptions};

use crate::cancellation::{CancellationExt, CancellationToken};
use crate::process::{process_asset, RepairOutcome};
use crate::report::{AccountReport, EnvironmentReport, SpaceReport};
use crate::utils::with_policy;

/// Which spaces and environments a run covers. `None` means all of them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunScope {
    pub space_ids: Option<Vec<String>>,
    pub environment_ids: Option<Vec<String>>,
}

/// Repair every asset of one environment.
///
/// Each asset gets `options.processing` attempts; attempts after the first
/// start from a freshly fetched copy. What happens when the last attempt fails
/// is decided by `options.on_asset_failure`.
pub async fn process_environment_assets(
    api: &dyn AssetApi,
    space_id: &str,
    environment_id: &str,
    options: &RepairOptions,
    cancel: &CancellationToken,
) -> Result<EnvironmentReport> {
    info!("processing environment assets");

    let mut report = EnvironmentReport::default();
    let mut assets = Paginator::new(|skip, limit| api.get_assets(space_id, environment_id, skip, limit))
        .with_page_size(options.page_size);

    loop {
        cancel.check()?;
        let Some(asset) = assets
            .next()
            .await
            .with_context(|| format!("list assets of {}/{}", space_id, environment_id))?
        else {
            break;
        };

        let asset_id = asset.id().to_string();
        let span = info_span!("asset", asset_id = %asset_id);
        let result = repair_with_reload(api, space_id, environment_id, asset, options)
            .instrument(span)
            .await;

        match result {
            Ok(outcome) => report.record(&asset_id, outcome),
            Err(e) => match options.on_asset_failure {
                FailurePolicy::Abort => {
                    return Err(e.context(format!(
                        "asset {} in {}/{}",
                        asset_id, space_id, environment_id
                    )));
                }
                FailurePolicy::Continue => {
                    warn!(asset_id = %asset_id, error = %format!("{:#}", e), "asset failed, continuing");
                    report.record_failure(&asset_id, &e);
                }
            },
        }
    }

    info!(
        checked = report.checked.len(),
        updated = report.updated.len(),
        published = report.published.len(),
        failed = report.failed.len(),
        "processing environment assets complete"
    );
    Ok(report)
}

async fn repair_with_reload(
    api: &dyn AssetApi,
    space_id: &str,
    environment_id: &str,
    listed: Asset,
    options: &RepairOptions,
) -> Result<RepairOutcome> {
    let asset_id = listed.id().to_string();
    let asset_id = asset_id.as_str();
    let mut listed = Some(listed);

    with_policy(options.processing, |attempt| {
        let first = listed.take();
        async move {
            let asset = match first {
                Some(asset) => asset,
                None => {
                    debug!(attempt, "reloading asset before retry");
                    api.get_asset(space_id, environment_id, asset_id).await?
                }
            };
            process_asset(api, asset, options).await
        }
    })
    .await
}

/// Repair the assets of a space's environments.
///
/// With explicit `environment_ids` each one is fetched first and skipped with
/// a warning if that fails. Otherwise every environment is listed and alias
/// environments are left out, since they share assets with their target.
pub async fn process_space_assets(
    api: &dyn AssetApi,
    space_id: &str,
    environment_ids: Option<&[String]>,
    options: &RepairOptions,
    cancel: &CancellationToken,
) -> Result<SpaceReport> {
    info!("processing space assets");

    let mut result = SpaceReport::new();
    let mut listing = Paginator::new(|skip, limit| api.get_environments(space_id, skip, limit))
        .with_page_size(options.page_size);
    let mut requested = environment_ids.map(|ids| ids.iter());

    loop {
        cancel.check()?;
        let environment = match requested.as_mut() {
            Some(ids) => {
                let Some(environment_id) = ids.next() else {
                    break;
                };
                match api.get_environment(space_id, environment_id).await {
                    Ok(environment) => environment,
                    Err(e) => {
                        warn!(env_id = %environment_id, error = %format!("{:#}", e), "could not fetch environment, skipping");
                        continue;
                    }
                }
            }
            None => {
                let next = listing
                    .next()
                    .await
                    .with_context(|| format!("list environments of space {}", space_id))?;
                match next {
                    Some(environment) if environment.is_alias() => {
                        debug!(env_id = %environment.id(), "skipping alias environment");
                        continue;
                    }
                    Some(environment) => environment,
                    None => break,
                }
            }
        };

        let environment_id = environment.id();
        let span = info_span!("environment", env_id = %environment_id);
        let report = process_environment_assets(api, space_id, environment_id, options, cancel)
            .instrument(span)
            .await?;
        result.insert(environment_id.to_string(), report);
    }

    info!(environments = result.len(), "processing space assets complete");
    Ok(result)
}

/// Repair every asset in `scope`.
///
/// Explicit space ids that cannot be fetched are skipped with a warning.
/// Without them, every space the credentials can see is walked.
pub async fn process_assets(
    api: &dyn AssetApi,
    scope: &RunScope,
    options: &RepairOptions,
    cancel: &CancellationToken,
) -> Result<AccountReport> {
    info!(dry_run = options.dry_run, "processing assets");

    let mut result = AccountReport::new();
    let mut listing =
        Paginator::new(|skip, limit| api.get_spaces(skip, limit)).with_page_size(options.page_size);
    let mut requested = scope.space_ids.as_ref().map(|ids| ids.iter());
    if requested.is_none() {
        debug!("fetching list of spaces");
    }

    loop {
        cancel.check()?;
        let space = match requested.as_mut() {
            Some(ids) => {
                let Some(space_id) = ids.next() else {
                    break;
                };
                match api.get_space(space_id).await {
                    Ok(space) => space,
                    Err(e) => {
                        warn!(space_id = %space_id, error = %format!("{:#}", e), "could not fetch space, skipping");
                        continue;
                    }
                }
            }
            None => match listing.next().await.context("list spaces")? {
                Some(space) => space,
                None => break,
            },
        };

        let space_id = space.id();
        let span = info_span!("space", space_id = %space_id);
        let report = process_space_assets(
            api,
            space_id,
            scope.environment_ids.as_deref(),
            options,
            cancel,
        )
        .instrument(span)
        .await?;
        result.insert(space_id.to_string(), report);
    }

    info!(spaces = result.len(), "processing assets complete");
    Ok(result)
}
