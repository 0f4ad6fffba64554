//! `asset-repair` command line tool.
//!
//! Walks the selected spaces and environments, repairs every asset whose file
//! URL is a cross-reference and prints a per-space summary.
//!
//! **Exit codes**
//! - `0`: run finished (assets skipped under `--on-asset-failure continue` are
//!   listed in the summary)
//! - `1`: a fatal error stopped the run
//! - `2`: invalid arguments
//! - `130`: interrupted with Ctrl-C; the asset in flight is finished first
use anyhow::{Context, Result};
use clap::Parser;
use std::process::ExitCode;
use std::time::Duration;
use tracing::{error, info, warn};

use asset_repair::args::{Args, RepairOptions, RepairOptionsExt};
use asset_repair::logging::init_logging;
use asset_repair::utils::write_json;
use asset_repair::{is_cancelled, process_assets, CancellationToken, RunTotals};
use asset_repair_transport::ManagementClient;

/// Connect timeout never exceeds this when `--timeout-secs` is given.
const MAX_CONNECT_TIMEOUT_SECS: u64 = 10;

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    if let Err(message) = args.validate() {
        eprintln!("error: {}", message);
        return ExitCode::from(2);
    }

    if let Err(e) = init_logging(args.verbose, args.log_json) {
        eprintln!("error: {:#}", e);
        return ExitCode::FAILURE;
    }

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, stopping after the current asset");
            on_interrupt.cancel();
        }
    });

    match run(&args, &cancel).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) if is_cancelled(&e) => {
            warn!("run cancelled");
            ExitCode::from(130)
        }
        Err(e) => {
            error!(error = %format!("{:#}", e), "run failed");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: &Args, cancel: &CancellationToken) -> Result<()> {
    let client = match args.timeout_secs {
        Some(secs) => ManagementClient::with_timeouts(
            &args.api_url,
            &args.access_token,
            Duration::from_secs(secs),
            Duration::from_secs(secs.min(MAX_CONNECT_TIMEOUT_SECS)),
        ),
        None => ManagementClient::new(&args.api_url, &args.access_token),
    };
    let options = RepairOptions::from_args(args);

    let report = process_assets(&client, &args.scope(), &options, cancel).await?;

    let totals = RunTotals::of(&report);
    info!(
        spaces = totals.spaces,
        environments = totals.environments,
        checked = totals.checked,
        updated = totals.updated,
        published = totals.published,
        failed = totals.failed,
        dry_run = options.dry_run,
        "run complete"
    );

    if let Some(path) = &args.summary_json {
        write_json(path, &report)
            .with_context(|| format!("write summary to {}", path.display()))?;
    }
    Ok(())
}
