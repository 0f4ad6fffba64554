use anyhow::{Context, Result};
use serde::Serialize;
use std::fs::{self, File};
use std::future::Future;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::time::Duration;

use asset_repair_types::RetryPolicy;

/// Run `f` up to `attempts` times, passing the 1-based attempt number.
///
/// Failures of every attempt but the last are dropped and followed by a
/// fixed `interval` sleep (skipped when zero). The last attempt is not
/// guarded: its result, success or the exact error, is returned as is.
/// `attempts` below 1 is treated as 1.
pub async fn with_tries<T, F, Fut>(attempts: usize, interval: Duration, mut f: F) -> Result<T>
where
    F: FnMut(usize) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let attempts = attempts.max(1);

    for attempt in 1..attempts {
        match f(attempt).await {
            Ok(v) => return Ok(v),
            Err(e) => {
                tracing::debug!(attempt, attempts, error = %format!("{:#}", e), "attempt failed, retrying");
            }
        }
        if !interval.is_zero() {
            tokio::time::sleep(interval).await;
        }
    }

    f(attempts).await
}

/// [`with_tries`] driven by a [`RetryPolicy`].
pub async fn with_policy<T, F, Fut>(policy: RetryPolicy, f: F) -> Result<T>
where
    F: FnMut(usize) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    with_tries(policy.attempts, policy.interval, f).await
}

/// Write `value` as pretty JSON to `path`, or stdout for `-`.
pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if path.as_os_str() == "-" {
        let stdout = io::stdout();
        let mut writer = BufWriter::new(stdout.lock());
        if let Err(e) = serde_json::to_writer_pretty(&mut writer, value) {
            if e.is_io() && e.io_error_kind() == Some(io::ErrorKind::BrokenPipe) {
                return Ok(());
            }
            return Err(e).context("serialize JSON");
        }
        writer.write_all(b"\n").ok();
        return Ok(());
    }

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).with_context(|| format!("create {}", parent.display()))?;
    }

    let file = File::create(path).with_context(|| format!("create {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, value).context("serialize JSON")?;
    writer.write_all(b"\n").ok();
    Ok(())
}
