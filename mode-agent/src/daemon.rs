//! Daemon event loop
//!
//! Owns the controller and the receiving end of the trigger channel; every
//! controller call happens here, never in signal context.

use crate::cli::Cli;
use crate::triggers::{self, ConfigWatcher, Trigger, WatcherConfig};
use anyhow::Context;
use mode_ctrl::{Controller, FileConfigSource, FsGateway, ReloadOutcome, RestoreReport};
use tokio::sync::mpsc;

/// Start controlling per `cli` and serve triggers until stopped
pub async fn run(cli: &Cli) -> anyhow::Result<()> {
    let (tx, rx) = triggers::channel();
    let _signals =
        triggers::spawn_signal_listener(tx.clone()).context("failed to install signal handlers")?;

    let controller = Controller::start(
        FileConfigSource::new(&cli.config),
        FsGateway::new(),
        cli.controller_config(),
    )
    .with_context(|| format!("failed to start controlling {}", cli.config.display()))?;

    let watcher = if cli.watch_config {
        Some(
            ConfigWatcher::new(&cli.config, tx.clone(), WatcherConfig::default())
                .context("failed to watch config file")?,
        )
    } else {
        None
    };
    drop(tx);

    let report = serve(controller, rx).await;

    if let Some(watcher) = watcher {
        watcher.shutdown().await;
    }
    if !report.is_clean() {
        tracing::warn!(
            failed = report.failed.len(),
            "Some paths could not be restored and need manual attention"
        );
    }
    Ok(())
}

/// Handle triggers until [`Trigger::Stop`] or channel closure, then stop
///
/// Controller calls are blocking and run under `block_in_place`, so this
/// needs the multi-threaded runtime.
pub async fn serve(mut controller: Controller, mut rx: mpsc::Receiver<Trigger>) -> RestoreReport {
    tracing::info!(controlled = controller.snapshot().len(), "Daemon running");

    while let Some(trigger) = rx.recv().await {
        match trigger {
            Trigger::Reload => {
                let outcome = tokio::task::block_in_place(|| controller.reload());
                if let ReloadOutcome::SourceUnreadable(e) = &outcome {
                    tracing::debug!(error = %e, "Reload was a no-op");
                }
            }
            Trigger::Stop => break,
        }
    }

    tokio::task::block_in_place(|| controller.stop())
}
