//! Enforcement loop
//!
//! Keeps the execute bits of every registered path cleared by rewriting the
//! restricted projection of its original mode at a fixed cadence. The fixed
//! cadence doubles as the retry policy for failed writes.

use crate::error::ControllerError;
use crate::gateway::PermissionGateway;
use crate::registry::Registry;
use std::sync::mpsc::{self, RecvTimeoutError, TryRecvError};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

/// Default interval between ticks
pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(10);

/// Outcome of a single tick
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TickReport {
    /// Successful writes
    pub written: usize,
    /// Failed writes
    pub failed: usize,
}

/// Run one tick over the whole registry
///
/// The caller holds exclusive access to `registry` for the duration.
pub fn enforce_tick(registry: &mut Registry, gateway: &dyn PermissionGateway) -> TickReport {
    let mut report = TickReport::default();

    for entry in registry.iter_mut() {
        let target = entry.restricted_mode();
        match gateway.set_mode(&entry.path, target) {
            Ok(()) => {
                report.written += 1;
                if entry.write_failing {
                    entry.write_failing = false;
                    tracing::info!(path = %entry.path.display(), mode = %target, "Enforcement recovered");
                }
            }
            Err(e) => {
                report.failed += 1;
                if entry.write_failing {
                    tracing::debug!(path = %entry.path.display(), error = %e, "Enforcement still failing");
                } else {
                    entry.write_failing = true;
                    tracing::warn!(path = %entry.path.display(), error = %e, "Failed to restrict mode");
                }
            }
        }
    }

    report
}

/// Handle to the background enforcement thread
pub struct Enforcer {
    stop_tx: mpsc::Sender<()>,
    handle: JoinHandle<()>,
}

impl Enforcer {
    /// Spawn the loop on a dedicated thread
    pub fn spawn(
        registry: Arc<Mutex<Registry>>,
        gateway: Arc<dyn PermissionGateway>,
        interval: Duration,
    ) -> Result<Self, ControllerError> {
        let (stop_tx, stop_rx) = mpsc::channel::<()>();

        let handle = std::thread::Builder::new()
            .name("mode-enforcer".to_string())
            .spawn(move || run(registry, gateway, interval, stop_rx))
            .map_err(ControllerError::Spawn)?;

        tracing::debug!(interval_ms = interval.as_millis() as u64, "Enforcement loop started");
        Ok(Self { stop_tx, handle })
    }

    /// Ask the loop to stop and wait for it to exit
    ///
    /// Waits for any in-flight tick to finish; there is no timeout.
    pub fn stop(self) {
        // A closed channel also stops the loop, so a send error is fine.
        let _ = self.stop_tx.send(());
        if self.handle.join().is_err() {
            tracing::error!("Enforcement thread panicked");
        }
        tracing::debug!("Enforcement loop stopped");
    }
}

impl std::fmt::Debug for Enforcer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Enforcer").finish_non_exhaustive()
    }
}

fn run(
    registry: Arc<Mutex<Registry>>,
    gateway: Arc<dyn PermissionGateway>,
    interval: Duration,
    stop_rx: mpsc::Receiver<()>,
) {
    loop {
        match stop_rx.try_recv() {
            Ok(()) | Err(TryRecvError::Disconnected) => break,
            Err(TryRecvError::Empty) => {}
        }

        {
            let mut registry = registry.lock().unwrap_or_else(|e| e.into_inner());
            let report = enforce_tick(&mut registry, gateway.as_ref());
            tracing::trace!(written = report.written, failed = report.failed, "Tick");
        }

        // Sleep until the next tick; a stop request cuts the sleep short and
        // is picked up at the top of the loop.
        match stop_rx.recv_timeout(interval) {
            Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
            Err(RecvTimeoutError::Timeout) => {}
        }
    }
}
