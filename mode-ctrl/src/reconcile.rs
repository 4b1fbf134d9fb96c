//! Reload reconciliation
//!
//! Diffs the registry against a freshly read path list by key and applies the
//! result: removed paths are restored and dropped, retained paths are left
//! alone, and new paths have their current mode captured. The caller holds the
//! registry lock for the whole pass, so a reload never interleaves with an
//! enforcement tick.

use crate::error::{GatewayError, SourceError};
use crate::gateway::PermissionGateway;
use crate::registry::{ControlledEntry, Registry};
use std::collections::HashSet;
use std::path::PathBuf;

/// Key-based diff between the registry and a new path list
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ReconcilePlan {
    /// Registered, absent from the new list (registry order)
    pub removed: Vec<PathBuf>,
    /// Present in both (registry order)
    pub retained: Vec<PathBuf>,
    /// Absent from the registry, present in the new list (list order, once each)
    pub added: Vec<PathBuf>,
}

/// Compute the three-way diff; touches neither the registry nor the disk
pub fn plan(registry: &Registry, new_paths: &[PathBuf]) -> ReconcilePlan {
    let wanted: HashSet<&PathBuf> = new_paths.iter().collect();
    let mut plan = ReconcilePlan::default();

    for entry in registry.iter() {
        if wanted.contains(&entry.path) {
            plan.retained.push(entry.path.clone());
        } else {
            plan.removed.push(entry.path.clone());
        }
    }

    let mut queued = HashSet::new();
    for path in new_paths {
        if !registry.contains(path) && queued.insert(path) {
            plan.added.push(path.clone());
        }
    }

    plan
}

/// Result of restoring one or more entries
#[derive(Debug, Default)]
pub struct RestoreReport {
    /// Paths successfully restored to their original mode
    pub restored: Vec<PathBuf>,
    /// Paths whose restore write failed; they are unregistered regardless
    pub failed: Vec<GatewayError>,
}

impl RestoreReport {
    fn record(&mut self, entry: &ControlledEntry, gateway: &dyn PermissionGateway) {
        match gateway.set_mode(&entry.path, entry.original_mode) {
            Ok(()) => {
                tracing::info!(path = %entry.path.display(), mode = %entry.original_mode, "Original mode restored");
                self.restored.push(entry.path.clone());
            }
            Err(e) => {
                tracing::error!(path = %entry.path.display(), mode = %entry.original_mode, error = %e, "Failed to restore original mode");
                self.failed.push(e);
            }
        }
    }

    /// True if every restore write succeeded
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Restore every entry and leave the registry empty
pub fn restore_all(registry: &mut Registry, gateway: &dyn PermissionGateway) -> RestoreReport {
    let mut report = RestoreReport::default();
    for entry in registry.drain() {
        report.record(&entry, gateway);
    }
    report
}

/// Summary of an applied reconciliation
#[derive(Debug, Default)]
pub struct ReloadReport {
    pub added: Vec<PathBuf>,
    pub removed: Vec<PathBuf>,
    pub retained: Vec<PathBuf>,
    /// New paths that could not be stat'ed
    pub skipped: Vec<PathBuf>,
    /// Restore writes that failed for removed paths
    pub restore_failures: Vec<GatewayError>,
}

/// What a reload did
#[derive(Debug)]
pub enum ReloadOutcome {
    /// The source could not be read; nothing changed
    SourceUnreadable(SourceError),
    /// The new list was empty; every entry was restored and dropped
    Disabled(RestoreReport),
    /// The registry was reconciled against a non-empty list
    Reconciled(ReloadReport),
}

/// Apply a reload to `registry`
pub fn reconcile(
    registry: &mut Registry,
    gateway: &dyn PermissionGateway,
    read: Result<Vec<PathBuf>, SourceError>,
) -> ReloadOutcome {
    let new_paths = match read {
        Ok(paths) => paths,
        Err(e) => {
            tracing::warn!(error = %e, "Reload skipped, keeping current registry");
            return ReloadOutcome::SourceUnreadable(e);
        }
    };

    if new_paths.is_empty() {
        tracing::info!(count = registry.len(), "Empty configuration, releasing all paths");
        return ReloadOutcome::Disabled(restore_all(registry, gateway));
    }

    let plan = plan(registry, &new_paths);
    let mut restores = RestoreReport::default();
    for path in &plan.removed {
        if let Some(entry) = registry.remove(path) {
            restores.record(&entry, gateway);
        }
    }

    let captured = registry.capture_all(&plan.added, gateway);

    let report = ReloadReport {
        added: captured.added,
        removed: plan.removed,
        retained: plan.retained,
        skipped: captured.skipped,
        restore_failures: restores.failed,
    };
    tracing::info!(
        added = report.added.len(),
        removed = report.removed.len(),
        retained = report.retained.len(),
        skipped = report.skipped.len(),
        "Registry reconciled"
    );

    ReloadOutcome::Reconciled(report)
}
