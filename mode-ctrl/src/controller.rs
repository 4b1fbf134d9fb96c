//! Controller: owns the registry, runs the enforcement loop, and guarantees
//! that every controlled path gets its original mode back.

use crate::enforcer::{Enforcer, DEFAULT_INTERVAL};
use crate::error::ControllerError;
use crate::gateway::PermissionGateway;
use crate::reconcile::{self, ReloadOutcome, RestoreReport};
use crate::registry::{ControlledEntry, Registry};
use crate::source::ConfigSource;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

/// Controller settings
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// Interval between enforcement ticks
    pub interval: Duration,
    /// Start even if no path can be taken under control
    ///
    /// Off by default: an empty initial configuration is a fatal error.
    pub allow_empty_start: bool,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_INTERVAL,
            allow_empty_start: false,
        }
    }
}

/// Execute-permission lockout controller
///
/// Dropping a running controller stops it and restores every path.
pub struct Controller {
    registry: Arc<Mutex<Registry>>,
    gateway: Arc<dyn PermissionGateway>,
    source: Box<dyn ConfigSource>,
    enforcer: Option<Enforcer>,
}

impl Controller {
    /// Read the initial path list, capture modes, and start enforcing
    pub fn start(
        source: impl ConfigSource + 'static,
        gateway: impl PermissionGateway + 'static,
        config: ControllerConfig,
    ) -> Result<Self, ControllerError> {
        Self::start_with(Box::new(source), Arc::new(gateway), config)
    }

    /// Like [`start`](Self::start), for already boxed collaborators
    pub fn start_with(
        source: Box<dyn ConfigSource>,
        gateway: Arc<dyn PermissionGateway>,
        config: ControllerConfig,
    ) -> Result<Self, ControllerError> {
        let paths = source
            .read_paths()
            .map_err(ControllerError::ConfigUnreadable)?;

        let mut registry = Registry::new();
        let report = registry.capture_all(&paths, gateway.as_ref());
        if registry.is_empty() && !config.allow_empty_start {
            return Err(ControllerError::EmptyConfiguration(source.describe()));
        }

        tracing::info!(
            source = %source.describe(),
            controlled = report.added.len(),
            skipped = report.skipped.len(),
            interval_ms = config.interval.as_millis() as u64,
            "Controller starting"
        );

        let registry = Arc::new(Mutex::new(registry));
        let enforcer = Enforcer::spawn(registry.clone(), gateway.clone(), config.interval)?;

        Ok(Self {
            registry,
            gateway,
            source,
            enforcer: Some(enforcer),
        })
    }

    /// Re-read the source and reconcile the registry against it
    ///
    /// Never fails: an unreadable source leaves everything as it was.
    pub fn reload(&self) -> ReloadOutcome {
        let mut registry = self.lock();
        let read = self.source.read_paths();
        reconcile::reconcile(&mut registry, self.gateway.as_ref(), read)
    }

    /// Stop enforcing and restore every registered path
    ///
    /// The loop is joined before any restore write so a tick cannot
    /// re-restrict a path that was just restored. Calling this again is a
    /// no-op.
    pub fn stop(&mut self) -> RestoreReport {
        let Some(enforcer) = self.enforcer.take() else {
            return RestoreReport::default();
        };
        enforcer.stop();

        let mut registry = self.lock();
        let report = reconcile::restore_all(&mut registry, self.gateway.as_ref());
        tracing::info!(
            restored = report.restored.len(),
            failed = report.failed.len(),
            "Controller stopped"
        );
        report
    }

    /// Whether the enforcement loop is running
    pub fn is_running(&self) -> bool {
        self.enforcer.is_some()
    }

    /// Copy of the registry in insertion order
    pub fn snapshot(&self) -> Vec<ControlledEntry> {
        self.lock().snapshot()
    }

    pub fn source(&self) -> &dyn ConfigSource {
        self.source.as_ref()
    }

    // A panic while holding the lock must not prevent restoration.
    fn lock(&self) -> MutexGuard<'_, Registry> {
        self.registry.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Drop for Controller {
    fn drop(&mut self) {
        if self.is_running() {
            self.stop();
        }
    }
}

impl std::fmt::Debug for Controller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Controller")
            .field("source", &self.source.describe())
            .field("running", &self.is_running())
            .finish_non_exhaustive()
    }
}
