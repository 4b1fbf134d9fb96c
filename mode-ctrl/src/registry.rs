//! Controlled registry
//!
//! The authoritative, insertion-ordered set of controlled paths together
//! with the mode each one had when it was first taken under control.

use crate::gateway::PermissionGateway;
use crate::mode::Mode;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// A path under control and the mode to restore it to
#[derive(Debug, Clone, Serialize)]
pub struct ControlledEntry {
    /// Unique key
    pub path: PathBuf,
    /// Mode captured on insertion; never overwritten while registered
    pub original_mode: Mode,
    /// When `original_mode` was captured
    pub captured_at: DateTime<Utc>,
    /// Whether the last enforcement write failed
    #[serde(skip)]
    pub(crate) write_failing: bool,
}

impl ControlledEntry {
    fn new(path: PathBuf, original_mode: Mode) -> Self {
        Self {
            path,
            original_mode,
            captured_at: Utc::now(),
            write_failing: false,
        }
    }

    /// Mode the enforcement loop keeps on disk
    pub fn restricted_mode(&self) -> Mode {
        self.original_mode.restricted()
    }
}

/// Result of capturing a batch of paths
#[derive(Debug, Default, Clone)]
pub struct CaptureReport {
    /// Paths newly registered
    pub added: Vec<PathBuf>,
    /// Paths that could not be stat'ed
    pub skipped: Vec<PathBuf>,
    /// Paths that were already registered
    pub existing: Vec<PathBuf>,
}

/// Insertion-ordered registry keyed by path
#[derive(Debug, Default)]
pub struct Registry {
    entries: Vec<ControlledEntry>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.entries.iter().any(|e| e.path == path)
    }

    pub fn get(&self, path: &Path) -> Option<&ControlledEntry> {
        self.entries.iter().find(|e| e.path == path)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ControlledEntry> {
        self.entries.iter()
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut ControlledEntry> {
        self.entries.iter_mut()
    }

    /// Registered paths in insertion order
    pub fn paths(&self) -> Vec<PathBuf> {
        self.entries.iter().map(|e| e.path.clone()).collect()
    }

    /// Copy of all entries in insertion order
    pub fn snapshot(&self) -> Vec<ControlledEntry> {
        self.entries.clone()
    }

    /// Take `path` under control, capturing its current mode
    ///
    /// Returns `Ok(false)` without touching the gateway if the path is
    /// already registered.
    pub fn capture(
        &mut self,
        path: &Path,
        gateway: &dyn PermissionGateway,
    ) -> Result<bool, crate::GatewayError> {
        if self.contains(path) {
            return Ok(false);
        }

        let mode = gateway.get_mode(path)?;
        self.entries
            .push(ControlledEntry::new(path.to_path_buf(), mode));
        tracing::info!(path = %path.display(), mode = %mode, "Path taken under control");
        Ok(true)
    }

    /// Capture every path, skipping (and logging) those that fail to stat
    pub fn capture_all<'a>(
        &mut self,
        paths: impl IntoIterator<Item = &'a PathBuf>,
        gateway: &dyn PermissionGateway,
    ) -> CaptureReport {
        let mut report = CaptureReport::default();

        for path in paths {
            match self.capture(path, gateway) {
                Ok(true) => report.added.push(path.clone()),
                Ok(false) => report.existing.push(path.clone()),
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Skipping path that cannot be stat'ed");
                    report.skipped.push(path.clone());
                }
            }
        }

        report
    }

    /// Remove the entry for `path`, if present
    pub fn remove(&mut self, path: &Path) -> Option<ControlledEntry> {
        let index = self.entries.iter().position(|e| e.path == path)?;
        Some(self.entries.remove(index))
    }

    /// Remove and return every entry, leaving the registry empty
    pub fn drain(&mut self) -> Vec<ControlledEntry> {
        std::mem::take(&mut self.entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::MemoryGateway;

    fn gateway() -> MemoryGateway {
        let gateway = MemoryGateway::new();
        gateway.insert("/bin/a", 0o755);
        gateway.insert("/bin/b", 0o700);
        gateway
    }

    #[test]
    fn test_capture_records_original_mode() {
        let gateway = gateway();
        let mut registry = Registry::new();

        assert!(registry.capture(Path::new("/bin/a"), &gateway).unwrap());
        let entry = registry.get(Path::new("/bin/a")).unwrap();
        assert_eq!(entry.original_mode.bits(), 0o755);
        assert_eq!(entry.restricted_mode().bits(), 0o644);
    }

    #[test]
    fn test_capture_is_once_per_path() {
        let gateway = gateway();
        let mut registry = Registry::new();
        registry.capture(Path::new("/bin/a"), &gateway).unwrap();

        gateway.insert("/bin/a", 0o644);
        assert!(!registry.capture(Path::new("/bin/a"), &gateway).unwrap());
        assert_eq!(registry.len(), 1);
        assert_eq!(
            registry.get(Path::new("/bin/a")).unwrap().original_mode.bits(),
            0o755
        );
    }

    #[test]
    fn test_capture_all_skips_missing() {
        let gateway = gateway();
        let mut registry = Registry::new();
        let paths = vec![
            PathBuf::from("/bin/a"),
            PathBuf::from("/bin/missing"),
            PathBuf::from("/bin/b"),
        ];

        let report = registry.capture_all(&paths, &gateway);
        assert_eq!(report.added.len(), 2);
        assert_eq!(report.skipped, vec![PathBuf::from("/bin/missing")]);
        assert_eq!(
            registry.paths(),
            vec![PathBuf::from("/bin/a"), PathBuf::from("/bin/b")]
        );
    }

    #[test]
    fn test_remove_by_key() {
        let gateway = gateway();
        let mut registry = Registry::new();
        registry.capture(Path::new("/bin/a"), &gateway).unwrap();
        registry.capture(Path::new("/bin/b"), &gateway).unwrap();

        let removed = registry.remove(Path::new("/bin/a")).unwrap();
        assert_eq!(removed.path, PathBuf::from("/bin/a"));
        assert!(registry.remove(Path::new("/bin/a")).is_none());
        assert_eq!(registry.paths(), vec![PathBuf::from("/bin/b")]);
    }

    #[test]
    fn test_snapshot_serializes_mode_as_octal() {
        let gateway = gateway();
        let mut registry = Registry::new();
        registry.capture(Path::new("/bin/a"), &gateway).unwrap();

        let json = serde_json::to_value(registry.snapshot()).unwrap();
        assert_eq!(json[0]["original_mode"], "0755");
        assert_eq!(json[0]["path"], "/bin/a");
    }
}
