//! Permission gateway: the only filesystem surface the controller touches
//!
//! Provides the [`PermissionGateway`] trait with a real filesystem
//! implementation and an in-memory one for tests and embedding.

use crate::error::GatewayError;
use crate::mode::Mode;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};

/// Query and apply permission modes, one path at a time
///
/// Failures are always per-path; an implementation never fails globally.
pub trait PermissionGateway: Send + Sync {
    /// Current permission bits of `path` (following symlinks)
    fn get_mode(&self, path: &Path) -> Result<Mode, GatewayError>;

    /// Apply `mode` to `path`
    fn set_mode(&self, path: &Path, mode: Mode) -> Result<(), GatewayError>;
}

impl<T: PermissionGateway + ?Sized> PermissionGateway for Arc<T> {
    fn get_mode(&self, path: &Path) -> Result<Mode, GatewayError> {
        (**self).get_mode(path)
    }

    fn set_mode(&self, path: &Path, mode: Mode) -> Result<(), GatewayError> {
        (**self).set_mode(path, mode)
    }
}

// ============================================================================
// Filesystem Gateway
// ============================================================================

/// Gateway backed by `stat`/`chmod` through `std::fs`
#[derive(Debug, Clone, Copy, Default)]
pub struct FsGateway;

impl FsGateway {
    pub fn new() -> Self {
        Self
    }
}

#[cfg(unix)]
impl PermissionGateway for FsGateway {
    fn get_mode(&self, path: &Path) -> Result<Mode, GatewayError> {
        use std::os::unix::fs::PermissionsExt;

        let metadata = std::fs::metadata(path).map_err(|e| GatewayError::from_io(path, e))?;
        Ok(Mode::from_raw(metadata.permissions().mode()))
    }

    fn set_mode(&self, path: &Path, mode: Mode) -> Result<(), GatewayError> {
        use std::os::unix::fs::PermissionsExt;

        std::fs::set_permissions(path, std::fs::Permissions::from_mode(mode.bits()))
            .map_err(|e| GatewayError::from_io(path, e))
    }
}

#[cfg(not(unix))]
impl PermissionGateway for FsGateway {
    fn get_mode(&self, path: &Path) -> Result<Mode, GatewayError> {
        Err(GatewayError::Io {
            path: path.to_path_buf(),
            source: std::io::Error::from(std::io::ErrorKind::Unsupported),
        })
    }

    fn set_mode(&self, path: &Path, _mode: Mode) -> Result<(), GatewayError> {
        Err(GatewayError::Io {
            path: path.to_path_buf(),
            source: std::io::Error::from(std::io::ErrorKind::Unsupported),
        })
    }
}

// ============================================================================
// In-Memory Gateway
// ============================================================================

/// In-memory file table
///
/// Paths that were never [`insert`](Self::insert)ed report `NotFound`.
/// Writes to paths marked with [`fail_writes`](Self::fail_writes) return an
/// I/O error and leave the stored mode untouched.
pub struct MemoryGateway {
    files: RwLock<HashMap<PathBuf, Mode>>,
    failing: RwLock<HashSet<PathBuf>>,
    writes: AtomicUsize,
}

impl MemoryGateway {
    pub fn new() -> Self {
        Self {
            files: RwLock::new(HashMap::new()),
            failing: RwLock::new(HashSet::new()),
            writes: AtomicUsize::new(0),
        }
    }

    /// Create (or overwrite) a file with the given raw mode
    pub fn insert(&self, path: impl Into<PathBuf>, raw_mode: u32) {
        self.files
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(path.into(), Mode::from_raw(raw_mode));
    }

    /// Delete a file
    pub fn remove(&self, path: impl AsRef<Path>) {
        self.files
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .remove(path.as_ref());
    }

    /// Current mode of a file, if it exists
    pub fn mode_of(&self, path: impl AsRef<Path>) -> Option<Mode> {
        self.files
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(path.as_ref())
            .copied()
    }

    /// Make every write to `path` fail until [`heal`](Self::heal) is called
    pub fn fail_writes(&self, path: impl Into<PathBuf>) {
        self.failing
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(path.into());
    }

    /// Stop failing writes to `path`
    pub fn heal(&self, path: impl AsRef<Path>) {
        self.failing
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .remove(path.as_ref());
    }

    /// Number of successful writes so far
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

impl Default for MemoryGateway {
    fn default() -> Self {
        Self::new()
    }
}

impl PermissionGateway for MemoryGateway {
    fn get_mode(&self, path: &Path) -> Result<Mode, GatewayError> {
        self.mode_of(path)
            .ok_or_else(|| GatewayError::NotFound(path.to_path_buf()))
    }

    fn set_mode(&self, path: &Path, mode: Mode) -> Result<(), GatewayError> {
        if self
            .failing
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .contains(path)
        {
            return Err(GatewayError::Io {
                path: path.to_path_buf(),
                source: std::io::Error::from(std::io::ErrorKind::PermissionDenied),
            });
        }

        let mut files = self.files.write().unwrap_or_else(|e| e.into_inner());
        match files.get_mut(path) {
            Some(current) => {
                *current = mode;
                self.writes.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
            None => Err(GatewayError::NotFound(path.to_path_buf())),
        }
    }
}

impl std::fmt::Debug for MemoryGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryGateway")
            .field("writes", &self.write_count())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_gateway_roundtrip() {
        let gateway = MemoryGateway::new();
        gateway.insert("/bin/tool", 0o100755);

        assert_eq!(gateway.get_mode(Path::new("/bin/tool")).unwrap().bits(), 0o755);
        gateway
            .set_mode(Path::new("/bin/tool"), Mode::from_raw(0o644))
            .unwrap();
        assert_eq!(gateway.mode_of("/bin/tool").unwrap().bits(), 0o644);
        assert_eq!(gateway.write_count(), 1);
    }

    #[test]
    fn test_memory_gateway_missing_file() {
        let gateway = MemoryGateway::new();
        let err = gateway.get_mode(Path::new("/nope")).unwrap_err();
        assert!(matches!(err, GatewayError::NotFound(_)));
    }

    #[test]
    fn test_memory_gateway_injected_failure() {
        let gateway = MemoryGateway::new();
        gateway.insert("/bin/tool", 0o755);
        gateway.fail_writes("/bin/tool");

        let err = gateway
            .set_mode(Path::new("/bin/tool"), Mode::from_raw(0o644))
            .unwrap_err();
        assert!(matches!(err, GatewayError::Io { .. }));
        assert_eq!(gateway.mode_of("/bin/tool").unwrap().bits(), 0o755);

        gateway.heal("/bin/tool");
        assert!(gateway
            .set_mode(Path::new("/bin/tool"), Mode::from_raw(0o644))
            .is_ok());
    }

    #[cfg(unix)]
    #[test]
    fn test_fs_gateway_strips_and_restores() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tool");
        std::fs::write(&path, b"#!/bin/sh\n").unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o750)).unwrap();

        let gateway = FsGateway::new();
        let original = gateway.get_mode(&path).unwrap();
        assert_eq!(original.bits(), 0o750);

        gateway.set_mode(&path, original.restricted()).unwrap();
        assert_eq!(gateway.get_mode(&path).unwrap().bits(), 0o640);

        gateway.set_mode(&path, original).unwrap();
        assert_eq!(gateway.get_mode(&path).unwrap().bits(), 0o750);
    }

    #[cfg(unix)]
    #[test]
    fn test_fs_gateway_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = FsGateway::new()
            .get_mode(&dir.path().join("absent"))
            .unwrap_err();
        assert!(matches!(err, GatewayError::NotFound(_)));
    }
}
