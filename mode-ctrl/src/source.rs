//! Config sources: where the list of controlled paths comes from

use crate::error::SourceError;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

/// Default location of the controlled path list
pub const DEFAULT_CONFIG_PATH: &str = "/etc/mode_ctrl_config";

/// Supplies the ordered list of paths to control
pub trait ConfigSource: Send + Sync {
    /// Read the current path list
    fn read_paths(&self) -> Result<Vec<PathBuf>, SourceError>;

    /// Human-readable label for logs
    fn describe(&self) -> String;
}

impl<T: ConfigSource + ?Sized> ConfigSource for Arc<T> {
    fn read_paths(&self) -> Result<Vec<PathBuf>, SourceError> {
        (**self).read_paths()
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}

/// Parse the plain-text config format
///
/// One path per line. Empty and whitespace-only lines are skipped, a
/// trailing `\r` is dropped, everything else is taken verbatim. Repeated
/// paths are kept once, at their first position.
pub fn parse_paths(text: &str) -> Vec<PathBuf> {
    let mut seen = HashSet::new();
    let mut paths = Vec::new();

    for line in text.lines() {
        let line = line.strip_suffix('\r').unwrap_or(line);
        if line.trim().is_empty() {
            continue;
        }

        let path = PathBuf::from(line);
        if !path.is_absolute() {
            tracing::warn!(path = %path.display(), "Config path is not absolute");
        }
        if seen.insert(path.clone()) {
            paths.push(path);
        } else {
            tracing::debug!(path = %path.display(), "Duplicate config path ignored");
        }
    }

    paths
}

// ============================================================================
// File Config Source
// ============================================================================

/// Reads the path list from a text file on every call
#[derive(Debug, Clone)]
pub struct FileConfigSource {
    path: PathBuf,
}

impl FileConfigSource {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Source at [`DEFAULT_CONFIG_PATH`]
    pub fn system_default() -> Self {
        Self::new(DEFAULT_CONFIG_PATH)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ConfigSource for FileConfigSource {
    fn read_paths(&self) -> Result<Vec<PathBuf>, SourceError> {
        let text = std::fs::read_to_string(&self.path).map_err(|e| SourceError::Unreadable {
            source_name: self.describe(),
            source: e,
        })?;
        Ok(parse_paths(&text))
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

// ============================================================================
// Static Config Source
// ============================================================================

/// In-memory path list that can be swapped at runtime
///
/// [`set_unreadable`](Self::set_unreadable) makes subsequent reads fail,
/// which mirrors a config file that has disappeared.
pub struct StaticConfigSource {
    paths: RwLock<Option<Vec<PathBuf>>>,
}

impl StaticConfigSource {
    pub fn new<I, P>(paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            paths: RwLock::new(Some(paths.into_iter().map(Into::into).collect())),
        }
    }

    /// Replace the list returned by the next read
    pub fn set<I, P>(&self, paths: I)
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        *self.paths.write().unwrap_or_else(|e| e.into_inner()) =
            Some(paths.into_iter().map(Into::into).collect());
    }

    /// Make the next reads fail
    pub fn set_unreadable(&self) {
        *self.paths.write().unwrap_or_else(|e| e.into_inner()) = None;
    }
}

impl ConfigSource for StaticConfigSource {
    fn read_paths(&self) -> Result<Vec<PathBuf>, SourceError> {
        self.paths
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
            .ok_or_else(|| SourceError::Unreadable {
                source_name: self.describe(),
                source: std::io::Error::from(std::io::ErrorKind::NotFound),
            })
    }

    fn describe(&self) -> String {
        "<static>".to_string()
    }
}

impl std::fmt::Debug for StaticConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticConfigSource").finish_non_exhaustive()
    }
}
