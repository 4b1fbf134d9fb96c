//! Error types for the mode controller

use std::path::PathBuf;
use thiserror::Error;

/// Per-path failure reported by a [`PermissionGateway`](crate::PermissionGateway)
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("File not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl GatewayError {
    /// Classify an I/O error for a path
    pub fn from_io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        if source.kind() == std::io::ErrorKind::NotFound {
            Self::NotFound(path)
        } else {
            Self::Io { path, source }
        }
    }

    /// The path the failure refers to
    pub fn path(&self) -> &std::path::Path {
        match self {
            Self::NotFound(path) => path,
            Self::Io { path, .. } => path,
        }
    }
}

/// Failure to read the controlled path list
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Failed to read config {source_name}: {source}")]
    Unreadable {
        source_name: String,
        #[source]
        source: std::io::Error,
    },
}

/// Fatal errors surfaced by [`Controller::start`](crate::Controller::start)
#[derive(Debug, Error)]
pub enum ControllerError {
    #[error("Configuration unreadable: {0}")]
    ConfigUnreadable(#[source] SourceError),

    #[error("No controllable path in configuration {0}")]
    EmptyConfiguration(String),

    #[error("Failed to spawn enforcement thread: {0}")]
    Spawn(#[source] std::io::Error),
}
