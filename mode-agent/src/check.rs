//! Dry-run report of what a config would control

use mode_ctrl::{ConfigSource, GatewayError, Mode, PermissionGateway, SourceError};
use serde::Serialize;
use std::path::PathBuf;

/// Per-path verdict
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case", tag = "status")]
pub enum PathStatus {
    /// Would be taken under control
    Controllable { mode: Mode, restricted: Mode },
    /// Does not exist; would be skipped
    Missing,
    /// Cannot be stat'ed for another reason; would be skipped
    Error { message: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct PathReport {
    pub path: PathBuf,
    #[serde(flatten)]
    pub status: PathStatus,
}

#[derive(Debug, Clone, Serialize)]
pub struct CheckReport {
    pub source: String,
    pub paths: Vec<PathReport>,
}

impl CheckReport {
    pub fn controllable(&self) -> usize {
        self.paths
            .iter()
            .filter(|p| matches!(p.status, PathStatus::Controllable { .. }))
            .count()
    }
}

/// Read the source and stat every listed path; no mode is changed
pub fn check(
    source: &dyn ConfigSource,
    gateway: &dyn PermissionGateway,
) -> Result<CheckReport, SourceError> {
    let paths = source
        .read_paths()?
        .into_iter()
        .map(|path| {
            let status = match gateway.get_mode(&path) {
                Ok(mode) => PathStatus::Controllable {
                    mode,
                    restricted: mode.restricted(),
                },
                Err(GatewayError::NotFound(_)) => PathStatus::Missing,
                Err(e) => PathStatus::Error {
                    message: e.to_string(),
                },
            };
            PathReport { path, status }
        })
        .collect();

    Ok(CheckReport {
        source: source.describe(),
        paths,
    })
}
