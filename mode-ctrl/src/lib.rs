//! mode-ctrl: execute-permission lockout controller
//!
//! Keeps a configured set of files from being executed by continuously
//! clearing their execute bits, and restores each file's exact original mode
//! when control ends.
//!
//! ```text
//! ConfigSource ──read──▶ Controller ──owns──▶ Registry (Arc<Mutex<_>>)
//!                           │                    ▲          ▲
//!                           │ spawn              │ tick     │ reload
//!                           ▼                    │          │
//!                       Enforcer thread ─────────┘   Reconciler
//!                           │                               │
//!                           └──────▶ PermissionGateway ◀────┘
//! ```
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use mode_ctrl::{Controller, ControllerConfig, FileConfigSource, FsGateway};
//!
//! let mut controller = Controller::start(
//!     FileConfigSource::system_default(),
//!     FsGateway::new(),
//!     ControllerConfig::default(),
//! )?;
//!
//! // On SIGUSR2
//! controller.reload();
//!
//! // On SIGTERM: stop the loop, then restore every path
//! controller.stop();
//! ```

pub mod controller;
pub mod enforcer;
pub mod error;
pub mod gateway;
pub mod mode;
pub mod reconcile;
pub mod registry;
pub mod source;

pub use controller::{Controller, ControllerConfig};
pub use enforcer::{enforce_tick, Enforcer, TickReport, DEFAULT_INTERVAL};
pub use error::{ControllerError, GatewayError, SourceError};
pub use gateway::{FsGateway, MemoryGateway, PermissionGateway};
pub use mode::Mode;
pub use reconcile::{ReconcilePlan, ReloadOutcome, ReloadReport, RestoreReport};
pub use registry::{CaptureReport, ControlledEntry, Registry};
pub use source::{parse_paths, ConfigSource, FileConfigSource, StaticConfigSource, DEFAULT_CONFIG_PATH};
