//! External trigger delivery
//!
//! Signals and config-file changes are turned into [`Trigger`] messages on a
//! bounded channel owned by the daemon loop. Nothing here calls into the
//! controller; the loop that owns the controller does.

use notify::{Event, RecommendedWatcher, RecursiveMode, Watcher};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::mpsc;

/// Capacity of the trigger channel
pub const TRIGGER_CAPACITY: usize = 16;

/// Request delivered to the daemon loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// Re-read the config and reconcile
    Reload,
    /// Stop enforcing, restore everything, exit
    Stop,
}

/// Create the trigger channel
pub fn channel() -> (mpsc::Sender<Trigger>, mpsc::Receiver<Trigger>) {
    mpsc::channel(TRIGGER_CAPACITY)
}

/// Queue a reload unless the channel is already full of pending work
///
/// Reloads are idempotent, so a dropped duplicate loses nothing.
fn request_reload(tx: &mpsc::Sender<Trigger>) -> bool {
    match tx.try_send(Trigger::Reload) {
        Ok(()) => true,
        Err(mpsc::error::TrySendError::Full(_)) => {
            tracing::debug!("Reload already pending, coalescing");
            true
        }
        Err(mpsc::error::TrySendError::Closed(_)) => false,
    }
}

/// Forward SIGUSR2 as [`Trigger::Reload`] and SIGTERM/SIGINT as [`Trigger::Stop`]
///
/// The handlers are installed before this returns.
#[cfg(unix)]
pub fn spawn_signal_listener(
    tx: mpsc::Sender<Trigger>,
) -> std::io::Result<tokio::task::JoinHandle<()>> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut reload = signal(SignalKind::user_defined2())?;
    let mut terminate = signal(SignalKind::terminate())?;
    let mut interrupt = signal(SignalKind::interrupt())?;

    Ok(tokio::spawn(async move {
        loop {
            tokio::select! {
                Some(()) = reload.recv() => {
                    tracing::info!("SIGUSR2 received, reloading");
                    if !request_reload(&tx) {
                        break;
                    }
                }
                Some(()) = terminate.recv() => {
                    tracing::info!("SIGTERM received, stopping");
                    let _ = tx.send(Trigger::Stop).await;
                    break;
                }
                Some(()) = interrupt.recv() => {
                    tracing::info!("SIGINT received, stopping");
                    let _ = tx.send(Trigger::Stop).await;
                    break;
                }
                else => break,
            }
        }
    }))
}

/// Forward Ctrl-C as [`Trigger::Stop`]
#[cfg(not(unix))]
pub fn spawn_signal_listener(
    tx: mpsc::Sender<Trigger>,
) -> std::io::Result<tokio::task::JoinHandle<()>> {
    Ok(tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = tx.send(Trigger::Stop).await;
        }
    }))
}

// ============================================================================
// Config File Watcher
// ============================================================================

/// Configuration for the config file watcher
#[derive(Debug, Clone)]
pub struct WatcherConfig {
    /// Quiet period after the last change before a reload is requested
    pub debounce: Duration,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(200),
        }
    }
}

/// Requests a reload whenever the config file changes
///
/// The containing directory is watched rather than the file itself so that
/// editors which replace the file by rename are still noticed.
pub struct ConfigWatcher {
    _watcher: RecommendedWatcher,
    shutdown_tx: mpsc::Sender<()>,
}

impl ConfigWatcher {
    pub fn new(
        config_path: impl AsRef<Path>,
        tx: mpsc::Sender<Trigger>,
        config: WatcherConfig,
    ) -> Result<Self, WatcherError> {
        let config_path = config_path.as_ref().to_path_buf();
        let file_name: OsString = config_path
            .file_name()
            .ok_or_else(|| WatcherError::InvalidPath(config_path.clone()))?
            .to_os_string();
        let dir = match config_path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };

        let (event_tx, mut event_rx) = mpsc::channel::<Event>(100);
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);

        let mut watcher = notify::recommended_watcher(move |res: Result<Event, notify::Error>| {
            match res {
                Ok(event) => {
                    let _ = event_tx.blocking_send(event);
                }
                Err(e) => tracing::warn!(error = %e, "Config watch error"),
            }
        })
        .map_err(WatcherError::WatcherInit)?;

        watcher
            .watch(&dir, RecursiveMode::NonRecursive)
            .map_err(WatcherError::WatcherInit)?;
        tracing::info!(config = %config_path.display(), "Watching config file for changes");

        let debounce = config.debounce;
        tokio::spawn(async move {
            let mut debounce_timer: Option<tokio::time::Instant> = None;

            loop {
                tokio::select! {
                    _ = shutdown_rx.recv() => {
                        tracing::debug!("Config watcher shutting down");
                        break;
                    }

                    Some(event) = event_rx.recv() => {
                        if Self::touches(&event, &file_name) {
                            debounce_timer = Some(tokio::time::Instant::now() + debounce);
                        }
                    }

                    _ = async {
                        if let Some(deadline) = debounce_timer {
                            tokio::time::sleep_until(deadline).await;
                        } else {
                            std::future::pending::<()>().await;
                        }
                    } => {
                        debounce_timer = None;
                        tracing::info!("Config file changed, reloading");
                        if !request_reload(&tx) {
                            break;
                        }
                    }
                }
            }
        });

        Ok(Self {
            _watcher: watcher,
            shutdown_tx,
        })
    }

    fn touches(event: &Event, file_name: &OsString) -> bool {
        if event.kind.is_access() {
            return false;
        }
        event
            .paths
            .iter()
            .any(|p| p.file_name() == Some(file_name.as_os_str()))
    }

    /// Shutdown the watcher
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(()).await;
    }
}

/// Errors that can occur while setting up the config watcher
#[derive(Debug, thiserror::Error)]
pub enum WatcherError {
    #[error("Failed to initialize watcher: {0}")]
    WatcherInit(#[source] notify::Error),

    #[error("Config path has no file name: {}", .0.display())]
    InvalidPath(PathBuf),
}
