//! End-to-end tests against real files and real chmod

#![cfg(unix)]

use mode_ctrl::{
    Controller, ControllerConfig, ControllerError, FileConfigSource, FsGateway, ReloadOutcome,
};
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tempfile::TempDir;

fn fast() -> ControllerConfig {
    ControllerConfig {
        interval: Duration::from_millis(2),
        ..Default::default()
    }
}

fn make_file(dir: &Path, name: &str, mode: u32) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, b"#!/bin/sh\nexit 0\n").unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(mode)).unwrap();
    path
}

fn mode_of(path: &Path) -> u32 {
    fs::metadata(path).unwrap().permissions().mode() & 0o7777
}

fn write_config(dir: &Path, paths: &[&PathBuf]) -> PathBuf {
    let config = dir.join("mode_ctrl_config");
    let text: String = paths
        .iter()
        .map(|p| format!("{}\n", p.display()))
        .collect();
    fs::write(&config, text).unwrap();
    config
}

fn wait_for(mut cond: impl FnMut() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while !cond() {
        assert!(Instant::now() < deadline, "condition not reached in time");
        std::thread::sleep(Duration::from_millis(2));
    }
}

#[test]
fn test_lockout_and_exact_restore() {
    let temp = TempDir::new().unwrap();
    let a = make_file(temp.path(), "a", 0o755);
    let b = make_file(temp.path(), "b", 0o2751);
    let config = write_config(temp.path(), &[&a, &b]);

    let mut controller =
        Controller::start(FileConfigSource::new(&config), FsGateway::new(), fast()).unwrap();

    wait_for(|| mode_of(&a) == 0o644 && mode_of(&b) == 0o2640);

    controller.stop();
    assert_eq!(mode_of(&a), 0o755);
    assert_eq!(mode_of(&b), 0o2751);
}

#[test]
fn test_reload_diff_on_disk() {
    let temp = TempDir::new().unwrap();
    let a = make_file(temp.path(), "a", 0o755);
    let b = make_file(temp.path(), "b", 0o750);
    let c = make_file(temp.path(), "c", 0o711);
    let config = write_config(temp.path(), &[&a, &b]);

    let mut controller =
        Controller::start(FileConfigSource::new(&config), FsGateway::new(), fast()).unwrap();
    wait_for(|| mode_of(&a) == 0o644 && mode_of(&b) == 0o640);

    write_config(temp.path(), &[&b, &c]);
    assert!(matches!(controller.reload(), ReloadOutcome::Reconciled(_)));

    assert_eq!(mode_of(&a), 0o755);
    wait_for(|| mode_of(&c) == 0o600);

    let snapshot = controller.snapshot();
    let b_entry = snapshot.iter().find(|e| e.path == b).unwrap();
    assert_eq!(b_entry.original_mode.bits(), 0o750);
    let c_entry = snapshot.iter().find(|e| e.path == c).unwrap();
    assert_eq!(c_entry.original_mode.bits(), 0o711);
    assert!(snapshot.iter().all(|e| e.path != a));

    controller.stop();
    assert_eq!(mode_of(&b), 0o750);
    assert_eq!(mode_of(&c), 0o711);
}

#[test]
fn test_empty_reload_releases_everything() {
    let temp = TempDir::new().unwrap();
    let a = make_file(temp.path(), "a", 0o755);
    let config = write_config(temp.path(), &[&a]);

    let controller =
        Controller::start(FileConfigSource::new(&config), FsGateway::new(), fast()).unwrap();
    wait_for(|| mode_of(&a) == 0o644);

    fs::write(&config, "\n\n").unwrap();
    assert!(matches!(controller.reload(), ReloadOutcome::Disabled(_)));
    assert_eq!(mode_of(&a), 0o755);
    assert!(controller.snapshot().is_empty());

    // The loop keeps running but has nothing to touch.
    std::thread::sleep(Duration::from_millis(20));
    assert_eq!(mode_of(&a), 0o755);
}

#[test]
fn test_missing_config_file_is_fatal_at_start_only() {
    let temp = TempDir::new().unwrap();
    let err = Controller::start(
        FileConfigSource::new(temp.path().join("absent")),
        FsGateway::new(),
        fast(),
    )
    .unwrap_err();
    assert!(matches!(err, ControllerError::ConfigUnreadable(_)));

    let a = make_file(temp.path(), "a", 0o755);
    let config = write_config(temp.path(), &[&a]);
    let controller =
        Controller::start(FileConfigSource::new(&config), FsGateway::new(), fast()).unwrap();

    fs::remove_file(&config).unwrap();
    assert!(matches!(
        controller.reload(),
        ReloadOutcome::SourceUnreadable(_)
    ));
    assert_eq!(controller.snapshot().len(), 1);
}

#[test]
fn test_missing_listed_file_is_tolerated() {
    let temp = TempDir::new().unwrap();
    let a = make_file(temp.path(), "a", 0o755);
    let ghost = temp.path().join("ghost");
    let config = write_config(temp.path(), &[&ghost, &a]);

    let controller =
        Controller::start(FileConfigSource::new(&config), FsGateway::new(), fast()).unwrap();
    let snapshot = controller.snapshot();
    assert_eq!(snapshot.len(), 1);
    assert_eq!(snapshot[0].path, a);

    let ghost2 = temp.path().join("ghost2");
    write_config(temp.path(), &[&a, &ghost2]);
    match controller.reload() {
        ReloadOutcome::Reconciled(report) => assert_eq!(report.skipped, vec![ghost2]),
        other => panic!("Expected Reconciled, got {:?}", other),
    }
}

#[test]
fn test_only_missing_files_is_fatal() {
    let temp = TempDir::new().unwrap();
    let ghost = temp.path().join("ghost");
    let config = write_config(temp.path(), &[&ghost]);

    let err = Controller::start(FileConfigSource::new(&config), FsGateway::new(), fast())
        .unwrap_err();
    assert!(matches!(err, ControllerError::EmptyConfiguration(_)));
}

#[test]
fn test_drop_restores_on_disk() {
    let temp = TempDir::new().unwrap();
    let a = make_file(temp.path(), "a", 0o4755);
    let config = write_config(temp.path(), &[&a]);

    {
        let _controller =
            Controller::start(FileConfigSource::new(&config), FsGateway::new(), fast()).unwrap();
        wait_for(|| mode_of(&a) == 0o4644);
    }
    assert_eq!(mode_of(&a), 0o4755);
}
