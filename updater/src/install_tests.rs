//! Unit tests for the install transaction.

use super::*;
use crate::test_utils::{build_instance, snapshot_tree, utf8_tempdir, write_client_archive};
use crate::artefact::extraction::{ArchiveExtractor, ZipExtractor};
use std::cell::Cell;

/// Delegates to [`FsSwapper`] and fails on the `fail_at`-th call (1-based).
struct FailingSwapper {
    fail_at: usize,
    calls: Cell<usize>,
    on_failure: Box<dyn Fn()>,
}

impl FailingSwapper {
    fn new(fail_at: usize) -> Self {
        Self {
            fail_at,
            calls: Cell::new(0),
            on_failure: Box::new(|| {}),
        }
    }
}

impl PathSwapper for FailingSwapper {
    fn swap(&self, source: &Utf8Path, dest: &Utf8Path) -> io::Result<()> {
        let call = self.calls.get() + 1;
        self.calls.set(call);
        if call == self.fail_at {
            (self.on_failure)();
            return Err(io::Error::new(io::ErrorKind::PermissionDenied, "mods folder is locked"));
        }
        FsSwapper.swap(source, dest)
    }
}

struct Fixture {
    _dir: tempfile::TempDir,
    instance: InstanceRoot,
    client: Utf8PathBuf,
    backups: BackupManager,
}

fn fixture() -> Fixture {
    let (dir, root) = utf8_tempdir();
    let instance = root.join("instance");
    build_instance(&instance);
    let archive = root.join("client.zip");
    write_client_archive(archive.as_std_path(), false);
    let temp = root.join("temp");
    fs::create_dir_all(&temp).expect("create temp");
    ZipExtractor
        .extract(archive.as_std_path(), temp.as_std_path())
        .expect("extract client");
    Fixture {
        _dir: dir,
        instance: InstanceRoot::new(instance),
        client: temp.join("GT New Horizons daily"),
        backups: BackupManager::new(root.join("storage/backup")),
    }
}

fn build() -> BuildId {
    BuildId::new(482).expect("valid id")
}

fn backed_up(fx: &Fixture) -> BackedUpInstall {
    StagedClient::new(build(), fx.client.clone())
        .back_up(&fx.backups, &fx.instance)
        .expect("back up")
}

#[test]
fn install_replaces_client_paths_and_keeps_player_data() {
    let fx = fixture();
    let staged = backed_up(&fx);

    let report = InstallOrchestrator::new(&fx.backups, &FsSwapper)
        .install(staged, &fx.instance)
        .expect("install");

    assert_eq!(report.build, build());
    assert_eq!(report.backup.id(), 1);
    let root = fx.instance.path();
    assert_eq!(
        fs::read(root.join("mmc-pack.json")).expect("read pack"),
        b"{\"components\": [\"new\"]}"
    );
    assert_eq!(
        fs::read(root.join(".minecraft/mods/GT5-Unofficial.jar")).expect("read mod"),
        b"new mod"
    );
    assert!(!root.join(".minecraft/mods/old-only.jar").exists());
    assert_eq!(
        fs::read(root.join(".minecraft/saves/world/level.dat")).expect("read save"),
        b"precious world"
    );
    assert!(root.join("instance.cfg").is_file());
    assert!(!fx.client.join("libraries").exists());
}

#[test]
fn failure_mid_swap_restores_the_root_byte_for_byte() {
    let fx = fixture();
    let before = snapshot_tree(fx.instance.path());
    let staged = backed_up(&fx);
    let swapper = FailingSwapper::new(4);

    let err = InstallOrchestrator::new(&fx.backups, &swapper)
        .install(staged, &fx.instance)
        .expect_err("install should fail");

    let InstallError::RolledBack { source } = &err else {
        panic!("expected RolledBack, got {err:?}");
    };
    assert!(matches!(
        source.as_ref(),
        InstallError::Swap { target: ".minecraft/config", .. }
    ));
    assert_eq!(swapper.calls.get(), 4);
    assert_eq!(snapshot_tree(fx.instance.path()), before);
}

#[test]
fn failed_restore_surfaces_both_errors() {
    let fx = fixture();
    let staged = backed_up(&fx);
    let backup_path = staged.backup().path().to_owned();
    let mut swapper = FailingSwapper::new(2);
    swapper.on_failure = Box::new(move || {
        fs::remove_file(&backup_path).expect("remove backup");
    });

    let err = InstallOrchestrator::new(&fx.backups, &swapper)
        .install(staged, &fx.instance)
        .expect_err("install should fail");

    let InstallError::RestoreFailed { install, restore } = &err else {
        panic!("expected RestoreFailed, got {err:?}");
    };
    assert!(matches!(install.as_ref(), InstallError::Swap { target: "patches", .. }));
    assert!(matches!(restore, BackupError::BackupMissing { .. }));
}

#[test]
fn incomplete_client_is_rejected_before_any_change() {
    let fx = fixture();
    fs::remove_dir_all(fx.client.join("patches")).expect("remove patches");
    let before = snapshot_tree(fx.instance.path());
    let staged = backed_up(&fx);

    let err = InstallOrchestrator::new(&fx.backups, &FsSwapper)
        .install(staged, &fx.instance)
        .expect_err("install should fail");

    assert!(matches!(err, InstallError::SourceMissing { .. }));
    assert_eq!(snapshot_tree(fx.instance.path()), before);
}

#[test]
fn copy_fallback_moves_directories() {
    let (_dir, root) = utf8_tempdir();
    crate::test_utils::write_file(&root, "src/a/b.txt", b"b");
    crate::test_utils::write_file(&root, "src/c.txt", b"c");

    copy_path(&root.join("src"), &root.join("dest")).expect("copy");
    remove_path(&root.join("src")).expect("remove");

    assert_eq!(fs::read(root.join("dest/a/b.txt")).expect("read"), b"b");
    assert_eq!(fs::read(root.join("dest/c.txt")).expect("read"), b"c");
    assert!(!root.join("src").exists());
}
