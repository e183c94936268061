//! Unit tests for backup rotation and restore.

use super::*;
use crate::test_utils::{build_instance, corrupt_first_entry, snapshot_tree, utf8_tempdir, write_file};
use rstest::rstest;

struct Fixture {
    _dir: tempfile::TempDir,
    manager: BackupManager,
    instance: Utf8PathBuf,
}

fn fixture() -> Fixture {
    let (dir, root) = utf8_tempdir();
    let instance = root.join("instance");
    build_instance(&instance);
    Fixture {
        _dir: dir,
        manager: BackupManager::new(root.join("storage/backup")),
        instance,
    }
}

fn ids(manager: &BackupManager) -> Vec<u32> {
    manager
        .list()
        .expect("list backups")
        .iter()
        .map(Backup::id)
        .collect()
}

#[rstest]
#[case("backup-1.zip", Some(1))]
#[case("backup-482.zip", Some(482))]
#[case("backup-.zip", None)]
#[case("backup-1.zip.tmp", None)]
#[case("old-backup-1.zip", None)]
#[case("backup-1.ZIP", None)]
fn backup_names(#[case] name: &str, #[case] expected: Option<u32>) {
    assert_eq!(parse_backup_name(name), expected);
}

#[test]
fn missing_directory_lists_nothing() {
    let fx = fixture();
    assert!(fx.manager.list().expect("list").is_empty());
}

#[test]
fn first_backup_gets_id_one() {
    let fx = fixture();

    let backup = fx.manager.create(&fx.instance).expect("create");

    assert_eq!(backup.id(), 1);
    assert!(backup.path().ends_with("backup-1.zip"));
    assert!(verify_archive(backup.path().as_std_path()).is_ok());
}

#[test]
fn six_backups_keep_the_newest_five() {
    let fx = fixture();

    for _ in 0..6 {
        fx.manager.create(&fx.instance).expect("create");
    }

    assert_eq!(ids(&fx.manager), vec![2, 3, 4, 5, 6]);
}

#[test]
fn ids_continue_after_the_highest_existing() {
    let fx = fixture();
    fx.manager.create(&fx.instance).expect("create");
    fs::rename(fx.manager.backup_path(1), fx.manager.backup_path(41)).expect("rename");

    let backup = fx.manager.create(&fx.instance).expect("create");

    assert_eq!(backup.id(), 42);
}

#[test]
fn unexpected_file_blocks_backup() {
    let fx = fixture();
    write_file(fx.manager.dir(), "notes.txt", b"hi");

    let err = fx.manager.create(&fx.instance).expect_err("corrupt store");

    assert!(matches!(err, BackupError::UnexpectedFile { .. }));
    assert!(err.to_string().contains("notes.txt"));
}

#[test]
fn restore_reproduces_the_snapshot_exactly() {
    let fx = fixture();
    let before = snapshot_tree(&fx.instance);
    let backup = fx.manager.create(&fx.instance).expect("create");
    write_file(&fx.instance, "mmc-pack.json", b"half-installed");
    write_file(&fx.instance, "libraries/new-only.jar", b"new");
    fs::remove_dir_all(fx.instance.join(".minecraft/saves")).expect("remove saves");

    fx.manager.restore(&backup, &fx.instance).expect("restore");

    assert_eq!(snapshot_tree(&fx.instance), before);
}

#[test]
fn restore_of_missing_backup_leaves_root_alone() {
    let fx = fixture();
    let before = snapshot_tree(&fx.instance);
    let backup = fx.manager.create(&fx.instance).expect("create");
    fs::remove_file(backup.path()).expect("remove backup");

    let err = fx.manager.restore(&backup, &fx.instance).expect_err("missing");

    assert!(matches!(err, BackupError::BackupMissing { .. }));
    assert_eq!(snapshot_tree(&fx.instance), before);
}

#[test]
fn restore_of_corrupt_backup_leaves_root_alone() {
    let fx = fixture();
    let backup = fx.manager.create(&fx.instance).expect("create");
    let stored = backup.path().with_extension("stored");
    crate::test_utils::write_zip(stored.as_std_path(), &[("mmc-pack.json", b"payload")]);
    corrupt_first_entry(stored.as_std_path());
    fs::rename(&stored, backup.path()).expect("swap in damaged backup");
    let before = snapshot_tree(&fx.instance);

    let err = fx.manager.restore(&backup, &fx.instance).expect_err("corrupt");

    assert!(matches!(err, BackupError::BackupCorrupted { .. }));
    assert!(err.to_string().contains("backup corrupted, cannot restore"));
    assert_eq!(snapshot_tree(&fx.instance), before);
}

#[cfg(unix)]
#[test]
fn linked_file_is_restored_with_its_contents() {
    let fx = fixture();
    let shared = fx.instance.parent().expect("instance parent").join("shared");
    write_file(&shared, "options.txt", b"fov:90");
    std::os::unix::fs::symlink(shared.join("options.txt"), fx.instance.join(".minecraft/options.txt"))
        .expect("link options");
    let backup = fx.manager.create(&fx.instance).expect("create");
    write_file(&fx.instance, "mmc-pack.json", b"half-installed");

    fx.manager.restore(&backup, &fx.instance).expect("restore");

    let restored = fx.instance.join(".minecraft/options.txt");
    assert_eq!(fs::read(&restored).expect("read options"), b"fov:90");
    assert_eq!(
        fs::read(fx.instance.join("mmc-pack.json")).expect("read pack"),
        b"{\"components\": [\"old\"]}"
    );
}

#[cfg(unix)]
#[test]
fn linked_directory_is_archived_and_cycles_are_skipped() {
    let fx = fixture();
    let shared = fx.instance.parent().expect("instance parent").join("shared-config");
    write_file(&shared, "journeymap.cfg", b"radar=on");
    std::os::unix::fs::symlink(&shared, fx.instance.join(".minecraft/shared")).expect("link dir");
    std::os::unix::fs::symlink(&fx.instance, fx.instance.join("loop")).expect("link loop");
    let backup = fx.manager.create(&fx.instance).expect("create");

    fx.manager.restore(&backup, &fx.instance).expect("restore");

    let restored = fx.instance.join(".minecraft/shared/journeymap.cfg");
    assert_eq!(fs::read(&restored).expect("read config"), b"radar=on");
    assert!(!fx.instance.join("loop").exists());
}
