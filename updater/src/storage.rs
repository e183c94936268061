//! Storage and temporary directory layout.
//!
//! The updater keeps downloaded archives and backups beneath a storage root
//! and stages extracted clients in a scratch directory. Both roots are passed
//! in explicitly so every component can be exercised against a temporary
//! directory.

use camino::{Utf8Path, Utf8PathBuf};
use std::fs;
use std::io;

const BACKUP_DIRNAME: &str = "backup";
const DOWNLOAD_DIRNAME: &str = "download";

/// Directory layout used by an update run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageLayout {
    storage_root: Utf8PathBuf,
    temp_dir: Utf8PathBuf,
}

impl StorageLayout {
    /// Create a layout from a storage root and a scratch directory.
    #[must_use]
    pub fn new(storage_root: Utf8PathBuf, temp_dir: Utf8PathBuf) -> Self {
        Self {
            storage_root,
            temp_dir,
        }
    }

    /// Return the storage root.
    #[must_use]
    pub fn storage_root(&self) -> &Utf8Path {
        &self.storage_root
    }

    /// Directory holding `backup-<id>.zip` snapshots.
    #[must_use]
    pub fn backup_dir(&self) -> Utf8PathBuf {
        self.storage_root.join(BACKUP_DIRNAME)
    }

    /// Directory holding cached `daily<id>-client.zip` archives.
    #[must_use]
    pub fn download_dir(&self) -> Utf8PathBuf {
        self.storage_root.join(DOWNLOAD_DIRNAME)
    }

    /// Scratch directory for extracted clients.
    #[must_use]
    pub fn temp_dir(&self) -> &Utf8Path {
        &self.temp_dir
    }

    /// Create the backup and download directories if they are missing.
    ///
    /// # Errors
    ///
    /// Returns an error if either directory cannot be created.
    pub fn ensure(&self) -> io::Result<()> {
        fs::create_dir_all(self.backup_dir())?;
        fs::create_dir_all(self.download_dir())?;
        Ok(())
    }

    /// Remove the scratch directory and everything in it.
    ///
    /// A missing directory is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory exists but cannot be removed.
    pub fn remove_temp_dir(&self) -> io::Result<()> {
        match fs::remove_dir_all(&self.temp_dir) {
            Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
            _ => Ok(()),
        }
    }

    /// Wipe and recreate the scratch directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the old directory cannot be removed or the new
    /// one cannot be created.
    pub fn reset_temp_dir(&self) -> io::Result<&Utf8Path> {
        self.remove_temp_dir()?;
        fs::create_dir_all(&self.temp_dir)?;
        Ok(&self.temp_dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout_in(dir: &tempfile::TempDir) -> StorageLayout {
        let root = Utf8PathBuf::try_from(dir.path().to_path_buf()).expect("UTF-8 path");
        StorageLayout::new(root.join("storage"), root.join("temp"))
    }

    #[test]
    fn ensure_creates_backup_and_download_dirs() {
        let dir = tempfile::tempdir().expect("temp dir");
        let layout = layout_in(&dir);

        layout.ensure().expect("ensure");

        assert!(layout.backup_dir().is_dir());
        assert!(layout.download_dir().is_dir());
        assert!(layout.backup_dir().ends_with("storage/backup"));
    }

    #[test]
    fn reset_temp_dir_discards_previous_contents() {
        let dir = tempfile::tempdir().expect("temp dir");
        let layout = layout_in(&dir);
        fs::create_dir_all(layout.temp_dir().join("leftover")).expect("create leftover");

        let temp = layout.reset_temp_dir().expect("reset");

        assert!(temp.is_dir());
        assert_eq!(fs::read_dir(temp).expect("read dir").count(), 0);
    }

    #[test]
    fn remove_temp_dir_tolerates_missing_directory() {
        let dir = tempfile::tempdir().expect("temp dir");
        let layout = layout_in(&dir);
        layout.remove_temp_dir().expect("missing dir is fine");
    }
}
