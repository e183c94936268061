//! Rollback-safe replacement of installation subtrees.
//!
//! An install moves five paths from the extracted client into the live
//! installation. The steps are encoded as types: a [`StagedClient`] can only
//! be installed after [`StagedClient::back_up`] has produced a
//! [`BackedUpInstall`], so the orchestrator always holds a fresh backup when
//! it starts mutating the root. If any swap fails the whole root is
//! restored from that backup.

use camino::{Utf8Path, Utf8PathBuf};
use log::{error, info};
use std::fs;
use std::io;

use crate::backup::{Backup, BackupError, BackupManager};
use crate::build_id::BuildId;
use crate::instance::{InstanceRoot, SWAP_TARGETS};

/// Moves one path from the staged client into the installation.
pub trait PathSwapper {
    /// Replace `dest` with `source`.
    ///
    /// # Errors
    ///
    /// Returns an error if `dest` cannot be removed or `source` cannot be
    /// moved.
    fn swap(&self, source: &Utf8Path, dest: &Utf8Path) -> io::Result<()>;
}

/// Filesystem swapper: delete then rename, copying across filesystems.
#[derive(Debug, Default, Clone, Copy)]
pub struct FsSwapper;

impl PathSwapper for FsSwapper {
    fn swap(&self, source: &Utf8Path, dest: &Utf8Path) -> io::Result<()> {
        remove_path(dest)?;
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)?;
        }
        if fs::rename(source, dest).is_ok() {
            return Ok(());
        }
        copy_path(source, dest)?;
        remove_path(source)
    }
}

fn remove_path(path: &Utf8Path) -> io::Result<()> {
    match fs::symlink_metadata(path) {
        Ok(meta) if meta.is_dir() => fs::remove_dir_all(path),
        Ok(_) => fs::remove_file(path),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}

fn copy_path(source: &Utf8Path, dest: &Utf8Path) -> io::Result<()> {
    if !source.is_dir() {
        fs::copy(source, dest)?;
        return Ok(());
    }
    fs::create_dir_all(dest)?;
    for entry in source.read_dir_utf8()? {
        let entry = entry?;
        copy_path(entry.path(), &dest.join(entry.file_name()))?;
    }
    Ok(())
}

/// Errors raised by an install.
#[derive(Debug, thiserror::Error)]
pub enum InstallError {
    /// The extracted client lacks one of the replaced paths.
    #[error("extracted client is missing {path}")]
    SourceMissing {
        /// The missing path inside the extracted client.
        path: Utf8PathBuf,
    },

    /// Replacing one path failed.
    #[error("failed to replace {target}: {source}")]
    Swap {
        /// The path being replaced, relative to the root.
        target: &'static str,
        /// The underlying error.
        source: io::Error,
    },

    /// The install failed and the root was restored from the backup.
    #[error("install failed and the previous installation was restored: {source}")]
    RolledBack {
        /// The failure that triggered the rollback.
        source: Box<InstallError>,
    },

    /// The install failed and restoring the backup failed too.
    #[error("install failed ({install}) and restoring the backup failed: {restore}")]
    RestoreFailed {
        /// The failure that triggered the rollback.
        install: Box<InstallError>,
        /// Why the restore failed.
        restore: BackupError,
    },
}

/// An extracted client with mods injected, ready to be backed up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedClient {
    build: BuildId,
    root: Utf8PathBuf,
}

impl StagedClient {
    /// Wrap the extracted client tree for `build`.
    #[must_use]
    pub const fn new(build: BuildId, root: Utf8PathBuf) -> Self {
        Self { build, root }
    }

    /// The extracted client tree.
    #[must_use]
    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    /// Snapshot the live installation before anything is replaced.
    ///
    /// # Errors
    ///
    /// Returns a [`BackupError`] if the snapshot cannot be taken; nothing
    /// has been changed at that point.
    pub fn back_up(
        self,
        backups: &BackupManager,
        instance: &InstanceRoot,
    ) -> Result<BackedUpInstall, BackupError> {
        let backup = backups.create(instance.path())?;
        Ok(BackedUpInstall {
            client: self,
            backup,
        })
    }
}

/// A staged client whose target installation has a fresh backup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackedUpInstall {
    client: StagedClient,
    backup: Backup,
}

impl BackedUpInstall {
    /// The backup taken for this install.
    #[must_use]
    pub const fn backup(&self) -> &Backup {
        &self.backup
    }
}

/// Outcome of a successful install.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallReport {
    /// The build now installed.
    pub build: BuildId,
    /// The backup taken before the install.
    pub backup: Backup,
}

/// Performs the swap and rolls back on failure.
pub struct InstallOrchestrator<'a> {
    backups: &'a BackupManager,
    swapper: &'a dyn PathSwapper,
}

impl<'a> InstallOrchestrator<'a> {
    /// Create an orchestrator restoring from `backups` on failure.
    #[must_use]
    pub const fn new(backups: &'a BackupManager, swapper: &'a dyn PathSwapper) -> Self {
        Self { backups, swapper }
    }

    /// Replace the installation's client paths with the staged ones.
    ///
    /// # Errors
    ///
    /// Returns [`InstallError::SourceMissing`] before touching the root if
    /// the staged client is incomplete. A failed swap yields
    /// [`InstallError::RolledBack`] once the root has been restored, or
    /// [`InstallError::RestoreFailed`] if the restore failed as well.
    pub fn install(
        &self,
        staged: BackedUpInstall,
        instance: &InstanceRoot,
    ) -> Result<InstallReport, InstallError> {
        let BackedUpInstall { client, backup } = staged;

        for target in SWAP_TARGETS {
            let source = client.root.join(target);
            if fs::symlink_metadata(&source).is_err() {
                return Err(InstallError::SourceMissing { path: source });
            }
        }

        info!("installing {}...", client.build);
        if let Err(install) = self.swap_all(&client, instance) {
            error!("install failed, restoring backup...");
            return Err(match self.backups.restore(&backup, instance.path()) {
                Ok(()) => InstallError::RolledBack {
                    source: Box::new(install),
                },
                Err(restore) => InstallError::RestoreFailed {
                    install: Box::new(install),
                    restore,
                },
            });
        }

        Ok(InstallReport {
            build: client.build,
            backup,
        })
    }

    fn swap_all(&self, client: &StagedClient, instance: &InstanceRoot) -> Result<(), InstallError> {
        for target in SWAP_TARGETS {
            let source = client.root.join(target);
            let dest = instance.path().join(target);
            self.swapper
                .swap(&source, &dest)
                .map_err(|source| InstallError::Swap { target, source })?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "install_tests.rs"]
mod tests;
