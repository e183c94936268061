//! Rotating snapshots of the installation root and restore.
//!
//! Backups are full zip snapshots named `backup-<id>.zip`, with ids
//! increasing by one per snapshot. The backup directory belongs to the
//! updater: any other file in it means the store is corrupt, and the run
//! stops before anything is changed.

use camino::{Utf8Path, Utf8PathBuf};
use log::{debug, info, warn};
use regex::Regex;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::sync::OnceLock;
use zip::write::SimpleFileOptions;

use crate::artefact::extraction::{ArchiveExtractor, ExtractionError, ZipExtractor};
use crate::artefact::verification::{IntegrityError, verify_archive};

/// How many backups are kept once a new one has been written.
pub const BACKUP_RETENTION: usize = 5;

/// A snapshot in the backup directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Backup {
    id: u32,
    path: Utf8PathBuf,
}

impl Backup {
    /// The snapshot number.
    #[must_use]
    pub const fn id(&self) -> u32 {
        self.id
    }

    /// The snapshot file.
    #[must_use]
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }
}

/// Errors raised by backup operations.
#[derive(Debug, thiserror::Error)]
pub enum BackupError {
    /// A file that is not a backup was found in the backup directory.
    #[error("backup store is corrupt: unexpected file {path}")]
    UnexpectedFile {
        /// The offending entry.
        path: String,
    },

    /// The backup to restore does not exist.
    #[error("backup {path} does not exist, cannot restore")]
    BackupMissing {
        /// The expected backup file.
        path: Utf8PathBuf,
    },

    /// The backup to restore failed the integrity scan.
    #[error("backup corrupted, cannot restore: {path}: {source}")]
    BackupCorrupted {
        /// The backup file.
        path: Utf8PathBuf,
        /// What the scan found.
        source: IntegrityError,
    },

    /// Reading the installation or writing the snapshot failed.
    #[error("backup I/O error: {0}")]
    Io(#[from] io::Error),

    /// The snapshot archive could not be written.
    #[error("cannot write backup archive: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// Unpacking the snapshot failed.
    #[error("cannot unpack backup: {0}")]
    Extraction(#[from] ExtractionError),
}

fn backup_name() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"^backup-(\d+)\.zip$").ok())
        .as_ref()
}

/// Parse a backup file name into its id.
///
/// # Examples
///
/// ```
/// use gtnh_updater::backup::parse_backup_name;
///
/// assert_eq!(parse_backup_name("backup-12.zip"), Some(12));
/// assert_eq!(parse_backup_name("backup-12.zip.bak"), None);
/// ```
#[must_use]
pub fn parse_backup_name(name: &str) -> Option<u32> {
    backup_name()?
        .captures(name)?
        .get(1)?
        .as_str()
        .parse()
        .ok()
}

/// Manages the backup directory.
#[derive(Debug, Clone)]
pub struct BackupManager {
    dir: Utf8PathBuf,
    retain: usize,
}

impl BackupManager {
    /// Create a manager keeping [`BACKUP_RETENTION`] backups in `dir`.
    #[must_use]
    pub const fn new(dir: Utf8PathBuf) -> Self {
        Self::with_retention(dir, BACKUP_RETENTION)
    }

    /// Create a manager keeping `retain` backups in `dir`.
    #[must_use]
    pub const fn with_retention(dir: Utf8PathBuf, retain: usize) -> Self {
        Self { dir, retain }
    }

    /// The backup directory.
    #[must_use]
    pub fn dir(&self) -> &Utf8Path {
        &self.dir
    }

    /// Path a backup with `id` is stored at.
    #[must_use]
    pub fn backup_path(&self, id: u32) -> Utf8PathBuf {
        self.dir.join(format!("backup-{id}.zip"))
    }

    /// List existing backups, oldest first.
    ///
    /// A missing directory holds no backups.
    ///
    /// # Errors
    ///
    /// Returns [`BackupError::UnexpectedFile`] if the directory holds
    /// anything but backups, or an I/O error.
    pub fn list(&self) -> Result<Vec<Backup>, BackupError> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut backups = Vec::new();
        for entry in entries {
            let name = entry?.file_name().to_string_lossy().into_owned();
            let id = parse_backup_name(&name).ok_or_else(|| BackupError::UnexpectedFile {
                path: self.dir.join(&name).into_string(),
            })?;
            backups.push(Backup {
                id,
                path: self.dir.join(name),
            });
        }
        backups.sort_by_key(Backup::id);
        Ok(backups)
    }

    /// Snapshot `root` into a new backup, pruning old ones first.
    ///
    /// # Errors
    ///
    /// Returns an error if the store is corrupt or the snapshot cannot be
    /// written. Nothing under `root` is modified.
    pub fn create(&self, root: &Utf8Path) -> Result<Backup, BackupError> {
        let mut backups = self.list()?;
        self.prune(&mut backups)?;

        let id = backups.last().map_or(1, |b| b.id.saturating_add(1));
        let path = self.backup_path(id);

        info!("creating backup {path}...");
        fs::create_dir_all(&self.dir)?;
        // Staged beside the backup directory so a leftover partial file
        // never shows up in the strict listing.
        let staging = self.dir.parent().unwrap_or(&self.dir);
        let partial = tempfile::Builder::new()
            .prefix(".partial-backup-")
            .suffix(".zip")
            .tempfile_in(staging)?;
        write_snapshot(root, partial.as_file())?;
        partial.persist(&path).map_err(|e| BackupError::Io(e.error))?;

        Ok(Backup { id, path })
    }

    /// Delete the oldest backups until there is room for one more.
    fn prune(&self, backups: &mut Vec<Backup>) -> Result<(), BackupError> {
        while !backups.is_empty() && backups.len() >= self.retain.max(1) {
            let oldest = backups.remove(0);
            info!("removing old backup {}", oldest.path);
            fs::remove_file(&oldest.path)?;
        }
        Ok(())
    }

    /// Replace `root` with the contents of `backup`.
    ///
    /// The backup is fully verified before `root` is touched.
    ///
    /// # Errors
    ///
    /// Returns [`BackupError::BackupMissing`] or
    /// [`BackupError::BackupCorrupted`] without modifying `root`, or an
    /// error from removing or unpacking.
    pub fn restore(&self, backup: &Backup, root: &Utf8Path) -> Result<(), BackupError> {
        if !backup.path.is_file() {
            return Err(BackupError::BackupMissing {
                path: backup.path.clone(),
            });
        }
        verify_archive(backup.path.as_std_path()).map_err(|source| {
            BackupError::BackupCorrupted {
                path: backup.path.clone(),
                source,
            }
        })?;

        info!("restoring {root} from {}", backup.path);
        match fs::remove_dir_all(root) {
            Err(e) if e.kind() != io::ErrorKind::NotFound => return Err(e.into()),
            _ => {}
        }
        fs::create_dir_all(root)?;
        ZipExtractor.extract(backup.path.as_std_path(), root.as_std_path())?;
        Ok(())
    }
}

fn write_snapshot(root: &Utf8Path, file: &File) -> Result<(), BackupError> {
    let mut snapshot = Snapshot {
        writer: zip::ZipWriter::new(BufWriter::new(file)),
        root,
        options: SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated),
        ancestors: vec![root.canonicalize_utf8()?],
        count: 0,
    };
    snapshot.add_dir(root)?;
    let count = snapshot.count;
    snapshot.writer.finish()?.flush()?;
    debug!("backup holds {count} entries");
    Ok(())
}

/// Walks the installation root into a zip archive.
///
/// Symbolic links are followed: a linked file is stored with its contents
/// and a linked directory is stored as a directory, so a restore brings
/// back the same data as real files. Links that point at one of their own
/// ancestors are skipped.
struct Snapshot<'a, W: Write + io::Seek> {
    writer: zip::ZipWriter<W>,
    root: &'a Utf8Path,
    options: SimpleFileOptions,
    ancestors: Vec<Utf8PathBuf>,
    count: usize,
}

impl<W: Write + io::Seek> Snapshot<'_, W> {
    fn add_dir(&mut self, dir: &Utf8Path) -> Result<(), BackupError> {
        let mut entries = dir
            .read_dir_utf8()?
            .collect::<Result<Vec<_>, io::Error>>()?;
        entries.sort_by(|a, b| a.file_name().cmp(b.file_name()));

        for entry in entries {
            let path = entry.path();
            let is_link = entry.file_type()?.is_symlink();
            let metadata = match fs::metadata(path) {
                Ok(metadata) => metadata,
                Err(e) if is_link => {
                    warn!("skipping {path}: broken link ({e})");
                    continue;
                }
                Err(e) => return Err(e.into()),
            };

            let name = archive_name(self.root, path);
            if metadata.is_dir() {
                let real = path.canonicalize_utf8()?;
                if self.ancestors.contains(&real) {
                    warn!("skipping {path}: links back to {real}");
                    continue;
                }
                self.writer.add_directory(format!("{name}/"), self.options)?;
                self.ancestors.push(real);
                let walked = self.add_dir(path);
                self.ancestors.pop();
                walked?;
            } else if metadata.is_file() {
                let options = self.options.large_file(metadata.len() >= u64::from(u32::MAX));
                self.writer.start_file(name, options)?;
                io::copy(&mut File::open(path)?, &mut self.writer)?;
            } else {
                warn!("skipping {path}: not a regular file or directory");
                continue;
            }
            self.count += 1;
        }
        Ok(())
    }
}

fn archive_name(root: &Utf8Path, path: &Utf8Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .components()
        .map(|c| c.as_str())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
#[path = "backup_tests.rs"]
mod tests;
