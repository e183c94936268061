//! Build-keyed cache of downloaded client archives.
//!
//! Entries live at `<download_dir>/daily<id>-client.zip`. An entry is only
//! trusted after a full integrity scan; a corrupt entry is deleted on sight.
//! New entries are written to a partial file in the same directory and
//! renamed into place once complete, so an interrupted download never
//! becomes a cache entry.

use camino::{Utf8Path, Utf8PathBuf};
use log::{info, warn};
use std::fs;
use std::io;
use tempfile::TempPath;

use crate::artefact::verification::{IntegrityError, verify_archive};
use crate::build_id::BuildId;

/// Outcome of consulting the cache for one build.
#[derive(Debug)]
pub enum CacheLookup {
    /// A verified archive is available.
    Hit(Utf8PathBuf),
    /// No archive is cached for this build.
    Miss,
    /// A cached archive failed verification and was deleted.
    Evicted {
        /// Why the entry was rejected.
        reason: String,
    },
}

/// Errors raised while committing a new cache entry.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// Creating, renaming, or deleting a cache file failed.
    #[error("archive cache I/O error: {0}")]
    Io(#[from] io::Error),

    /// The freshly downloaded archive failed verification.
    #[error("downloaded archive is corrupt: {0}")]
    Corrupt(#[from] IntegrityError),
}

/// The archive cache rooted at a download directory.
#[derive(Debug, Clone)]
pub struct ArchiveCache {
    dir: Utf8PathBuf,
}

impl ArchiveCache {
    /// Create a cache rooted at `dir`.
    #[must_use]
    pub fn new(dir: Utf8PathBuf) -> Self {
        Self { dir }
    }

    /// Return the cache directory.
    #[must_use]
    pub fn dir(&self) -> &Utf8Path {
        &self.dir
    }

    /// Return the canonical cache path for `build`.
    ///
    /// # Examples
    ///
    /// ```
    /// use camino::Utf8PathBuf;
    /// use gtnh_updater::artefact::cache::ArchiveCache;
    /// use gtnh_updater::build_id::BuildId;
    ///
    /// let cache = ArchiveCache::new(Utf8PathBuf::from("storage/download"));
    /// let build = BuildId::new(482).expect("positive build number");
    /// assert!(cache.entry_path(build).ends_with("daily482-client.zip"));
    /// ```
    #[must_use]
    pub fn entry_path(&self, build: BuildId) -> Utf8PathBuf {
        self.dir.join(format!("daily{}-client.zip", build.get()))
    }

    /// Return true when a file exists at the entry path, without verifying it.
    #[must_use]
    pub fn contains(&self, build: BuildId) -> bool {
        self.entry_path(build).is_file()
    }

    /// Consult the cache for `build`, evicting the entry if it is corrupt.
    ///
    /// # Errors
    ///
    /// Returns an error only if a corrupt entry cannot be deleted.
    pub fn lookup(&self, build: BuildId) -> io::Result<CacheLookup> {
        let path = self.entry_path(build);
        if !path.is_file() {
            return Ok(CacheLookup::Miss);
        }

        info!("testing cached client zip file {path}");
        match verify_archive(path.as_std_path()) {
            Ok(_) => {
                info!("cached client zip file is intact");
                Ok(CacheLookup::Hit(path))
            }
            Err(e) => {
                warn!("cached client zip file is corrupt, deleting it: {e}");
                fs::remove_file(&path)?;
                Ok(CacheLookup::Evicted {
                    reason: e.to_string(),
                })
            }
        }
    }

    /// Reserve a partial file in the cache directory for a new download.
    ///
    /// The file is deleted when the returned path is dropped unless it is
    /// passed to [`Self::commit`].
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created or written.
    pub fn reserve(&self) -> io::Result<TempPath> {
        fs::create_dir_all(&self.dir)?;
        let file = tempfile::Builder::new()
            .prefix(".partial-")
            .suffix(".zip")
            .tempfile_in(&self.dir)?;
        Ok(file.into_temp_path())
    }

    /// Verify a completed download and move it to the entry path for `build`.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::Corrupt`] if the file fails verification (the
    /// partial file is deleted), or [`CacheError::Io`] if it cannot be
    /// moved into place.
    pub fn commit(&self, build: BuildId, partial: TempPath) -> Result<Utf8PathBuf, CacheError> {
        verify_archive(&partial)?;
        let path = self.entry_path(build);
        partial.persist(&path).map_err(|e| CacheError::Io(e.error))?;
        Ok(path)
    }
}
