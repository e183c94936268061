//! Zip extraction for client archives and backups.
//!
//! Every entry name is checked before anything is written so an archive
//! cannot place files outside the destination directory.

use camino::{Utf8Path, Utf8PathBuf};
use log::{debug, info};
use std::fs::{self, File};
use std::io;
use std::path::Path;

use crate::storage::StorageLayout;

/// Directory name of the client tree inside a daily archive.
pub const CLIENT_TREE_NAME: &str = "GT New Horizons daily";

/// Directory a nested client archive is unpacked into, under the temp dir.
pub const NESTED_DIR_NAME: &str = "client";

/// Trait for extracting zip archives, enabling test mocking.
///
/// # Examples
///
/// ```
/// use gtnh_updater::artefact::extraction::ZipExtractor;
///
/// let extractor = ZipExtractor;
/// // Use extractor.extract(archive_path, dest_dir) in production
/// ```
#[cfg_attr(test, mockall::automock)]
pub trait ArchiveExtractor {
    /// Extract the archive at `archive_path` into `dest_dir`.
    ///
    /// Returns the entry names that were extracted, in archive order.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractionError::PathTraversal`] if any entry
    /// attempts to escape the destination directory.
    /// Returns [`ExtractionError::Format`] if the file is not a readable zip.
    /// Returns [`ExtractionError::Io`] on I/O failures.
    fn extract(&self, archive_path: &Path, dest_dir: &Path)
    -> Result<Vec<String>, ExtractionError>;
}

/// Errors arising from archive extraction.
#[derive(Debug, thiserror::Error)]
pub enum ExtractionError {
    /// I/O error during extraction.
    #[error("extraction I/O error: {0}")]
    Io(#[from] io::Error),

    /// The archive could not be read as a zip file.
    #[error("cannot read zip archive: {0}")]
    Format(#[from] zip::result::ZipError),

    /// A path in the archive attempts to traverse outside the destination.
    #[error("path traversal detected: {path}")]
    PathTraversal {
        /// The offending path from the archive entry.
        path: String,
    },

    /// The expected client directory is absent after extraction.
    #[error("archive does not contain a client tree at {expected}")]
    MissingClientTree {
        /// Where the client tree was expected.
        expected: Utf8PathBuf,
    },

    /// A path under the temp directory is not valid UTF-8.
    #[error("non UTF-8 path in extracted archive: {path}")]
    NonUtf8Path {
        /// Lossy rendering of the offending path.
        path: String,
    },
}

/// Default extractor using the `zip` crate.
pub struct ZipExtractor;

impl ArchiveExtractor for ZipExtractor {
    fn extract(
        &self,
        archive_path: &Path,
        dest_dir: &Path,
    ) -> Result<Vec<String>, ExtractionError> {
        let file = File::open(archive_path)?;
        let mut archive = zip::ZipArchive::new(file)?;
        let mut extracted = Vec::with_capacity(archive.len());

        for index in 0..archive.len() {
            let mut entry = archive.by_index(index)?;
            let relative = entry
                .enclosed_name()
                .ok_or_else(|| ExtractionError::PathTraversal {
                    path: entry.name().to_owned(),
                })?;
            let dest_path = dest_dir.join(&relative);

            if entry.is_dir() {
                fs::create_dir_all(&dest_path)?;
            } else {
                if let Some(parent) = dest_path.parent() {
                    fs::create_dir_all(parent)?;
                }
                let mut out = File::create(&dest_path)?;
                io::copy(&mut entry, &mut out)?;
            }

            extracted.push(entry.name().to_owned());
        }

        debug!(
            "extracted {} entries from {}",
            extracted.len(),
            archive_path.display()
        );
        Ok(extracted)
    }
}

/// Unpack a daily client archive into a freshly cleared temp directory.
///
/// If the outer archive holds `.zip` files at its top level, the first of
/// them (by file name) is unpacked into `<temp>/client` and the client tree
/// is looked for there. Otherwise the tree is expected directly under the
/// temp directory.
///
/// Returns the path of the extracted `GT New Horizons daily` directory.
///
/// # Errors
///
/// Returns [`ExtractionError::MissingClientTree`] when the archive does not
/// contain the client directory, or any extraction error.
pub fn extract_client(
    extractor: &dyn ArchiveExtractor,
    archive: &Utf8Path,
    layout: &StorageLayout,
) -> Result<Utf8PathBuf, ExtractionError> {
    let temp = layout.reset_temp_dir()?.to_owned();

    info!("extracting client zip file...");
    extractor.extract(archive.as_std_path(), temp.as_std_path())?;

    let root = match first_nested_archive(&temp)? {
        Some(nested) => {
            info!("extracting nested client archive {}", file_name(&nested));
            let nested_dir = temp.join(NESTED_DIR_NAME);
            fs::create_dir_all(&nested_dir)?;
            extractor.extract(nested.as_std_path(), nested_dir.as_std_path())?;
            nested_dir.join(CLIENT_TREE_NAME)
        }
        None => temp.join(CLIENT_TREE_NAME),
    };

    if !root.is_dir() {
        return Err(ExtractionError::MissingClientTree { expected: root });
    }
    Ok(root)
}

fn first_nested_archive(dir: &Utf8Path) -> Result<Option<Utf8PathBuf>, ExtractionError> {
    let mut nested = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = Utf8PathBuf::from_path_buf(entry.path()).map_err(|p| {
            ExtractionError::NonUtf8Path {
                path: p.display().to_string(),
            }
        })?;
        if path.extension() == Some("zip") && entry.file_type()?.is_file() {
            nested.push(path);
        }
    }
    nested.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(nested.into_iter().next())
}

fn file_name(path: &Utf8Path) -> &str {
    path.file_name().unwrap_or(path.as_str())
}
