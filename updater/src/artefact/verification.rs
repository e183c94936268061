//! Archive integrity scan.
//!
//! A zip archive is only trusted once every entry has been decompressed and
//! its CRC checked. Reading an entry to the end makes the `zip` crate
//! compare the running CRC against the stored value and fail with
//! `InvalidData` on mismatch.

use std::fs::File;
use std::io;
use std::path::Path;

/// Errors raised while scanning an archive.
#[derive(Debug, thiserror::Error)]
pub enum IntegrityError {
    /// The archive could not be opened.
    #[error("cannot open archive: {0}")]
    Io(#[from] io::Error),

    /// The central directory is unreadable or the file is not a zip.
    #[error("not a readable zip archive: {0}")]
    Format(#[from] zip::result::ZipError),

    /// An entry failed to decompress or its CRC did not match.
    #[error("entry {entry} is corrupt: {reason}")]
    CorruptEntry {
        /// Name of the first corrupt entry.
        entry: String,
        /// What went wrong while reading it.
        reason: String,
    },
}

/// Scan every entry in the archive at `path`.
///
/// Returns the number of entries checked.
///
/// # Errors
///
/// Returns [`IntegrityError`] when the file cannot be opened, is not a zip
/// archive, or any entry fails to decompress cleanly.
pub fn verify_archive(path: &Path) -> Result<usize, IntegrityError> {
    let file = File::open(path)?;
    let mut archive = zip::ZipArchive::new(file)?;

    for index in 0..archive.len() {
        let mut entry = archive.by_index(index)?;
        let name = entry.name().to_owned();
        io::copy(&mut entry, &mut io::sink()).map_err(|e| IntegrityError::CorruptEntry {
            entry: name,
            reason: e.to_string(),
        })?;
    }

    Ok(archive.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{corrupt_first_entry, write_zip};

    #[test]
    fn accepts_intact_archive() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("ok.zip");
        write_zip(&path, &[("a.txt", b"alpha"), ("dir/b.txt", b"beta")]);

        assert_eq!(verify_archive(&path).expect("valid archive"), 2);
    }

    #[test]
    fn rejects_non_zip_file() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("junk.zip");
        std::fs::write(&path, b"definitely not a zip").expect("write junk");

        assert!(matches!(
            verify_archive(&path),
            Err(IntegrityError::Format(_))
        ));
    }

    #[test]
    fn rejects_archive_with_damaged_entry() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("damaged.zip");
        write_zip(&path, &[("payload.txt", &[b'x'; 4096])]);
        corrupt_first_entry(&path);

        assert!(verify_archive(&path).is_err());
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempfile::tempdir().expect("temp dir");
        assert!(matches!(
            verify_archive(&dir.path().join("absent.zip")),
            Err(IntegrityError::Io(_))
        ));
    }
}
