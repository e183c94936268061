//! Error types for the updater CLI.
//!
//! Each stage of an update has its own error enum. [`UpdaterError`] gathers
//! them for the binary, which prints the message and exits with status 1.
//! Where the operator can fix the problem, [`UpdaterError::hint`] supplies
//! the next step.

use camino::Utf8PathBuf;
use thiserror::Error;

use crate::artefact::extraction::ExtractionError;
use crate::backup::BackupError;
use crate::config::ConfigError;
use crate::fetch::FetchError;
use crate::install::InstallError;
use crate::instance::InstanceError;
use crate::mods::ModError;

/// Errors that end an update run.
#[derive(Debug, Error)]
pub enum UpdaterError {
    /// The configuration could not be loaded, saved, or interpreted.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The configured installation root is unusable.
    #[error(transparent)]
    Instance(#[from] InstanceError),

    /// No source could provide the archive.
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// The archive could not be unpacked.
    #[error("failed to extract client zip: {0}")]
    Extraction(#[from] ExtractionError),

    /// An additional mod could not be staged.
    #[error("failed to add additional mods: {0}")]
    Mod(#[from] ModError),

    /// The installation could not be backed up.
    #[error("failed to back up the instance: {0}")]
    Backup(#[from] BackupError),

    /// Replacing the installation failed.
    #[error(transparent)]
    Install(#[from] InstallError),

    /// A working directory could not be prepared or cleaned.
    #[error("cannot prepare {path}: {source}")]
    Storage {
        /// The directory involved.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The current directory could not be determined.
    #[error("cannot determine the working directory: {reason}")]
    WorkingDir {
        /// Description of the failure.
        reason: String,
    },

    /// The log subscriber could not be installed.
    #[error("failed to initialise logging: {reason}")]
    Logging {
        /// Description of the failure.
        reason: String,
    },
}

impl UpdaterError {
    /// A follow-up the operator can take, when one is known.
    #[must_use]
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::Config(ConfigError::NotFound { .. }) => Some(
                "create config.json next to the updater containing at least INSTANCE_PATH",
            ),
            Self::Config(ConfigError::MissingInstancePath) => {
                Some("set INSTANCE_PATH in config.json to your MultiMC/Prism instance folder")
            }
            Self::Fetch(fetch) if fetch.has_configuration_failure() => {
                Some("set GITHUB_TOKEN in config.json to enable downloads from GitHub")
            }
            Self::Install(InstallError::RestoreFailed { .. }) => {
                Some("older snapshots are kept in the storage backup directory")
            }
            _ => None,
        }
    }
}

/// Result type alias for updater operations.
pub type Result<T> = std::result::Result<T, UpdaterError>;
