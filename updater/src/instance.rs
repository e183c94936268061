//! Installation root layout and validation.
//!
//! An installation root is a MultiMC/Prism instance directory. An install
//! replaces five paths inside it and leaves everything else (saves,
//! screenshots, instance settings) alone.

use camino::{Utf8Path, Utf8PathBuf};
use log::error;
use std::io;
use std::path::Path;

/// Name of the game directory inside an instance.
pub const MINECRAFT_DIR: &str = ".minecraft";

/// Paths replaced by an install, relative to the root, in swap order.
pub const SWAP_TARGETS: [&str; 5] = [
    "libraries",
    "patches",
    "mmc-pack.json",
    ".minecraft/config",
    ".minecraft/mods",
];

/// Errors raised while validating an installation root.
#[derive(Debug, thiserror::Error)]
pub enum InstanceError {
    /// The configured path has no `.minecraft` directory.
    #[error("{path} is not a valid instance: no .minecraft directory found")]
    MissingMinecraftDir {
        /// The normalised instance path.
        path: Utf8PathBuf,
    },

    /// The instance has never been started, so its game folders are missing.
    #[error("{path} is missing .minecraft/{missing}; launch your instance at least once")]
    NotLaunched {
        /// The normalised instance path.
        path: Utf8PathBuf,
        /// The missing folder name.
        missing: &'static str,
    },

    /// The configured path could not be made absolute.
    #[error("cannot resolve instance path {path}: {source}")]
    Resolve {
        /// The configured path.
        path: String,
        /// The underlying error.
        source: io::Error,
    },

    /// The absolute path is not valid UTF-8.
    #[error("instance path is not valid UTF-8: {path}")]
    NonUtf8 {
        /// Lossy rendering of the path.
        path: String,
    },
}

/// A validated installation root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceRoot {
    path: Utf8PathBuf,
}

impl InstanceRoot {
    /// Wrap a path without validating it.
    ///
    /// Use [`ensure_instance_path`] for operator-supplied paths.
    #[must_use]
    pub const fn new(path: Utf8PathBuf) -> Self {
        Self { path }
    }

    /// The root directory.
    #[must_use]
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    /// The `.minecraft` game directory.
    #[must_use]
    pub fn minecraft_dir(&self) -> Utf8PathBuf {
        self.path.join(MINECRAFT_DIR)
    }

    /// The live mods directory.
    #[must_use]
    pub fn mods_dir(&self) -> Utf8PathBuf {
        self.minecraft_dir().join("mods")
    }
}

/// Normalise and validate an operator-supplied instance path.
///
/// Relative paths are resolved against the current directory. A path that
/// points at the `.minecraft` folder itself is moved up to the instance
/// directory. The instance must already have been launched once, so its
/// `.minecraft/mods` and `.minecraft/config` folders exist.
///
/// # Errors
///
/// Returns [`InstanceError`] describing the first missing piece.
pub fn ensure_instance_path(configured: &str) -> Result<InstanceRoot, InstanceError> {
    let absolute = std::path::absolute(Path::new(configured)).map_err(|source| {
        InstanceError::Resolve {
            path: configured.to_owned(),
            source,
        }
    })?;
    let mut path = Utf8PathBuf::from_path_buf(absolute).map_err(|p| InstanceError::NonUtf8 {
        path: p.display().to_string(),
    })?;

    if !path.exists() {
        error!("instance path {path} doesn't exist");
    }

    if path.file_name() == Some(MINECRAFT_DIR) {
        if let Some(parent) = path.parent() {
            path = parent.to_owned();
        }
    }

    let minecraft = path.join(MINECRAFT_DIR);
    if !minecraft.is_dir() {
        return Err(InstanceError::MissingMinecraftDir { path });
    }
    for missing in ["mods", "config"] {
        if !minecraft.join(missing).is_dir() {
            return Err(InstanceError::NotLaunched { path, missing });
        }
    }

    Ok(InstanceRoot::new(path))
}
