//! Injection of additional mods into the staged client.
//!
//! Operators can list extra mod jars in `ADDITIONAL_MODS`. Each jar is
//! copied into the extracted client's mods folder before the backup is
//! taken, so a missing jar aborts the run while the instance is untouched.

use camino::{Utf8Path, Utf8PathBuf};
use log::info;
use std::fs;
use std::io;

use crate::instance::InstanceRoot;

/// A parsed `ADDITIONAL_MODS` entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModReference<'a> {
    /// A download URL.
    Url(&'a str),
    /// A jar file, by path or base name.
    Jar(&'a Utf8Path),
    /// Anything else.
    Unknown(&'a str),
}

impl<'a> ModReference<'a> {
    /// Classify a configured mod entry.
    ///
    /// # Examples
    ///
    /// ```
    /// use gtnh_updater::mods::ModReference;
    ///
    /// assert!(matches!(ModReference::parse("https://example.net/a.jar"), ModReference::Url(_)));
    /// assert!(matches!(ModReference::parse("mods/extra.jar"), ModReference::Jar(_)));
    /// assert!(matches!(ModReference::parse("extra.zip"), ModReference::Unknown(_)));
    /// ```
    #[must_use]
    pub fn parse(entry: &'a str) -> Self {
        if entry.starts_with("http://") || entry.starts_with("https://") {
            Self::Url(entry)
        } else if entry.ends_with(".jar") {
            Self::Jar(Utf8Path::new(entry))
        } else {
            Self::Unknown(entry)
        }
    }
}

/// Where an injected jar was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModOrigin {
    /// Relative to the updater's working directory.
    UpdaterDir,
    /// In the live instance's mods folder.
    InstanceDir,
}

/// A jar copied into the staged client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InjectedMod {
    /// Base name of the copied jar.
    pub file_name: String,
    /// Where it was copied from.
    pub origin: ModOrigin,
}

/// Errors raised while injecting mods.
#[derive(Debug, thiserror::Error)]
pub enum ModError {
    /// Mods given by URL cannot be fetched yet.
    #[error("mod downloads are not yet implemented: {url}")]
    NotImplemented {
        /// The configured URL.
        url: String,
    },

    /// A jar was found neither next to the updater nor in the instance.
    #[error("additional mod {reference} not found in the updater directory or {searched}")]
    ModNotFound {
        /// The configured entry.
        reference: String,
        /// The instance mods folder that was searched.
        searched: Utf8PathBuf,
    },

    /// The entry is neither a URL nor a jar.
    #[error("unknown additional mod type: {reference}")]
    UnknownReference {
        /// The configured entry.
        reference: String,
    },

    /// Copying a jar failed.
    #[error("failed to copy additional mod {file_name}: {source}")]
    Io {
        /// The jar being copied.
        file_name: String,
        /// The underlying error.
        source: io::Error,
    },
}

/// Copies configured mods into an extracted client tree.
#[derive(Debug, Clone)]
pub struct ModInjector {
    working_dir: Utf8PathBuf,
}

impl ModInjector {
    /// Create an injector resolving relative jar paths against `working_dir`.
    #[must_use]
    pub const fn new(working_dir: Utf8PathBuf) -> Self {
        Self { working_dir }
    }

    /// Copy every referenced jar into `<client_root>/.minecraft/mods`.
    ///
    /// References are handled in order; the first failure stops the run.
    ///
    /// # Errors
    ///
    /// Returns a [`ModError`] for the first reference that cannot be
    /// injected.
    pub fn inject(
        &self,
        references: &[String],
        instance: &InstanceRoot,
        client_root: &Utf8Path,
    ) -> Result<Vec<InjectedMod>, ModError> {
        let mods_dir = client_root.join(".minecraft").join("mods");
        let mut injected = Vec::with_capacity(references.len());

        for entry in references {
            let (source, file_name, origin) = match ModReference::parse(entry) {
                ModReference::Url(url) => {
                    return Err(ModError::NotImplemented {
                        url: url.to_owned(),
                    });
                }
                ModReference::Unknown(reference) => {
                    return Err(ModError::UnknownReference {
                        reference: reference.to_owned(),
                    });
                }
                ModReference::Jar(path) => self.locate(entry, path, instance)?,
            };

            copy_into(&source, &mods_dir, &file_name)?;
            match origin {
                ModOrigin::UpdaterDir => {
                    info!("added additional mod {file_name} from updater directory");
                }
                ModOrigin::InstanceDir => {
                    info!("added additional mod {file_name} from instance directory");
                }
            }
            injected.push(InjectedMod { file_name, origin });
        }

        Ok(injected)
    }

    fn locate(
        &self,
        entry: &str,
        path: &Utf8Path,
        instance: &InstanceRoot,
    ) -> Result<(Utf8PathBuf, String, ModOrigin), ModError> {
        let file_name = path.file_name().unwrap_or(entry).to_owned();

        let local = self.working_dir.join(path);
        if local.is_file() {
            return Ok((local, file_name, ModOrigin::UpdaterDir));
        }

        let searched = instance.mods_dir();
        let in_instance = searched.join(&file_name);
        if in_instance.is_file() {
            return Ok((in_instance, file_name, ModOrigin::InstanceDir));
        }

        Err(ModError::ModNotFound {
            reference: entry.to_owned(),
            searched,
        })
    }
}

fn copy_into(source: &Utf8Path, mods_dir: &Utf8Path, file_name: &str) -> Result<(), ModError> {
    let io_error = |source| ModError::Io {
        file_name: file_name.to_owned(),
        source,
    };
    fs::create_dir_all(mods_dir).map_err(io_error)?;
    fs::copy(source, mods_dir.join(file_name)).map_err(io_error)?;
    Ok(())
}
