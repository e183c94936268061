//! Source fallback chain for obtaining a build archive.
//!
//! The cache is consulted once, before any source. On a miss each source is
//! tried in order; a source failure is logged and the next source is tried.
//! Every download lands in a partial file inside the cache directory and is
//! only moved onto the cache path after it passes the integrity scan, so a
//! corrupt or truncated download counts as that source's failure.

use camino::Utf8PathBuf;
use log::{info, warn};
use std::fmt;
use std::io;

use crate::artefact::cache::{ArchiveCache, CacheError, CacheLookup};
use crate::artefact::source::{ArchiveSource, RuntimeVariant, SourceError};
use crate::build_id::BuildId;

/// Where a fetched archive came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveOrigin {
    /// A verified cache entry; no network access was needed.
    Cache,
    /// Downloaded from the named source.
    Source(&'static str),
}

/// A verified archive ready for extraction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedArchive {
    /// Path of the cache entry.
    pub path: Utf8PathBuf,
    /// Where it came from.
    pub origin: ArchiveOrigin,
}

/// Why one source could not provide the archive.
#[derive(Debug)]
pub struct SourceFailure {
    /// Name of the source.
    pub source_name: &'static str,
    /// Description of the failure.
    pub reason: String,
    /// True when the failure is a missing credential rather than a
    /// transient or remote problem.
    pub configuration: bool,
}

impl fmt::Display for SourceFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.source_name, self.reason)
    }
}

/// Errors raised by [`ArtifactFetcher::fetch`].
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// The cache directory could not be read or cleaned.
    #[error("archive cache I/O error: {0}")]
    Cache(#[from] io::Error),

    /// Every source failed.
    #[error("could not obtain the client zip for {build}: {}", join_failures(.failures))]
    Exhausted {
        /// The requested build.
        build: BuildId,
        /// One entry per source, in the order they were tried.
        failures: Vec<SourceFailure>,
    },
}

impl FetchError {
    /// Return true when at least one source failed for lack of a credential.
    #[must_use]
    pub fn has_configuration_failure(&self) -> bool {
        match self {
            Self::Exhausted { failures, .. } => failures.iter().any(|f| f.configuration),
            Self::Cache(_) => false,
        }
    }
}

fn join_failures(failures: &[SourceFailure]) -> String {
    if failures.is_empty() {
        return "no sources configured".to_owned();
    }
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Obtains verified archives through the cache and an ordered source list.
pub struct ArtifactFetcher<'a> {
    cache: &'a ArchiveCache,
    sources: Vec<&'a dyn ArchiveSource>,
}

impl<'a> ArtifactFetcher<'a> {
    /// Create a fetcher trying `sources` in order after the cache.
    #[must_use]
    pub const fn new(cache: &'a ArchiveCache, sources: Vec<&'a dyn ArchiveSource>) -> Self {
        Self { cache, sources }
    }

    /// Names of the configured sources, in the order they are tried.
    #[must_use]
    pub fn source_names(&self) -> Vec<&'static str> {
        self.sources.iter().map(|s| s.name()).collect()
    }

    /// Return a verified archive for `build`.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Exhausted`] when no source could provide a
    /// valid archive, or [`FetchError::Cache`] when the cache directory is
    /// unusable.
    pub fn fetch(
        &self,
        build: BuildId,
        variant: RuntimeVariant,
    ) -> Result<FetchedArchive, FetchError> {
        match self.cache.lookup(build)? {
            CacheLookup::Hit(path) => {
                info!("using cached client zip for {build}");
                return Ok(FetchedArchive {
                    path,
                    origin: ArchiveOrigin::Cache,
                });
            }
            CacheLookup::Evicted { reason } => {
                info!("re-downloading {build} after discarding corrupt cache entry ({reason})");
            }
            CacheLookup::Miss => {}
        }

        let mut failures = Vec::with_capacity(self.sources.len());
        for source in &self.sources {
            match self.try_source(*source, build, variant) {
                Ok(path) => {
                    return Ok(FetchedArchive {
                        path,
                        origin: ArchiveOrigin::Source(source.name()),
                    });
                }
                Err(failure) => {
                    warn!("{failure}");
                    failures.push(failure);
                }
            }
        }

        Err(FetchError::Exhausted { build, failures })
    }

    fn try_source(
        &self,
        source: &dyn ArchiveSource,
        build: BuildId,
        variant: RuntimeVariant,
    ) -> Result<Utf8PathBuf, SourceFailure> {
        let failure = |reason: String, configuration: bool| SourceFailure {
            source_name: source.name(),
            reason,
            configuration,
        };

        let partial = self
            .cache
            .reserve()
            .map_err(|e| failure(format!("cannot create download file: {e}"), false))?;

        source
            .fetch(build, variant, &partial)
            .map_err(|e: SourceError| {
                let configuration = e.is_configuration_error();
                failure(e.to_string(), configuration)
            })?;

        self.cache.commit(build, partial).map_err(|e| match e {
            CacheError::Corrupt(inner) => failure(format!("downloaded archive is corrupt: {inner}"), false),
            CacheError::Io(inner) => failure(format!("cannot store download: {inner}"), false),
        })
    }
}
