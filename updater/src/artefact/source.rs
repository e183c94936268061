//! Archive sources and their failure modes.
//!
//! A source knows how to obtain the client archive for one build and write
//! it to a file. Sources never fail the run on their own; the fetcher turns
//! each [`SourceError`] into a fallback to the next source.

use std::fmt;
use std::path::Path;

use crate::artefact::download::DownloadError;
use crate::build_id::BuildId;

/// Which Java runtime the client archive targets.
///
/// The variant is chosen by the caller. It is not read from the installed
/// instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RuntimeVariant {
    /// Java 17+ client (the default).
    #[default]
    NewJava,
    /// Legacy Java 8 client.
    Java8,
}

impl RuntimeVariant {
    /// Substring identifying this variant in CI artifact names.
    #[must_use]
    pub const fn artifact_marker(self) -> &'static str {
        match self {
            Self::NewJava => "mmcprism-new-java",
            Self::Java8 => "mmcprism-java8",
        }
    }
}

impl fmt::Display for RuntimeVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NewJava => f.write_str("Java 17+"),
            Self::Java8 => f.write_str("Java 8"),
        }
    }
}

/// Trait for a place client archives can be downloaded from.
///
/// Implementations write the complete archive to `dest`. The fetcher owns
/// `dest` and decides whether the result is kept.
#[cfg_attr(test, mockall::automock)]
pub trait ArchiveSource {
    /// Short name used in progress and failure messages.
    fn name(&self) -> &'static str;

    /// Download the archive for `build` into `dest`.
    ///
    /// # Errors
    ///
    /// Returns a [`SourceError`] describing why this source cannot provide
    /// the archive.
    fn fetch(
        &self,
        build: BuildId,
        variant: RuntimeVariant,
        dest: &Path,
    ) -> Result<(), SourceError>;
}

/// Reasons a single source could not provide an archive.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// The source does not serve the requested runtime variant.
    #[error("{source_name} does not provide {variant} clients")]
    UnsupportedVariant {
        /// The source that refused.
        source_name: &'static str,
        /// The requested variant.
        variant: RuntimeVariant,
    },

    /// The existence probe for the archive failed.
    #[error("client zip for {build} not found on the mirror (HTTP {status})")]
    NotOnMirror {
        /// The requested build.
        build: BuildId,
        /// Status code returned by the probe.
        status: u16,
    },

    /// The authenticated source was selected without a token.
    #[error("no GITHUB_TOKEN configured; add one to config.json to download from GitHub")]
    MissingToken,

    /// No CI run with a matching run number was listed.
    #[error("{build} is too old or not found, possibly beyond the {lookback}-run lookback window")]
    RunNotFound {
        /// The requested build.
        build: BuildId,
        /// How many recent runs were searched.
        lookback: u32,
    },

    /// The matching run has no artifact for the requested variant.
    #[error("target artifact not found: no artifact of {build} matches \"{marker}\"")]
    ArtifactNotFound {
        /// The requested build.
        build: BuildId,
        /// The artifact name marker that was searched for.
        marker: &'static str,
    },

    /// An API response could not be decoded.
    #[error("unexpected response from {url}: {reason}")]
    InvalidResponse {
        /// The URL that produced the response.
        url: String,
        /// Description of the decoding failure.
        reason: String,
    },

    /// The transfer itself failed.
    #[error(transparent)]
    Download(#[from] DownloadError),
}

impl SourceError {
    /// Return true when the failure means configuration is missing rather
    /// than the archive being unavailable.
    #[must_use]
    pub const fn is_configuration_error(&self) -> bool {
        matches!(self, Self::MissingToken)
    }
}
