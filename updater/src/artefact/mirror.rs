//! Mirror source for daily client archives.
//!
//! The mirror serves `daily<id>-client.zip` directly and needs no
//! credentials. It only hosts Java 17+ clients.

use log::info;
use std::path::Path;

use crate::artefact::download::{HttpRequest, HttpTransport};
use crate::artefact::source::{ArchiveSource, RuntimeVariant, SourceError};
use crate::build_id::BuildId;

/// Default mirror host.
pub const MIRROR_BASE_URL: &str = "https://files.ableytner.at";

/// Archive source backed by the download mirror.
pub struct MirrorSource<'a> {
    transport: &'a dyn HttpTransport,
    base_url: String,
}

impl<'a> MirrorSource<'a> {
    /// Create a mirror source for the default host.
    #[must_use]
    pub fn new(transport: &'a dyn HttpTransport) -> Self {
        Self::with_base_url(transport, MIRROR_BASE_URL)
    }

    /// Create a mirror source for a custom host.
    #[must_use]
    pub fn with_base_url(transport: &'a dyn HttpTransport, base_url: &str) -> Self {
        Self {
            transport,
            base_url: base_url.trim_end_matches('/').to_owned(),
        }
    }

    /// Return the archive URL for a build.
    ///
    /// # Examples
    ///
    /// ```
    /// use gtnh_updater::artefact::download::UreqTransport;
    /// use gtnh_updater::artefact::mirror::MirrorSource;
    /// use gtnh_updater::build_id::BuildId;
    ///
    /// let transport = UreqTransport;
    /// let mirror = MirrorSource::new(&transport);
    /// let build = BuildId::new(482).expect("positive build number");
    /// assert_eq!(
    ///     mirror.archive_url(build),
    ///     "https://files.ableytner.at/daily482-client.zip"
    /// );
    /// ```
    #[must_use]
    pub fn archive_url(&self, build: BuildId) -> String {
        format!("{}/daily{}-client.zip", self.base_url, build.get())
    }
}

impl ArchiveSource for MirrorSource<'_> {
    fn name(&self) -> &'static str {
        "mirror"
    }

    fn fetch(
        &self,
        build: BuildId,
        variant: RuntimeVariant,
        dest: &Path,
    ) -> Result<(), SourceError> {
        if variant != RuntimeVariant::NewJava {
            return Err(SourceError::UnsupportedVariant {
                source_name: self.name(),
                variant,
            });
        }

        let request = HttpRequest::new(self.archive_url(build));
        let status = self.transport.head(&request)?;
        if status != 200 {
            return Err(SourceError::NotOnMirror { build, status });
        }

        info!("downloading client zip file for {build} from the mirror...");
        self.transport.download_to_file(&request, dest)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artefact::download::{DownloadError, MockHttpTransport};
    use crate::test_utils::{StubResponse, StubTransport};

    fn build() -> BuildId {
        BuildId::new(482).expect("valid id")
    }

    #[test]
    fn probes_then_downloads() {
        let dir = tempfile::tempdir().expect("temp dir");
        let dest = dir.path().join("out.zip");
        let url = "https://files.ableytner.at/daily482-client.zip";
        let transport = StubTransport::new()
            .on_head(url, 200)
            .on_get(url, StubResponse::Body(b"zip bytes".to_vec()));

        MirrorSource::new(&transport)
            .fetch(build(), RuntimeVariant::NewJava, &dest)
            .expect("fetch");

        assert_eq!(std::fs::read(&dest).expect("read"), b"zip bytes");
        assert_eq!(transport.calls(), vec![format!("HEAD {url}"), format!("GET {url}")]);
    }

    #[test]
    fn missing_archive_fails_without_download() {
        let dir = tempfile::tempdir().expect("temp dir");
        let url = "https://files.ableytner.at/daily482-client.zip";
        let transport = StubTransport::new().on_head(url, 404);

        let err = MirrorSource::new(&transport)
            .fetch(build(), RuntimeVariant::NewJava, &dir.path().join("out.zip"))
            .expect_err("expected failure");

        assert!(matches!(err, SourceError::NotOnMirror { status: 404, .. }));
        assert!(err.to_string().contains("not found on the mirror"));
        assert_eq!(transport.calls().len(), 1);
    }

    #[test]
    fn java8_is_refused_before_any_request() {
        let dir = tempfile::tempdir().expect("temp dir");
        let transport = StubTransport::new();

        let err = MirrorSource::new(&transport)
            .fetch(build(), RuntimeVariant::Java8, &dir.path().join("out.zip"))
            .expect_err("expected failure");

        assert!(matches!(err, SourceError::UnsupportedVariant { .. }));
        assert!(transport.calls().is_empty());
    }

    #[test]
    fn probe_transport_failure_propagates() {
        let dir = tempfile::tempdir().expect("temp dir");
        let mut transport = MockHttpTransport::new();
        transport.expect_head().times(1).returning(|request| {
            Err(DownloadError::HttpError {
                url: request.url.clone(),
                reason: "timed out".to_owned(),
            })
        });
        transport.expect_download_to_file().times(0);

        let err = MirrorSource::new(&transport)
            .fetch(build(), RuntimeVariant::NewJava, &dir.path().join("out.zip"))
            .expect_err("expected failure");

        assert!(matches!(err, SourceError::Download(DownloadError::HttpError { .. })));
    }

    #[test]
    fn custom_base_url_drops_trailing_slash() {
        let transport = StubTransport::new();
        let mirror = MirrorSource::with_base_url(&transport, "http://localhost:8080/");
        assert_eq!(
            mirror.archive_url(build()),
            "http://localhost:8080/daily482-client.zip"
        );
    }
}
