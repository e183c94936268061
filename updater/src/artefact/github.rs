//! GitHub Actions artifact source.
//!
//! Every daily modpack build runs the `daily-modpack-build.yml` workflow,
//! whose run number is the daily build number. The client archives are
//! attached to the run as artifacts. Downloads need a token and are slow,
//! so this source is the fallback behind the mirror.

use log::info;
use serde::Deserialize;
use std::path::Path;

use crate::artefact::download::{HttpRequest, HttpTransport};
use crate::artefact::source::{ArchiveSource, RuntimeVariant, SourceError};
use crate::build_id::BuildId;

/// Workflow runs endpoint for the daily modpack build.
pub const WORKFLOW_RUNS_URL: &str = "https://api.github.com/repos/GTNewHorizons/DreamAssemblerXXL/actions/workflows/daily-modpack-build.yml/runs";

/// How many recent runs are searched for a matching run number.
pub const RUN_LOOKBACK: u32 = 100;

const API_VERSION: &str = "2022-11-28";

#[derive(Debug, Deserialize)]
struct WorkflowRuns {
    workflow_runs: Vec<WorkflowRun>,
}

#[derive(Debug, Deserialize)]
struct WorkflowRun {
    run_number: u64,
    url: String,
}

#[derive(Debug, Deserialize)]
struct Artifacts {
    artifacts: Vec<Artifact>,
}

#[derive(Debug, Deserialize)]
struct Artifact {
    name: String,
    archive_download_url: String,
}

/// Archive source backed by the GitHub Actions REST API.
pub struct GithubSource<'a> {
    transport: &'a dyn HttpTransport,
    token: Option<String>,
}

impl<'a> GithubSource<'a> {
    /// Create a source with an optional access token.
    ///
    /// A blank token counts as missing. Fetching without a token fails with
    /// [`SourceError::MissingToken`].
    #[must_use]
    pub fn new(transport: &'a dyn HttpTransport, token: Option<&str>) -> Self {
        Self {
            transport,
            token: token
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(str::to_owned),
        }
    }

    fn request(&self, token: &str, url: &str) -> HttpRequest {
        HttpRequest::new(url)
            .with_header("Accept", "application/vnd.github+json")
            .with_header("Authorization", &format!("Bearer {token}"))
            .with_header("X-GitHub-Api-Version", API_VERSION)
    }

    fn get_json<T>(&self, request: &HttpRequest) -> Result<T, SourceError>
    where
        T: for<'de> Deserialize<'de>,
    {
        let body = self.transport.get_text(request)?;
        serde_json::from_str(&body).map_err(|e| SourceError::InvalidResponse {
            url: request.url.clone(),
            reason: e.to_string(),
        })
    }

    fn find_run(&self, token: &str, build: BuildId) -> Result<WorkflowRun, SourceError> {
        let url = format!("{WORKFLOW_RUNS_URL}?per_page={RUN_LOOKBACK}");
        let runs: WorkflowRuns = self.get_json(&self.request(token, &url))?;
        runs.workflow_runs
            .into_iter()
            .find(|run| run.run_number == u64::from(build.get()))
            .ok_or(SourceError::RunNotFound {
                build,
                lookback: RUN_LOOKBACK,
            })
    }

    fn find_artifact(
        &self,
        token: &str,
        run: &WorkflowRun,
        build: BuildId,
        variant: RuntimeVariant,
    ) -> Result<Artifact, SourceError> {
        let url = format!("{}/artifacts", run.url);
        let listing: Artifacts = self.get_json(&self.request(token, &url))?;
        let marker = variant.artifact_marker();
        listing
            .artifacts
            .into_iter()
            .rfind(|artifact| artifact.name.contains(marker))
            .ok_or(SourceError::ArtifactNotFound { build, marker })
    }
}

impl ArchiveSource for GithubSource<'_> {
    fn name(&self) -> &'static str {
        "github"
    }

    fn fetch(
        &self,
        build: BuildId,
        variant: RuntimeVariant,
        dest: &Path,
    ) -> Result<(), SourceError> {
        let token = self.token.as_deref().ok_or(SourceError::MissingToken)?;

        let run = self.find_run(token, build)?;
        let artifact = self.find_artifact(token, &run, build, variant)?;

        info!(
            "downloading {} from GitHub, this will take a few minutes...",
            artifact.name
        );
        self.transport
            .download_to_file(&self.request(token, &artifact.archive_download_url), dest)?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "github_tests.rs"]
mod tests;
