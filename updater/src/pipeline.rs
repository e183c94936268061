//! End-to-end update run.
//!
//! A run goes through resolve, fetch, extract, inject, back up, and install
//! in that order, each stage consuming the previous stage's result. All
//! network, prompt, and filesystem-mutation seams are passed in through
//! [`Collaborators`], so the whole run can be driven from tests.

use camino::Utf8Path;
use log::{debug, info};

use crate::artefact::cache::ArchiveCache;
use crate::artefact::extraction::{ArchiveExtractor, extract_client};
use crate::artefact::source::{ArchiveSource, RuntimeVariant};
use crate::backup::BackupManager;
use crate::build_id::BuildId;
use crate::config::UpdaterConfig;
use crate::error::{Result, UpdaterError};
use crate::fetch::{ArchiveOrigin, ArtifactFetcher};
use crate::install::{InstallOrchestrator, InstallReport, PathSwapper, StagedClient};
use crate::instance::{InstanceRoot, ensure_instance_path};
use crate::mods::ModInjector;
use crate::prompt::Prompt;
use crate::resolution::resolve_target;
use crate::status::StatusQuery;
use crate::storage::StorageLayout;

/// Settings and paths for one run.
pub struct UpdateContext<'a> {
    /// Loaded configuration.
    pub config: &'a UpdaterConfig,
    /// Validated installation root.
    pub instance: &'a InstanceRoot,
    /// Storage and scratch directories.
    pub layout: &'a StorageLayout,
    /// Requested client runtime.
    pub variant: RuntimeVariant,
    /// Directory relative mod paths are resolved against.
    pub working_dir: &'a Utf8Path,
}

/// External seams used by a run.
pub struct Collaborators<'a> {
    /// Server status query.
    pub status: &'a dyn StatusQuery,
    /// Interactive version prompt.
    pub prompt: &'a mut dyn Prompt,
    /// Download sources, tried in order after the cache.
    pub sources: Vec<&'a dyn ArchiveSource>,
    /// Archive unpacker.
    pub extractor: &'a dyn ArchiveExtractor,
    /// Moves staged paths into the installation.
    pub swapper: &'a dyn PathSwapper,
}

/// How a run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// No target was chosen; nothing was changed.
    NothingToDo,
    /// The build was installed.
    Installed(InstallReport),
}

/// What a run would do, computed without side effects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdatePlan {
    /// The resolved target.
    pub build: BuildId,
    /// Whether an archive for the target is already cached.
    pub cached: bool,
    /// Names of the download sources, in order.
    pub sources: Vec<&'static str>,
}

/// Validate the configured instance path and persist its normalised form.
///
/// # Errors
///
/// Returns an error when `INSTANCE_PATH` is unset, the instance is invalid,
/// or the configuration cannot be saved.
pub fn prepare_instance(
    config: &mut UpdaterConfig,
    config_path: &Utf8Path,
) -> Result<InstanceRoot> {
    let instance = ensure_instance_path(config.instance_path()?)?;
    let normalised = instance.path().as_str();
    if config.instance_path.as_deref() != Some(normalised) {
        debug!("saving normalised instance path {normalised}");
        config.instance_path = Some(normalised.to_owned());
        config.save(config_path)?;
    }
    Ok(instance)
}

fn resolve(
    context: &UpdateContext<'_>,
    collaborators: &mut Collaborators<'_>,
) -> Result<Option<BuildId>> {
    let endpoint = context.config.server_endpoint()?;
    Ok(resolve_target(
        endpoint.as_ref(),
        context.config.currently_installed,
        collaborators.status,
        &mut *collaborators.prompt,
    ))
}

/// Resolve the target and describe what a run would do.
///
/// Returns `None` when no target was chosen.
///
/// # Errors
///
/// Returns an error when the configured server address is invalid.
pub fn plan(
    context: &UpdateContext<'_>,
    collaborators: &mut Collaborators<'_>,
) -> Result<Option<UpdatePlan>> {
    let Some(build) = resolve(context, collaborators)? else {
        return Ok(None);
    };

    let cache = ArchiveCache::new(context.layout.download_dir());
    let fetcher = ArtifactFetcher::new(&cache, collaborators.sources.clone());
    Ok(Some(UpdatePlan {
        build,
        cached: cache.contains(build),
        sources: fetcher.source_names(),
    }))
}

/// Run a complete update.
///
/// # Errors
///
/// Returns the first stage error. Errors before the install step leave the
/// installation untouched; install errors report whether the rollback
/// succeeded.
pub fn run_update(
    context: &UpdateContext<'_>,
    collaborators: &mut Collaborators<'_>,
) -> Result<UpdateOutcome> {
    let Some(build) = resolve(context, collaborators)? else {
        info!("no version selected");
        return Ok(UpdateOutcome::NothingToDo);
    };
    info!("updating to {build} ({} client)", context.variant);

    let layout = context.layout;
    layout.ensure().map_err(|source| UpdaterError::Storage {
        path: layout.storage_root().to_owned(),
        source,
    })?;

    let cache = ArchiveCache::new(layout.download_dir());
    let fetched = ArtifactFetcher::new(&cache, collaborators.sources.clone())
        .fetch(build, context.variant)?;
    if let ArchiveOrigin::Source(name) = fetched.origin {
        info!("downloaded {build} from {name}");
    }

    let client_root = extract_client(collaborators.extractor, &fetched.path, layout)?;

    let injected = ModInjector::new(context.working_dir.to_owned()).inject(
        &context.config.additional_mods,
        context.instance,
        &client_root,
    )?;
    debug!("injected {} additional mod(s)", injected.len());

    let backups = BackupManager::new(layout.backup_dir());
    let staged = StagedClient::new(build, client_root).back_up(&backups, context.instance)?;

    let report = InstallOrchestrator::new(&backups, collaborators.swapper)
        .install(staged, context.instance)?;
    Ok(UpdateOutcome::Installed(report))
}

/// Record a finished install and clean up the scratch directory.
///
/// # Errors
///
/// Returns an error when the configuration cannot be saved or the scratch
/// directory cannot be removed.
pub fn record_install(
    config: &mut UpdaterConfig,
    config_path: &Utf8Path,
    layout: &StorageLayout,
    build: BuildId,
) -> Result<()> {
    config.currently_installed = Some(build);
    config.save(config_path)?;
    layout.remove_temp_dir().map_err(|source| UpdaterError::Storage {
        path: layout.temp_dir().to_owned(),
        source,
    })
}

#[cfg(test)]
#[path = "pipeline_tests.rs"]
mod tests;
