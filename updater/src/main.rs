//! GT New Horizons daily updater CLI entrypoint.
//!
//! This binary loads `config.json`, resolves the daily build to install,
//! and replaces the instance's client files with that build, restoring the
//! previous state if the install fails.

use camino::Utf8PathBuf;
use clap::Parser;
use gtnh_updater::artefact::download::UreqTransport;
use gtnh_updater::artefact::extraction::ZipExtractor;
use gtnh_updater::artefact::github::GithubSource;
use gtnh_updater::artefact::mirror::MirrorSource;
use gtnh_updater::cli::Cli;
use gtnh_updater::config::UpdaterConfig;
use gtnh_updater::error::{Result, UpdaterError};
use gtnh_updater::install::FsSwapper;
use gtnh_updater::output::{DryRunInfo, nothing_to_do_message, success_message, write_stderr_line};
use gtnh_updater::pipeline::{
    Collaborators, UpdateContext, UpdateOutcome, plan, prepare_instance, record_install,
    run_update,
};
use gtnh_updater::prompt::LinePrompt;
use gtnh_updater::status::ServerListPing;
use gtnh_updater::storage::StorageLayout;
use std::io::{self, BufRead, Write};
use tracing_subscriber::EnvFilter;

fn main() {
    let cli = Cli::parse();
    let mut stderr = io::stderr();
    let run_result = run(&cli, &mut stderr);
    let exit_code = exit_code_for_run_result(run_result, &mut stderr);
    if !cli.no_pause {
        pause(&mut io::stdin().lock(), &mut stderr);
    }
    if exit_code != 0 {
        std::process::exit(exit_code);
    }
}

fn run(cli: &Cli, stderr: &mut dyn Write) -> Result<()> {
    init_logging(cli)?;

    let mut config = UpdaterConfig::load(&cli.config)?;
    let instance = prepare_instance(&mut config, &cli.config)?;
    let layout = StorageLayout::new(cli.storage_dir.clone(), cli.temp_dir.clone());
    let working_dir = current_dir()?;

    let transport = UreqTransport;
    let mirror = MirrorSource::new(&transport);
    let github = GithubSource::new(&transport, config.github_token());
    let status = ServerListPing::default();
    let mut prompt = LinePrompt::stdio();
    let mut collaborators = Collaborators {
        status: &status,
        prompt: &mut prompt,
        sources: vec![&mirror, &github],
        extractor: &ZipExtractor,
        swapper: &FsSwapper,
    };
    let context = UpdateContext {
        config: &config,
        instance: &instance,
        layout: &layout,
        variant: cli.variant(),
        working_dir: &working_dir,
    };

    if cli.dry_run {
        match plan(&context, &mut collaborators)? {
            Some(plan) => {
                let info = DryRunInfo {
                    build: plan.build,
                    installed: config.currently_installed,
                    variant: context.variant,
                    cached: plan.cached,
                    sources: &plan.sources,
                    additional_mods: &config.additional_mods,
                    instance: instance.path(),
                    storage_root: layout.storage_root(),
                    temp_dir: layout.temp_dir(),
                };
                write_stderr_line(stderr, info.display_text());
            }
            None => write_stderr_line(stderr, nothing_to_do_message()),
        }
        return Ok(());
    }

    match run_update(&context, &mut collaborators)? {
        UpdateOutcome::NothingToDo => write_stderr_line(stderr, nothing_to_do_message()),
        UpdateOutcome::Installed(report) => {
            record_install(&mut config, &cli.config, &layout, report.build)?;
            write_stderr_line(stderr, success_message(report.build));
        }
    }
    Ok(())
}

fn init_logging(cli: &Cli) -> Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cli.log_level()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .try_init()
        .map_err(|e| UpdaterError::Logging {
            reason: e.to_string(),
        })
}

fn current_dir() -> Result<Utf8PathBuf> {
    let dir = std::env::current_dir().map_err(|e| UpdaterError::WorkingDir {
        reason: e.to_string(),
    })?;
    Utf8PathBuf::from_path_buf(dir).map_err(|p| UpdaterError::WorkingDir {
        reason: format!("{} is not valid UTF-8", p.display()),
    })
}

fn pause(input: &mut dyn BufRead, stderr: &mut dyn Write) {
    write_stderr_line(stderr, "Press enter to quit...");
    let mut line = String::new();
    if input.read_line(&mut line).is_err() {
        // Nothing left to wait for.
    }
}

fn exit_code_for_run_result(result: Result<()>, stderr: &mut dyn Write) -> i32 {
    match result {
        Ok(()) => 0,
        Err(err) => {
            write_stderr_line(stderr, &err);
            if let Some(hint) = err.hint() {
                write_stderr_line(stderr, format!("hint: {hint}"));
            }
            1
        }
    }
}
