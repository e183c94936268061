//! CLI argument definitions for the updater.
//!
//! This module defines the command-line interface using clap. It is separated
//! from the main entrypoint to keep the binary small and focused on
//! orchestration.

use camino::Utf8PathBuf;
use clap::Parser;

use crate::artefact::source::RuntimeVariant;
use crate::config::DEFAULT_CONFIG_PATH;

/// Update a GT New Horizons MultiMC/Prism instance to a daily build.
#[derive(Parser, Debug, Clone)]
#[command(name = "gtnh-updater")]
#[command(version, about)]
#[command(long_about = concat!(
    "Update a GT New Horizons MultiMC/Prism instance to a daily build.\n\n",
    "The target build is read from the configured server's MOTD, or asked for ",
    "interactively. The client zip is taken from the local cache, the mirror, ",
    "or the GitHub Actions artifacts (GITHUB_TOKEN required), in that order.\n\n",
    "Before anything is replaced the whole instance is backed up. If the ",
    "install fails part-way, the instance is restored from that backup.",
))]
#[command(after_help = concat!(
    "CONFIGURATION (config.json):\n",
    "  INSTANCE_PATH        Instance folder (required)\n",
    "  SERVER_HOSTNAME      Server to read the daily version from, host[:port]\n",
    "  SERVER_IP            Used when SERVER_HOSTNAME is not set\n",
    "  GITHUB_TOKEN         Token for downloading GitHub Actions artifacts\n",
    "  ADDITIONAL_MODS      Jars copied into every install\n",
    "  CURRENTLY_INSTALLED  Written by the updater after a successful install\n\n",
    "EXAMPLES:\n",
    "  Update to the version the server runs:\n",
    "    $ gtnh-updater\n\n",
    "  Update a Java 8 instance:\n",
    "    $ gtnh-updater --java8\n\n",
    "  Preview without downloading or changing anything:\n",
    "    $ gtnh-updater --dry-run\n\n",
    "For more information, see: https://github.com/ableytner/gtnh-daily-updater",
))]
pub struct Cli {
    /// Configuration file.
    #[arg(short, long, value_name = "FILE", default_value = DEFAULT_CONFIG_PATH)]
    pub config: Utf8PathBuf,

    /// Directory holding backups and downloaded client zips.
    #[arg(long, value_name = "DIR", default_value = "storage")]
    pub storage_dir: Utf8PathBuf,

    /// Directory used to extract the client zip.
    #[arg(long, value_name = "DIR", default_value = "temp")]
    pub temp_dir: Utf8PathBuf,

    /// Install the Java 8 client instead of the Java 17+ client.
    #[arg(long)]
    pub java8: bool,

    /// Resolve the target version and exit without downloading or
    /// changing anything.
    #[arg(long)]
    pub dry_run: bool,

    /// Increase log output (repeatable: -v, -vv).
    #[arg(
        short,
        long = "verbose",
        action = clap::ArgAction::Count,
        conflicts_with = "quiet"
    )]
    pub verbosity: u8,

    /// Only log warnings and errors.
    #[arg(short, long, conflicts_with = "verbosity")]
    pub quiet: bool,

    /// Exit immediately instead of waiting for enter.
    #[arg(long)]
    pub no_pause: bool,
}

impl Default for Cli {
    /// Creates a `Cli` matching an invocation without arguments.
    ///
    /// # Examples
    ///
    /// ```
    /// use gtnh_updater::cli::Cli;
    ///
    /// let cli = Cli::default();
    /// assert_eq!(cli.config, "config.json");
    /// assert!(!cli.java8);
    /// ```
    fn default() -> Self {
        Self {
            config: Utf8PathBuf::from(DEFAULT_CONFIG_PATH),
            storage_dir: Utf8PathBuf::from("storage"),
            temp_dir: Utf8PathBuf::from("temp"),
            java8: false,
            dry_run: false,
            verbosity: 0,
            quiet: false,
            no_pause: false,
        }
    }
}

impl Cli {
    /// The client runtime requested on the command line.
    #[must_use]
    pub const fn variant(&self) -> RuntimeVariant {
        if self.java8 {
            RuntimeVariant::Java8
        } else {
            RuntimeVariant::NewJava
        }
    }

    /// Default log filter directive for the chosen verbosity.
    #[must_use]
    pub const fn log_level(&self) -> &'static str {
        match (self.quiet, self.verbosity) {
            (true, _) => "warn",
            (false, 0) => "info",
            (false, 1) => "debug",
            (false, _) => "trace",
        }
    }
}

#[cfg(test)]
#[path = "cli_tests.rs"]
mod tests;
