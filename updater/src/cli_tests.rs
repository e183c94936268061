//! Tests for updater CLI parsing and default behaviours.

use super::*;
use rstest::rstest;

#[test]
fn cli_parses_defaults() {
    let cli = Cli::parse_from(["gtnh-updater"]);
    assert_eq!(cli.config, Utf8PathBuf::from("config.json"));
    assert_eq!(cli.storage_dir, Utf8PathBuf::from("storage"));
    assert_eq!(cli.temp_dir, Utf8PathBuf::from("temp"));
    assert!(!cli.java8);
    assert!(!cli.dry_run);
    assert_eq!(cli.verbosity, 0);
    assert!(!cli.quiet);
    assert!(!cli.no_pause);
}

#[test]
fn default_matches_empty_invocation() {
    let parsed = Cli::parse_from(["gtnh-updater"]);
    let default = Cli::default();
    assert_eq!(parsed.config, default.config);
    assert_eq!(parsed.storage_dir, default.storage_dir);
    assert_eq!(parsed.temp_dir, default.temp_dir);
}

#[test]
fn cli_parses_directories() {
    let cli = Cli::parse_from([
        "gtnh-updater",
        "--config",
        "/etc/gtnh.json",
        "--storage-dir",
        "/var/cache/gtnh",
        "--temp-dir",
        "/tmp/gtnh",
    ]);
    assert_eq!(cli.config, Utf8PathBuf::from("/etc/gtnh.json"));
    assert_eq!(cli.storage_dir, Utf8PathBuf::from("/var/cache/gtnh"));
    assert_eq!(cli.temp_dir, Utf8PathBuf::from("/tmp/gtnh"));
}

#[rstest]
#[case::default(&["gtnh-updater"], RuntimeVariant::NewJava)]
#[case::java8(&["gtnh-updater", "--java8"], RuntimeVariant::Java8)]
fn variant_follows_java8_flag(#[case] args: &[&str], #[case] expected: RuntimeVariant) {
    assert_eq!(Cli::parse_from(args).variant(), expected);
}

#[rstest]
#[case::quiet(&["gtnh-updater", "-q"], "warn")]
#[case::default(&["gtnh-updater"], "info")]
#[case::verbose(&["gtnh-updater", "-v"], "debug")]
#[case::very_verbose(&["gtnh-updater", "-vvv"], "trace")]
fn log_level_follows_flags(#[case] args: &[&str], #[case] expected: &str) {
    assert_eq!(Cli::parse_from(args).log_level(), expected);
}

#[test]
fn verbose_conflicts_with_quiet() {
    let result = Cli::try_parse_from(["gtnh-updater", "-v", "-q"]);
    assert!(result.is_err());
}

#[test]
fn unknown_flags_are_rejected() {
    let result = Cli::try_parse_from(["gtnh-updater", "--force"]);
    assert!(result.is_err());
}
