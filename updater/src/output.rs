//! Output formatting for the updater CLI.
//!
//! Progress is reported through the log facade. The lines here are the
//! ones an operator always sees: the final verdict of a run and the
//! dry-run summary.

use camino::Utf8Path;
use std::fmt::Display;
use std::io::Write;

use crate::artefact::source::RuntimeVariant;
use crate::build_id::BuildId;

/// Write one line to `stderr`, ignoring write failures.
pub fn write_stderr_line(stderr: &mut dyn Write, message: impl Display) {
    if writeln!(stderr, "{message}").is_err() {
        // Best-effort output; nothing useful can be done on failure.
    }
}

/// Format the message printed after a successful update.
///
/// # Example
///
/// ```
/// use gtnh_updater::build_id::BuildId;
/// use gtnh_updater::output::success_message;
///
/// let build = BuildId::new(482).expect("valid id");
/// assert_eq!(success_message(build), "update to daily-482 succeeded!");
/// ```
#[must_use]
pub fn success_message(build: BuildId) -> String {
    format!("update to {build} succeeded!")
}

/// Format the message printed when the operator cancels the prompt.
#[must_use]
pub const fn nothing_to_do_message() -> &'static str {
    "no version selected, nothing to do"
}

/// What a real run would do, for `--dry-run`.
///
/// # Example
///
/// ```
/// use camino::Utf8PathBuf;
/// use gtnh_updater::artefact::source::RuntimeVariant;
/// use gtnh_updater::build_id::BuildId;
/// use gtnh_updater::output::DryRunInfo;
///
/// let instance = Utf8PathBuf::from("/games/gtnh");
/// let storage = Utf8PathBuf::from("storage");
/// let temp = Utf8PathBuf::from("temp");
///
/// let info = DryRunInfo {
///     build: BuildId::new(482).expect("valid id"),
///     installed: None,
///     variant: RuntimeVariant::NewJava,
///     cached: false,
///     sources: &["mirror", "github"],
///     additional_mods: &[],
///     instance: &instance,
///     storage_root: &storage,
///     temp_dir: &temp,
/// };
///
/// let output = info.display_text();
/// assert!(output.contains("Dry run"));
/// assert!(output.contains("daily-482"));
/// ```
#[derive(Debug)]
pub struct DryRunInfo<'a> {
    /// The build that would be installed.
    pub build: BuildId,
    /// The build currently recorded as installed.
    pub installed: Option<BuildId>,
    /// Requested client runtime.
    pub variant: RuntimeVariant,
    /// Whether a verified archive is already cached.
    pub cached: bool,
    /// Download sources, in the order they would be tried.
    pub sources: &'a [&'static str],
    /// Additional mod references.
    pub additional_mods: &'a [String],
    /// The installation root.
    pub instance: &'a Utf8Path,
    /// Storage root holding backups and downloads.
    pub storage_root: &'a Utf8Path,
    /// Temporary extraction directory.
    pub temp_dir: &'a Utf8Path,
}

impl DryRunInfo<'_> {
    /// Format the dry-run information for display.
    #[must_use]
    pub fn display_text(&self) -> String {
        let installed = self
            .installed
            .map_or_else(|| "unknown".to_owned(), |b| b.to_string());
        let archive = if self.cached {
            "cached".to_owned()
        } else {
            format!("download from {}", self.sources.join(", then "))
        };

        let mut lines = vec![
            "Dry run - no files will be modified".to_owned(),
            String::new(),
            format!("Target version: {}", self.build),
            format!("Installed version: {installed}"),
            format!("Client runtime: {}", self.variant),
            format!("Client zip: {archive}"),
            format!("Instance: {}", self.instance),
            format!("Storage directory: {}", self.storage_root),
            format!("Temporary directory: {}", self.temp_dir),
        ];

        if !self.additional_mods.is_empty() {
            lines.push(String::new());
            lines.push("Additional mods:".to_owned());
            lines.extend(self.additional_mods.iter().map(|m| format!("  - {m}")));
        }

        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use camino::Utf8PathBuf;
    use rstest::{fixture, rstest};

    struct Paths {
        instance: Utf8PathBuf,
        storage: Utf8PathBuf,
        temp: Utf8PathBuf,
    }

    #[fixture]
    fn paths() -> Paths {
        Paths {
            instance: Utf8PathBuf::from("/games/gtnh"),
            storage: Utf8PathBuf::from("storage"),
            temp: Utf8PathBuf::from("temp"),
        }
    }

    fn info<'a>(paths: &'a Paths, cached: bool, mods: &'a [String]) -> DryRunInfo<'a> {
        DryRunInfo {
            build: BuildId::new(482).expect("valid id"),
            installed: BuildId::new(470).ok(),
            variant: RuntimeVariant::Java8,
            cached,
            sources: &["mirror", "github"],
            additional_mods: mods,
            instance: &paths.instance,
            storage_root: &paths.storage,
            temp_dir: &paths.temp,
        }
    }

    #[rstest]
    fn dry_run_lists_target_and_paths(paths: Paths) {
        let text = info(&paths, false, &[]).display_text();

        assert!(text.starts_with("Dry run - no files will be modified"));
        assert!(text.contains("Target version: daily-482"));
        assert!(text.contains("Installed version: daily-470"));
        assert!(text.contains("Client runtime: Java 8"));
        assert!(text.contains("Instance: /games/gtnh"));
        assert!(!text.contains("Additional mods"));
    }

    #[rstest]
    #[case::cached(true, "Client zip: cached")]
    #[case::download(false, "Client zip: download from mirror, then github")]
    fn dry_run_reports_archive_origin(paths: Paths, #[case] cached: bool, #[case] expected: &str) {
        let text = info(&paths, cached, &[]).display_text();
        assert!(text.contains(expected), "missing {expected:?} in {text}");
    }

    #[rstest]
    fn dry_run_lists_additional_mods(paths: Paths) {
        let mods = vec!["extra.jar".to_owned()];
        let text = info(&paths, true, &mods).display_text();
        assert!(text.ends_with("Additional mods:\n  - extra.jar"));
    }

    #[test]
    fn write_stderr_line_appends_newline() {
        let mut stderr = Vec::new();
        write_stderr_line(&mut stderr, success_message(BuildId::new(7).expect("valid id")));
        assert_eq!(stderr, b"update to daily-7 succeeded!\n");
    }
}
