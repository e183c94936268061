//! Target build resolution.
//!
//! The target is read from the server's message of the day when a server is
//! configured. Whenever that does not yield exactly one build, or yields the
//! build that is already installed, the operator is asked.

use log::{info, warn};
use regex::Regex;
use std::sync::OnceLock;

use crate::build_id::BuildId;
use crate::prompt::{Prompt, ask_build};
use crate::status::{ServerEndpoint, StatusQuery};

/// Question asked when the target could not be determined.
pub const ASK_TARGET: &str = "which daily version do you want to install";

/// Question asked when the server runs the installed build.
pub const ASK_OTHER: &str = "optionally enter another version to install";

/// What a MOTD says about the daily build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotdBuild {
    /// Exactly one build tag was found.
    Found(BuildId),
    /// No build tag was found.
    Absent,
    /// Several build tags were found; the count is kept for the warning.
    Ambiguous(usize),
}

fn daily_tag() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"daily-?(\d+)").ok())
        .as_ref()
}

/// Extract the daily build number from a MOTD.
///
/// Every `daily<n>` or `daily-<n>` tag counts, duplicates included. Only a
/// single tag resolves; the updater never guesses between several.
///
/// # Examples
///
/// ```
/// use gtnh_updater::resolution::{MotdBuild, parse_motd};
///
/// assert!(matches!(parse_motd("A Minecraft Server daily-482"), MotdBuild::Found(b) if b.get() == 482));
/// assert_eq!(parse_motd("daily-1 and daily-2"), MotdBuild::Ambiguous(2));
/// assert_eq!(parse_motd("no tag here"), MotdBuild::Absent);
/// ```
#[must_use]
pub fn parse_motd(motd: &str) -> MotdBuild {
    let Some(pattern) = daily_tag() else {
        return MotdBuild::Absent;
    };
    let numbers: Vec<&str> = pattern
        .captures_iter(motd)
        .filter_map(|caps| caps.get(1).map(|m| m.as_str()))
        .collect();

    match numbers.as_slice() {
        [] => MotdBuild::Absent,
        [number] => number
            .parse::<BuildId>()
            .map_or(MotdBuild::Absent, MotdBuild::Found),
        many => MotdBuild::Ambiguous(many.len()),
    }
}

/// Ask the server which build it runs.
///
/// Returns `None` (after logging a warning) when the server cannot be
/// queried or its MOTD does not name exactly one build.
pub fn query_server_build(
    status: &dyn StatusQuery,
    endpoint: &ServerEndpoint,
) -> Option<BuildId> {
    let motd = match status.motd(endpoint) {
        Ok(motd) => motd,
        Err(e) => {
            warn!("status query to {endpoint} failed: {e}");
            return None;
        }
    };

    match parse_motd(&motd) {
        MotdBuild::Found(build) => Some(build),
        MotdBuild::Absent => {
            warn!("could not discern daily version from motd '{motd}'");
            None
        }
        MotdBuild::Ambiguous(count) => {
            warn!("found multiple daily versions ({count}) in motd '{motd}'");
            None
        }
    }
}

/// Decide which build to install.
///
/// Returns `None` when the operator cancels; the run then ends without
/// side effects.
pub fn resolve_target(
    endpoint: Option<&ServerEndpoint>,
    installed: Option<BuildId>,
    status: &dyn StatusQuery,
    prompt: &mut dyn Prompt,
) -> Option<BuildId> {
    let from_server = endpoint.and_then(|endpoint| {
        info!("querying {endpoint} for its daily version");
        query_server_build(status, endpoint)
    });

    match from_server {
        Some(build) if Some(build) == installed => {
            info!("{build} is already installed");
            ask_build(prompt, ASK_OTHER, installed)
        }
        Some(build) => {
            info!("server runs {build}");
            Some(build)
        }
        None => ask_build(prompt, ASK_TARGET, installed),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prompt::MockPrompt;
    use crate::status::{MockStatusQuery, StatusError};
    use rstest::rstest;
    use std::io;

    fn build(n: u32) -> BuildId {
        BuildId::new(n).expect("valid id")
    }

    fn endpoint() -> ServerEndpoint {
        ServerEndpoint::new("gtnh.example.net", 25565)
    }

    fn serving(motd: &'static str) -> MockStatusQuery {
        let mut status = MockStatusQuery::new();
        status.expect_motd().returning(move |_| Ok(motd.to_owned()));
        status
    }

    fn silent_prompt() -> MockPrompt {
        let mut prompt = MockPrompt::new();
        prompt.expect_ask().times(0);
        prompt
    }

    fn answering(expected_question: &'static str, answer: Option<&'static str>) -> MockPrompt {
        let mut prompt = MockPrompt::new();
        prompt
            .expect_ask()
            .withf(move |message| message.starts_with(expected_question))
            .times(1)
            .returning(move |_| answer.map(str::to_owned));
        prompt
    }

    #[rstest]
    #[case::dashed("A Minecraft Server daily-482", MotdBuild::Found(build(482)))]
    #[case::undashed("daily77", MotdBuild::Found(build(77)))]
    #[case::two_tags("daily-1 and daily-2", MotdBuild::Ambiguous(2))]
    #[case::repeated_tag("daily-5 daily-5", MotdBuild::Ambiguous(2))]
    #[case::no_tag("no tag here", MotdBuild::Absent)]
    #[case::zero("daily-0", MotdBuild::Absent)]
    fn motd_parsing(#[case] motd: &str, #[case] expected: MotdBuild) {
        assert_eq!(parse_motd(motd), expected);
    }

    #[test]
    fn server_build_is_used_without_prompting() {
        let status = serving("GTNH daily-482");
        let mut prompt = silent_prompt();

        let target = resolve_target(Some(&endpoint()), Some(build(481)), &status, &mut prompt);

        assert_eq!(target, Some(build(482)));
    }

    #[test]
    fn installed_server_build_offers_another() {
        let status = serving("GTNH daily-482");
        let mut prompt = answering(ASK_OTHER, Some("483"));

        let target = resolve_target(Some(&endpoint()), Some(build(482)), &status, &mut prompt);

        assert_eq!(target, Some(build(483)));
    }

    #[test]
    fn installed_server_build_can_be_declined() {
        let status = serving("GTNH daily-482");
        let mut prompt = answering(ASK_OTHER, Some(""));

        let target = resolve_target(Some(&endpoint()), Some(build(482)), &status, &mut prompt);

        assert_eq!(target, None);
    }

    #[test]
    fn unreachable_server_falls_back_to_prompt() {
        let mut status = MockStatusQuery::new();
        status.expect_motd().times(1).returning(|endpoint| {
            Err(StatusError::Unreachable {
                endpoint: endpoint.to_string(),
                source: io::Error::from(io::ErrorKind::ConnectionRefused),
            })
        });
        let mut prompt = answering(ASK_TARGET, Some("480"));

        let target = resolve_target(Some(&endpoint()), None, &status, &mut prompt);

        assert_eq!(target, Some(build(480)));
    }

    #[test]
    fn ambiguous_motd_never_guesses() {
        let status = serving("daily-1 and daily-2");
        let mut prompt = answering(ASK_TARGET, None);

        let target = resolve_target(Some(&endpoint()), None, &status, &mut prompt);

        assert_eq!(target, None);
    }

    #[test]
    fn no_server_prompts_directly() {
        let mut status = MockStatusQuery::new();
        status.expect_motd().times(0);
        let mut prompt = answering(ASK_TARGET, Some("12"));

        let target = resolve_target(None, Some(build(11)), &status, &mut prompt);

        assert_eq!(target, Some(build(12)));
    }
}
