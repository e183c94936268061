//! Interactive version prompt.
//!
//! The prompt is the only place an update run can be cancelled. Answers are
//! read one line at a time; anything that is neither a build number nor a
//! cancel word asks again.

use std::io::{self, BufRead, Write};

use crate::build_id::BuildId;

/// Answers that cancel the run.
pub const CANCEL_WORDS: [&str; 6] = ["", "n", "no", "q", "quit", "exit"];

/// Trait for asking the operator a question.
#[cfg_attr(test, mockall::automock)]
pub trait Prompt {
    /// Show `message` and return the answer without its line ending.
    ///
    /// Returns `None` at end of input or when input is unavailable.
    fn ask(&mut self, message: &str) -> Option<String>;
}

/// Line prompt over any reader and writer.
pub struct LinePrompt<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> LinePrompt<R, W> {
    /// Create a prompt reading answers from `input` and writing questions to
    /// `output`.
    #[must_use]
    pub const fn new(input: R, output: W) -> Self {
        Self { input, output }
    }
}

impl LinePrompt<io::StdinLock<'static>, io::Stdout> {
    /// Prompt on the process's standard input and output.
    #[must_use]
    pub fn stdio() -> Self {
        Self::new(io::stdin().lock(), io::stdout())
    }
}

impl<R: BufRead, W: Write> Prompt for LinePrompt<R, W> {
    fn ask(&mut self, message: &str) -> Option<String> {
        write!(self.output, "{message}").ok()?;
        self.output.flush().ok()?;

        let mut line = String::new();
        match self.input.read_line(&mut line) {
            Ok(0) | Err(_) => None,
            Ok(_) => Some(line.trim_end_matches(['\r', '\n']).to_owned()),
        }
    }
}

/// A classified prompt answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Answer {
    /// A build number was entered.
    Build(BuildId),
    /// The operator declined.
    Cancel,
    /// Not understood; ask again.
    Invalid,
}

/// Classify one prompt answer.
///
/// Only ASCII digits count as a number. `0` is not a build and is treated
/// as invalid.
///
/// # Examples
///
/// ```
/// use gtnh_updater::prompt::{Answer, parse_answer};
///
/// assert!(matches!(parse_answer("482"), Answer::Build(_)));
/// assert_eq!(parse_answer("quit"), Answer::Cancel);
/// assert_eq!(parse_answer("latest"), Answer::Invalid);
/// ```
#[must_use]
pub fn parse_answer(answer: &str) -> Answer {
    if CANCEL_WORDS.contains(&answer) {
        return Answer::Cancel;
    }
    answer.parse::<BuildId>().map_or(Answer::Invalid, Answer::Build)
}

/// Ask for a build number until a usable answer arrives.
///
/// The question shows the installed build, or `unknown`. Returns `None` when
/// the operator cancels or input ends.
pub fn ask_build(
    prompt: &mut dyn Prompt,
    question: &str,
    installed: Option<BuildId>,
) -> Option<BuildId> {
    let installed = installed.map_or_else(|| "unknown".to_owned(), |b| b.get().to_string());
    let message = format!("{question} (currently: {installed}): ");
    loop {
        match parse_answer(&prompt.ask(&message)?) {
            Answer::Build(build) => return Some(build),
            Answer::Cancel => return None,
            Answer::Invalid => {}
        }
    }
}
