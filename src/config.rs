use crate::jobs::DEFAULT_CAPACITY;
use crate::parser::DEFAULT_MAX_LINE;
use argh::FromArgs;

pub const DEFAULT_PROMPT: &str = "jsh> ";

#[derive(FromArgs, Debug, Clone, PartialEq, Eq)]
/// Interactive shell with background jobs, pipes and redirection.
///
/// Set RUST_LOG (e.g. RUST_LOG=debug) to see diagnostic logging on stderr.
pub struct Config {
    #[argh(option, default = "DEFAULT_PROMPT.to_string()")]
    /// text printed before every input line.
    pub prompt: String,

    #[argh(option, default = "DEFAULT_MAX_LINE")]
    /// longest accepted input line, in characters.
    pub max_line: usize,

    #[argh(option, default = "DEFAULT_CAPACITY")]
    /// number of jobs a session can register.
    pub max_jobs: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            prompt: DEFAULT_PROMPT.to_string(),
            max_line: DEFAULT_MAX_LINE,
            max_jobs: DEFAULT_CAPACITY,
        }
    }
}
