use crate::error::ParseError;
use nix::unistd::Pid;
use std::fmt;
use std::path::PathBuf;

/// Conventional process exit code type used by this crate.
///
/// A value of 0 indicates success; any non-zero value indicates failure.
/// Processes killed by a signal are reported as `128 + signal`, like POSIX shells do.
pub type ExitCode = i32;

/// Single-character operators recognised in a command line.
///
/// An operator is only recognised when a whitespace-separated token consists of
/// exactly that character, so `a>b` is an ordinary argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    /// `|`, connects the stdout of one stage to the stdin of the next.
    Pipe,
    /// `<`, reads stdin of the first stage from a file.
    RedirectIn,
    /// `>`, writes stdout of the last stage to a file.
    RedirectOut,
    /// `&`, runs the command without waiting for it.
    Background,
}

impl Operator {
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "|" => Some(Operator::Pipe),
            "<" => Some(Operator::RedirectIn),
            ">" => Some(Operator::RedirectOut),
            "&" => Some(Operator::Background),
            _ => None,
        }
    }

    pub fn as_char(self) -> char {
        match self {
            Operator::Pipe => '|',
            Operator::RedirectIn => '<',
            Operator::RedirectOut => '>',
            Operator::Background => '&',
        }
    }

    fn is_redirect(self) -> bool {
        matches!(self, Operator::RedirectIn | Operator::RedirectOut)
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

/// One whitespace-separated slot of a command line.
///
/// Every position holds either an argument or an operator, never both.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Arg(String),
    Op(Operator),
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Arg(arg) => f.write_str(arg),
            Token::Op(op) => write!(f, "{}", op),
        }
    }
}

/// A single program of a pipeline; `argv[0]` is the program name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stage {
    pub argv: Vec<String>,
}

impl Stage {
    pub fn program(&self) -> &str {
        &self.argv[0]
    }
}

/// What has to be wired up to run a command: its stages and redirections.
///
/// Redirections apply to the whole command: `input` feeds the first stage and
/// `output` receives the stdout of the last one, regardless of where the
/// operator appeared in the line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchPlan {
    pub stages: Vec<Stage>,
    pub input: Option<PathBuf>,
    pub output: Option<PathBuf>,
    pub background: bool,
}

impl LaunchPlan {
    /// Build a plan from already classified tokens.
    ///
    /// Assumes no two operators are adjacent; the parser rejects that earlier.
    pub fn from_tokens(tokens: &[Token]) -> Result<Self, ParseError> {
        let mut stages = Vec::new();
        let mut current = Vec::new();
        let mut input = None;
        let mut output = None;
        let mut background = false;

        for (i, token) in tokens.iter().enumerate() {
            match token {
                Token::Arg(arg) => {
                    let is_target = i > 0
                        && matches!(tokens[i - 1], Token::Op(op) if op.is_redirect());
                    if !is_target {
                        current.push(arg.clone());
                    }
                }
                Token::Op(Operator::Pipe) => {
                    if current.is_empty() {
                        return Err(ParseError::EmptyStage);
                    }
                    stages.push(Stage {
                        argv: std::mem::take(&mut current),
                    });
                }
                Token::Op(op @ (Operator::RedirectIn | Operator::RedirectOut)) => {
                    let target = match tokens.get(i + 1) {
                        Some(Token::Arg(target)) => PathBuf::from(target),
                        _ => return Err(ParseError::MissingRedirectTarget(*op)),
                    };
                    let slot = if *op == Operator::RedirectIn {
                        &mut input
                    } else {
                        &mut output
                    };
                    if slot.replace(target).is_some() {
                        return Err(ParseError::DuplicateRedirect(*op));
                    }
                }
                Token::Op(Operator::Background) => {
                    if i + 1 != tokens.len() {
                        return Err(ParseError::TrailingAfterBackground);
                    }
                    background = true;
                }
            }
        }

        if current.is_empty() {
            return Err(ParseError::EmptyStage);
        }
        stages.push(Stage { argv: current });

        Ok(Self {
            stages,
            input,
            output,
            background,
        })
    }
}

/// Lifecycle of a launched command.
///
/// `Running -> Stopped` on suspend, `Stopped -> Running` on `bg`/`fg`,
/// `Running -> Done` once the process is reaped. `Done` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Running,
    Stopped,
    Done,
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobState::Running => write!(f, "Running"),
            JobState::Stopped => write!(f, "Stopped"),
            JobState::Done => write!(f, "Done"),
        }
    }
}

/// One parsed user input together with its execution state.
#[derive(Debug, Clone)]
pub struct Command {
    raw_line: String,
    tokens: Vec<Token>,
    plan: LaunchPlan,
    /// Process executing stage 0; `None` until launched.
    pub pid: Option<Pid>,
    pub state: JobState,
    /// Whether the terminal transition has already been printed.
    pub reported: bool,
}

impl Command {
    pub(crate) fn new(raw_line: String, tokens: Vec<Token>, plan: LaunchPlan) -> Self {
        Self {
            raw_line,
            tokens,
            plan,
            pid: None,
            state: JobState::Running,
            reported: false,
        }
    }

    pub fn raw_line(&self) -> &str {
        &self.raw_line
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    pub fn plan(&self) -> &LaunchPlan {
        &self.plan
    }

    /// Argument at position `index`, `None` if that slot holds an operator.
    pub fn arg(&self, index: usize) -> Option<&str> {
        match self.tokens.get(index)? {
            Token::Arg(arg) => Some(arg),
            Token::Op(_) => None,
        }
    }

    /// Operator at position `index`, `None` if that slot holds an argument.
    pub fn operator(&self, index: usize) -> Option<Operator> {
        match self.tokens.get(index)? {
            Token::Op(op) => Some(*op),
            Token::Arg(_) => None,
        }
    }

    /// Position of the first occurrence of `op`.
    pub fn find_operator(&self, op: Operator) -> Option<usize> {
        self.tokens.iter().position(|t| *t == Token::Op(op))
    }

    pub fn has_operators(&self) -> bool {
        self.tokens.iter().any(|t| matches!(t, Token::Op(_)))
    }

    pub fn is_background(&self) -> bool {
        self.plan.background
    }

    /// The command as echoed in job notifications: every token before `&`.
    pub fn display_text(&self) -> String {
        let end = self
            .find_operator(Operator::Background)
            .unwrap_or(self.tokens.len());
        self.tokens[..end]
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(" ")
    }
}
