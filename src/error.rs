use crate::command::Operator;
use crate::jobs::Slot;
use nix::errno::Errno;
use nix::unistd::Pid;
use thiserror::Error;

/// Malformed command lines, rejected before anything is launched.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("line exceeds {max} characters")]
    LineTooLong { max: usize },

    #[error("unexpected '{second}' after '{first}'")]
    AdjacentOperators { first: Operator, second: Operator },

    #[error("missing file name after '{0}'")]
    MissingRedirectTarget(Operator),

    #[error("'{0}' given more than once")]
    DuplicateRedirect(Operator),

    #[error("missing command in pipeline")]
    EmptyStage,

    #[error("'&' must be the last token")]
    TrailingAfterBackground,
}

#[derive(Error, Debug)]
pub enum ShellError {
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("job table is full ({0} jobs)")]
    RegistryFull(usize),

    #[error("no such job: {0}")]
    NoSuchJob(Slot),

    #[error("job {0} has already finished")]
    JobFinished(Slot),

    #[error("cannot create process: {0}")]
    Fork(#[source] Errno),

    #[error("cannot signal process {pid}: {source}")]
    Signal { pid: Pid, source: Errno },

    #[error("wait for process {pid} failed: {source}")]
    Wait { pid: Pid, source: Errno },

    #[error("argument contains a NUL byte: {0:?}")]
    InvalidArgument(String),

    #[error("{0}: operators are not supported for built-ins")]
    BuiltinOperators(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ShellError>;
