use crate::command::{Command, ExitCode, JobState};
use crate::dispatcher;
use crate::error::ShellError;
use crate::interpreter::Session;
use crate::jobs::{Notice, Slot};
use anyhow::Result;
use argh::{EarlyExit, FromArgs};
use std::io::Write;

/// Built-in commands known to the shell at compile time.
///
/// Builtins are parsed using the [`argh`] crate (`FromArgs`) and executed directly
/// in-process without spawning a child process.
pub(crate) trait BuiltinCommand: Sized + FromArgs {
    /// Canonical name of the command, e.g. "jobs" or "bg".
    fn name() -> &'static str;

    /// Executes the command against the interactive session.
    ///
    /// Return value should follow shell conventions: 0 for success, non-zero for error.
    fn execute(self, stdout: &mut dyn Write, session: &mut Session) -> Result<ExitCode>;
}

/// The closed set of built-ins; any other program name is external.
pub(crate) enum Builtin {
    Exit(Exit),
    Jobs(Jobs),
    Bg(Bg),
    Fg(Fg),
}

/// Outcome of looking up a command line among the built-ins.
pub(crate) enum Invocation {
    Run(Builtin),
    /// Argument parsing stopped early: help text or a usage error.
    Usage { output: String, is_error: bool },
}

impl Builtin {
    /// Returns `Ok(None)` when the first word does not name a built-in.
    pub(crate) fn resolve(command: &Command) -> Result<Option<Invocation>, ShellError> {
        let argv = &command.plan().stages[0].argv;
        let name = argv[0].as_str();
        let args: Vec<&str> = argv[1..].iter().map(String::as_str).collect();

        let parsed = parse::<Exit>(name, &args)
            .map(|r| r.map(Builtin::Exit))
            .or_else(|| parse::<Jobs>(name, &args).map(|r| r.map(Builtin::Jobs)))
            .or_else(|| parse::<Bg>(name, &args).map(|r| r.map(Builtin::Bg)))
            .or_else(|| parse::<Fg>(name, &args).map(|r| r.map(Builtin::Fg)));

        let Some(parsed) = parsed else {
            return Ok(None);
        };
        if command.has_operators() {
            return Err(ShellError::BuiltinOperators(name.to_string()));
        }
        Ok(Some(match parsed {
            Ok(builtin) => Invocation::Run(builtin),
            Err(EarlyExit { output, status }) => Invocation::Usage {
                output,
                is_error: status.is_err(),
            },
        }))
    }

    pub(crate) fn execute(self, stdout: &mut dyn Write, session: &mut Session) -> Result<ExitCode> {
        match self {
            Builtin::Exit(cmd) => cmd.execute(stdout, session),
            Builtin::Jobs(cmd) => cmd.execute(stdout, session),
            Builtin::Bg(cmd) => cmd.execute(stdout, session),
            Builtin::Fg(cmd) => cmd.execute(stdout, session),
        }
    }
}

fn parse<T: BuiltinCommand>(name: &str, args: &[&str]) -> Option<Result<T, EarlyExit>> {
    (name == T::name()).then(|| T::from_args(&[name], args))
}

#[derive(FromArgs)]
/// Leave the shell.
pub(crate) struct Exit {
    #[argh(positional)]
    /// exit status of the shell, 0 when omitted.
    pub code: Option<ExitCode>,
}

impl BuiltinCommand for Exit {
    fn name() -> &'static str {
        "exit"
    }

    fn execute(self, _stdout: &mut dyn Write, session: &mut Session) -> Result<ExitCode> {
        let code = self.code.unwrap_or(0);
        session.env.request_exit(code);
        Ok(code)
    }
}

#[derive(FromArgs)]
/// List background and stopped jobs.
pub(crate) struct Jobs {}

impl BuiltinCommand for Jobs {
    fn name() -> &'static str {
        "jobs"
    }

    fn execute(self, stdout: &mut dyn Write, session: &mut Session) -> Result<ExitCode> {
        for job in session.jobs.iter_mut() {
            let slot = job.slot();
            let text = job.command.raw_line();
            let notice = match job.command.state {
                JobState::Running => Notice::Running { slot, text },
                JobState::Stopped => Notice::Stopped { slot, text },
                JobState::Done if !job.command.reported => Notice::Done { slot, text },
                JobState::Done => continue,
            };
            writeln!(stdout, "{}", notice)?;
            if job.command.state == JobState::Done {
                job.command.reported = true;
            }
        }
        Ok(0)
    }
}

#[derive(FromArgs)]
/// Resume a stopped job in the background.
pub(crate) struct Bg {
    #[argh(positional)]
    /// slot number of the job, as shown by `jobs`.
    pub slot: Slot,
}

impl BuiltinCommand for Bg {
    fn name() -> &'static str {
        "bg"
    }

    fn execute(self, _stdout: &mut dyn Write, session: &mut Session) -> Result<ExitCode> {
        dispatcher::resume_background(self.slot, session)?;
        Ok(0)
    }
}

#[derive(FromArgs)]
/// Resume a job in the foreground and wait for it.
pub(crate) struct Fg {
    #[argh(positional)]
    /// slot number of the job, as shown by `jobs`.
    pub slot: Slot,
}

impl BuiltinCommand for Fg {
    fn name() -> &'static str {
        "fg"
    }

    fn execute(self, stdout: &mut dyn Write, session: &mut Session) -> Result<ExitCode> {
        Ok(dispatcher::resume_foreground(self.slot, session, stdout)?)
    }
}
