use crate::builtin::{Builtin, Invocation};
use crate::command::ExitCode;
use crate::config::Config;
use crate::dispatcher;
use crate::env::Environment;
use crate::error::ShellError;
use crate::jobs::JobRegistry;
use crate::parser;
use crate::reaper::{self, NonBlockingWait};
use crate::signals::SignalCoordinator;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use std::io::Write;

/// State shared by built-ins and the dispatcher. Owned by the main loop only.
pub(crate) struct Session {
    pub env: Environment,
    pub jobs: JobRegistry,
    pub signals: SignalCoordinator,
}

impl Session {
    /// A session without signal handlers, for tests.
    #[cfg(test)]
    pub(crate) fn detached(capacity: usize) -> Self {
        Self {
            env: Environment::new(),
            jobs: JobRegistry::with_capacity(capacity),
            signals: SignalCoordinator::detached(),
        }
    }
}

/// An interactive job-control shell.
///
/// Lines are parsed, built-ins (`exit`, `jobs`, `bg`, `fg`) run in-process and
/// everything else is launched as a child process. Finished background jobs are
/// reported by [`Interpreter::reap`], which [`Interpreter::repl`] calls before
/// every prompt.
///
/// Example
/// ```no_run
/// use job_shell::{Config, Interpreter};
/// let mut sh = Interpreter::new(Config::default()).unwrap();
/// let mut out = Vec::new();
/// sh.execute_line("sleep 1 &", &mut out).unwrap();
/// assert!(String::from_utf8(out).unwrap().starts_with("[0]\t"));
/// ```
pub struct Interpreter {
    config: Config,
    session: Session,
    probe: NonBlockingWait,
}

impl Interpreter {
    /// Create an interpreter and install its signal handlers.
    pub fn new(config: Config) -> anyhow::Result<Self> {
        let session = Session {
            env: Environment::new(),
            jobs: JobRegistry::with_capacity(config.max_jobs),
            signals: SignalCoordinator::install()?,
        };
        Ok(Self {
            config,
            session,
            probe: NonBlockingWait,
        })
    }

    pub fn jobs(&self) -> &JobRegistry {
        &self.session.jobs
    }

    pub fn env(&self) -> &Environment {
        &self.session.env
    }

    /// Parse and run a single line, writing job notifications and built-in output to `out`.
    ///
    /// Returns the command's exit code. Blank lines do nothing and return 0.
    pub fn execute_line(&mut self, line: &str, out: &mut dyn Write) -> anyhow::Result<ExitCode> {
        let Some(command) =
            parser::parse_line(line, self.config.max_line).map_err(ShellError::from)?
        else {
            return Ok(0);
        };

        let code = match Builtin::resolve(&command)? {
            Some(Invocation::Run(builtin)) => builtin.execute(out, &mut self.session)?,
            Some(Invocation::Usage { output, is_error }) => {
                writeln!(out, "{}", output)?;
                if is_error { 1 } else { 0 }
            }
            None if command.is_background() => {
                dispatcher::spawn_background(command, &mut self.session, out)?;
                0
            }
            None => dispatcher::run_foreground(command, &mut self.session, out)?,
        };
        out.flush()?;
        Ok(code)
    }

    /// Poll background jobs once and print the ones that finished since the last call.
    pub fn reap(&mut self, out: &mut dyn Write) -> anyhow::Result<usize> {
        Ok(reaper::reap(&mut self.session.jobs, &mut self.probe, out)?)
    }

    /// Read-eval loop on the terminal. Returns the status requested by `exit`.
    pub fn repl(&mut self) -> anyhow::Result<ExitCode> {
        let mut rl = DefaultEditor::new()?;
        let mut stdout = std::io::stdout();

        while !self.session.env.should_exit {
            self.reap(&mut stdout)?;
            match rl.readline(&self.config.prompt) {
                Ok(line) => {
                    if !line.trim().is_empty() {
                        rl.add_history_entry(line.as_str())?;
                    }
                    if let Err(err) = self.execute_line(&line, &mut stdout) {
                        tracing::debug!(error = ?err, "command failed");
                        eprintln!("job_shell: {:#}", err);
                    }
                }
                Err(ReadlineError::Interrupted) => continue,
                Err(ReadlineError::Eof) => break,
                Err(err) => return Err(err.into()),
            }
        }

        Ok(self.session.env.exit_code)
    }
}
