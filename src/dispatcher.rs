use crate::command::{Command, ExitCode, JobState};
use crate::error::{Result, ShellError};
use crate::external::PreparedLaunch;
use crate::interpreter::Session;
use crate::jobs::{Notice, Slot};
use crate::launcher;
use crate::signals::SignalCoordinator;
use nix::errno::Errno;
use nix::sys::signal::{Signal, kill};
use nix::sys::wait::{WaitPidFlag, WaitStatus, waitpid};
use nix::unistd::{ForkResult, Pid, fork};
use std::io::Write;

/// How a foreground wait ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Finished(ExitCode),
    Stopped,
}

/// Launch a command marked with `&` and register it without waiting.
pub(crate) fn spawn_background(
    mut command: Command,
    session: &mut Session,
    out: &mut dyn Write,
) -> Result<Slot> {
    // A full table must be detected before a child exists that nobody tracks.
    session.jobs.ensure_capacity()?;
    let prepared = PreparedLaunch::new(command.plan(), &session.env)?;
    let pid = fork_launcher(&prepared)?;

    command.pid = Some(pid);
    command.state = JobState::Running;
    command.reported = false;
    let slot = session.jobs.register(command)?;
    tracing::debug!(slot, pid = %pid, "background job started");
    writeln!(out, "{}", Notice::Launched { slot, pid })?;
    Ok(slot)
}

/// Launch a command and block until it exits or is stopped.
///
/// A stopped command is moved into the job registry under a fresh slot.
pub(crate) fn run_foreground(
    mut command: Command,
    session: &mut Session,
    out: &mut dyn Write,
) -> Result<ExitCode> {
    let prepared = PreparedLaunch::new(command.plan(), &session.env)?;
    let pid = fork_launcher(&prepared)?;
    command.pid = Some(pid);
    tracing::debug!(pid = %pid, "foreground job started");

    loop {
        match wait_foreground(pid, &session.signals)? {
            Outcome::Finished(code) => return Ok(code),
            Outcome::Stopped => {
                if let Err(err) = session.jobs.ensure_capacity() {
                    tracing::warn!(pid = %pid, "cannot track stopped job, resuming it");
                    writeln!(out, "job_shell: {}", err)?;
                    continue_process(pid)?;
                    continue;
                }
                command.state = JobState::Stopped;
                let text = command.raw_line().to_string();
                let slot = session.jobs.register(command)?;
                writeln!(out, "{}", Notice::Stopped { slot, text: &text })?;
                return Ok(EXIT_STOPPED);
            }
        }
    }
}

/// Status reported for a command that was suspended: 128 + SIGTSTP.
const EXIT_STOPPED: ExitCode = 128 + Signal::SIGTSTP as ExitCode;

/// `bg`: let a stopped job continue without waiting for it.
pub(crate) fn resume_background(slot: Slot, session: &mut Session) -> Result<()> {
    let job = session.jobs.lookup_mut(slot)?;
    let pid = live_pid(slot, &job.command)?;
    continue_process(pid)?;
    job.command.state = JobState::Running;
    tracing::debug!(slot, pid = %pid, "job resumed in background");
    Ok(())
}

/// `fg`: continue a job and wait for it as if it had been started in the foreground.
pub(crate) fn resume_foreground(
    slot: Slot,
    session: &mut Session,
    out: &mut dyn Write,
) -> Result<ExitCode> {
    let job = session.jobs.lookup_mut(slot)?;
    let pid = live_pid(slot, &job.command)?;
    writeln!(out, "{}", job.command.display_text())?;
    continue_process(pid)?;
    job.command.state = JobState::Running;
    tracing::debug!(slot, pid = %pid, "job resumed in foreground");

    match wait_foreground(pid, &session.signals)? {
        Outcome::Finished(code) => {
            let job = session.jobs.lookup_mut(slot)?;
            job.command.state = JobState::Done;
            job.command.reported = true;
            Ok(code)
        }
        Outcome::Stopped => {
            let job = session.jobs.lookup_mut(slot)?;
            job.command.state = JobState::Stopped;
            writeln!(
                out,
                "{}",
                Notice::Stopped {
                    slot,
                    text: job.command.raw_line(),
                }
            )?;
            Ok(EXIT_STOPPED)
        }
    }
}

fn live_pid(slot: Slot, command: &Command) -> Result<Pid> {
    match (command.state, command.pid) {
        (JobState::Done, _) | (_, None) => Err(ShellError::JobFinished(slot)),
        (_, Some(pid)) => Ok(pid),
    }
}

fn continue_process(pid: Pid) -> Result<()> {
    kill(pid, Signal::SIGCONT).map_err(|source| ShellError::Signal { pid, source })
}

/// Fork a child that runs the launcher; returns the child's pid in the parent.
fn fork_launcher(prepared: &PreparedLaunch) -> Result<Pid> {
    // Anything still buffered would otherwise be written twice.
    std::io::stdout().flush()?;
    // SAFETY: the interpreter is single-threaded and the child execs or exits.
    match unsafe { fork() } {
        Ok(ForkResult::Child) => launcher::launch(prepared),
        Ok(ForkResult::Parent { child }) => Ok(child),
        Err(err) => Err(ShellError::Fork(err)),
    }
}

/// Wait for `pid` to exit or stop, publishing it as the foreground process meanwhile.
///
/// The outcome comes from `waitpid`. The suspend flag only tells a terminal
/// Ctrl-Z apart from a stop sent by someone else, and is cleared either way.
fn wait_foreground(pid: Pid, signals: &SignalCoordinator) -> Result<Outcome> {
    signals.set_foreground(pid);
    let status = loop {
        match waitpid(pid, Some(WaitPidFlag::WUNTRACED)) {
            Err(Errno::EINTR) => continue,
            other => break other,
        }
    };
    signals.clear_foreground();
    let suspended = signals.take_suspend();

    match status.map_err(|source| ShellError::Wait { pid, source })? {
        WaitStatus::Exited(_, code) => Ok(Outcome::Finished(code)),
        WaitStatus::Signaled(_, signal, _) => Ok(Outcome::Finished(128 + signal as ExitCode)),
        WaitStatus::Stopped(_, signal) => {
            if suspended {
                tracing::debug!(pid = %pid, ?signal, "foreground job suspended from the terminal");
            } else {
                tracing::info!(pid = %pid, ?signal, "foreground job stopped by an outside signal");
            }
            Ok(Outcome::Stopped)
        }
        other => {
            tracing::warn!(pid = %pid, status = ?other, "unexpected wait status");
            Ok(Outcome::Finished(1))
        }
    }
}
