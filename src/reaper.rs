//! Non-blocking collection of finished background jobs.

use crate::command::JobState;
use crate::jobs::{Job, JobRegistry, Notice};
use nix::errno::Errno;
use nix::sys::wait::{WaitPidFlag, WaitStatus, waitpid};
use nix::unistd::Pid;
use std::io::{self, Write};

/// Source of process status changes.
///
/// Implementations must not block: a process that has not changed state is
/// reported as [`WaitStatus::StillAlive`].
pub trait StatusProbe {
    fn probe(&mut self, pid: Pid) -> nix::Result<WaitStatus>;
}

/// `waitpid(pid, WNOHANG)` on the real process.
#[derive(Debug, Default)]
pub struct NonBlockingWait;

impl StatusProbe for NonBlockingWait {
    fn probe(&mut self, pid: Pid) -> nix::Result<WaitStatus> {
        waitpid(pid, Some(WaitPidFlag::WNOHANG))
    }
}

/// Poll every unfinished job once and print terminal transitions.
///
/// A job's `Done`/`Exit`/`Terminated` line is printed at most once for the
/// whole session no matter how often this runs. Returns the number of lines printed.
pub fn reap(
    registry: &mut JobRegistry,
    probe: &mut dyn StatusProbe,
    out: &mut dyn Write,
) -> io::Result<usize> {
    let mut printed = 0;
    for job in registry.iter_mut() {
        if job.state() == JobState::Done {
            continue;
        }
        let Some(pid) = job.pid() else { continue };

        match probe.probe(pid) {
            Ok(WaitStatus::Exited(_, code)) => {
                job.command.state = JobState::Done;
                tracing::debug!(slot = job.slot(), pid = %pid, code, "job exited");
                let text = job.command.display_text();
                let notice = if code != 0 {
                    Notice::Exit {
                        slot: job.slot(),
                        code,
                        text: &text,
                    }
                } else {
                    Notice::Done {
                        slot: job.slot(),
                        text: &text,
                    }
                };
                printed += report_once(job, notice, out)?;
            }
            Ok(WaitStatus::Signaled(_, signal, _)) => {
                job.command.state = JobState::Done;
                tracing::debug!(slot = job.slot(), pid = %pid, ?signal, "job terminated");
                let text = job.command.display_text();
                let notice = Notice::Terminated {
                    slot: job.slot(),
                    text: &text,
                };
                printed += report_once(job, notice, out)?;
            }
            Ok(_) => {}
            Err(Errno::ECHILD) => {
                tracing::warn!(slot = job.slot(), pid = %pid, "job was reaped elsewhere");
                job.command.state = JobState::Done;
                job.command.reported = true;
            }
            Err(err) => {
                tracing::warn!(slot = job.slot(), pid = %pid, error = %err, "status probe failed");
            }
        }
    }
    out.flush()?;
    Ok(printed)
}

fn report_once(job: &mut Job, notice: Notice<'_>, out: &mut dyn Write) -> io::Result<usize> {
    if job.command.reported {
        return Ok(0);
    }
    writeln!(out, "{}", notice)?;
    job.command.reported = true;
    Ok(1)
}
